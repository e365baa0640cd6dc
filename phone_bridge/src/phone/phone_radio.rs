// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Binds a [`Radio`] to the owner loop. See [`PhoneResource`].

use crate::{AsyncOutcome, CompletionHandle, OpCode, OpMode, OwnedResource};
use std::fmt;
use strum_macros::Display;

/// One entry of the neighboring cell list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighboringCell {
    pub cell_id: u32,
    /// Received signal strength, in the radio's own units.
    pub rssi: i32,
}

/// The shared radio. Not thread safe: only the owner thread may call it.
pub trait Radio: Send + 'static {
    /// Runs a PIN-related MMI dial string. Returns `true` if it was recognized and
    /// handled.
    fn handle_pin_mmi(&mut self, dial_string: &str) -> bool;

    /// Starts a neighboring cell scan. The answer is delivered through `reply`,
    /// possibly from another thread.
    fn request_neighboring_cells(&mut self, reply: NeighboringCellsReply);

    /// Answers the ringing call, if any.
    fn answer_ringing_call(&mut self);

    /// Silences the ringer, if it is ringing.
    fn silence_ringer(&mut self);

    /// Hangs up the foreground call. Returns `true` if a call was hung up.
    fn hang_up(&mut self) -> bool;

    fn is_sim_pin_enabled(&self) -> bool;
}

type ReplyFn = Box<dyn FnOnce(AsyncOutcome<PhoneOutput>) + Send>;

/// Completion handle for [`Radio::request_neighboring_cells()`].
///
/// Dropping it without replying is treated like [`error()`](Self::error): the caller
/// gets an empty list.
pub struct NeighboringCellsReply {
    reply: ReplyFn,
}

impl fmt::Debug for NeighboringCellsReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeighboringCellsReply").finish_non_exhaustive()
    }
}

impl NeighboringCellsReply {
    fn new<P: Radio>(handle: CompletionHandle<PhoneResource<P>>) -> Self {
        Self {
            reply: Box::new(move |outcome| handle.deliver(outcome)),
        }
    }

    pub fn cells(self, cells: Vec<NeighboringCell>) {
        (self.reply)(AsyncOutcome::Success(Some(PhoneOutput::Cells(cells))));
    }

    /// The scan finished without producing a list.
    pub fn no_result(self) { (self.reply)(AsyncOutcome::Success(None)); }

    pub fn error(self, reason: impl Into<String>) {
        (self.reply)(AsyncOutcome::Failure(reason.into()));
    }
}

/// Commands the owner loop runs against the [`Radio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PhoneOp {
    HandlePinMmi,
    NeighboringCells,
    AnswerRingingCall,
    SilenceRinger,
    EndCall,
    IsSimPinEnabled,
}

impl OpCode for PhoneOp {
    fn mode(self) -> OpMode {
        match self {
            PhoneOp::NeighboringCells => OpMode::Initiate,
            PhoneOp::HandlePinMmi
            | PhoneOp::AnswerRingingCall
            | PhoneOp::SilenceRinger
            | PhoneOp::EndCall
            | PhoneOp::IsSimPinEnabled => OpMode::Execute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneArg {
    None,
    DialString(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneOutput {
    Done,
    Flag(bool),
    Cells(Vec<NeighboringCell>),
}

/// A [`Radio`] as an [`OwnedResource`].
#[derive(Debug)]
pub struct PhoneResource<P: Radio> {
    radio: P,
}

impl<P: Radio> PhoneResource<P> {
    #[must_use]
    pub fn new(radio: P) -> Self { Self { radio } }

    #[must_use]
    pub fn radio(&self) -> &P { &self.radio }
}

impl<P: Radio> OwnedResource for PhoneResource<P> {
    type Op = PhoneOp;
    type Arg = PhoneArg;
    type Output = PhoneOutput;

    fn execute(&mut self, op: PhoneOp, arg: &PhoneArg) -> PhoneOutput {
        match (op, arg) {
            (PhoneOp::HandlePinMmi, PhoneArg::DialString(dial_string)) => {
                PhoneOutput::Flag(self.radio.handle_pin_mmi(dial_string))
            }
            (PhoneOp::EndCall, _) => PhoneOutput::Flag(self.radio.hang_up()),
            (PhoneOp::IsSimPinEnabled, _) => {
                PhoneOutput::Flag(self.radio.is_sim_pin_enabled())
            }
            (PhoneOp::AnswerRingingCall, _) => {
                self.radio.answer_ringing_call();
                PhoneOutput::Done
            }
            (PhoneOp::SilenceRinger, _) => {
                self.radio.silence_ringer();
                PhoneOutput::Done
            }
            (op, arg) => {
                tracing::warn!(%op, ?arg, "unexpected execute request");
                Self::fallback_output(op)
            }
        }
    }

    fn initiate(&mut self, op: PhoneOp, _arg: &PhoneArg, handle: CompletionHandle<Self>) {
        match op {
            PhoneOp::NeighboringCells => {
                self.radio
                    .request_neighboring_cells(NeighboringCellsReply::new(handle));
            }
            _ => {
                tracing::warn!(%op, "not an async operation");
                handle.deliver(AsyncOutcome::Success(None));
            }
        }
    }

    fn fire_and_forget(&mut self, op: PhoneOp, arg: PhoneArg) {
        match op {
            PhoneOp::AnswerRingingCall => self.radio.answer_ringing_call(),
            PhoneOp::SilenceRinger => self.radio.silence_ringer(),
            _ => tracing::warn!(%op, ?arg, "dropping fire-and-forget request"),
        }
    }

    fn fallback_output(op: PhoneOp) -> PhoneOutput {
        match op {
            PhoneOp::NeighboringCells => PhoneOutput::Cells(vec![]),
            PhoneOp::HandlePinMmi | PhoneOp::EndCall | PhoneOp::IsSimPinEnabled => {
                PhoneOutput::Flag(false)
            }
            PhoneOp::AnswerRingingCall | PhoneOp::SilenceRinger => PhoneOutput::Done,
        }
    }
}
