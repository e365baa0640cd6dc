// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{enforce_location, NeighboringCell, Permission, PermissionChecker, PhoneArg,
            PhoneOp, PhoneOutput, PhoneResource, Radio};
use crate::{check_pin, BridgeResult, RequestDispatcher, SecurityElementDriver,
            SyncOverAsyncConfig};
use std::{fmt, sync::Arc};

/// The public phone API. Every method checks the caller's permission first, then
/// either routes the work to the owner thread through the [`RequestDispatcher`] or,
/// for [`supply_pin()`], runs it on a fresh [`SyncOverAsyncWorker`].
///
/// Cheap to clone; every clone talks to the same owner loop.
///
/// [`SyncOverAsyncWorker`]: crate::SyncOverAsyncWorker
/// [`supply_pin()`]: Self::supply_pin
pub struct PhoneInterface<P: Radio> {
    dispatcher: RequestDispatcher<PhoneResource<P>>,
    sim_card: Arc<dyn SecurityElementDriver>,
    permissions: Arc<dyn PermissionChecker>,
    worker_config: SyncOverAsyncConfig,
}

impl<P: Radio> Clone for PhoneInterface<P> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            sim_card: Arc::clone(&self.sim_card),
            permissions: Arc::clone(&self.permissions),
            worker_config: self.worker_config.clone(),
        }
    }
}

impl<P: Radio> fmt::Debug for PhoneInterface<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhoneInterface")
            .field("dispatcher", &self.dispatcher)
            .field("worker_config", &self.worker_config)
            .finish_non_exhaustive()
    }
}

impl<P: Radio> PhoneInterface<P> {
    #[must_use]
    pub fn new(
        dispatcher: RequestDispatcher<PhoneResource<P>>,
        sim_card: Arc<dyn SecurityElementDriver>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            dispatcher,
            sim_card,
            permissions,
            worker_config: SyncOverAsyncConfig::default(),
        }
    }

    #[must_use]
    pub fn with_worker_config(mut self, worker_config: SyncOverAsyncConfig) -> Self {
        self.worker_config = worker_config;
        self
    }

    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] without [`Permission::ModifyPhoneState`], or
    /// any [`RequestDispatcher::call_sync()`] error.
    ///
    /// [`BridgeError::PermissionDenied`]: crate::BridgeError::PermissionDenied
    pub fn handle_pin_mmi(&self, dial_string: &str) -> BridgeResult<bool> {
        self.permissions.enforce(Permission::ModifyPhoneState)?;
        let output = self.dispatcher.call_sync(
            PhoneOp::HandlePinMmi,
            PhoneArg::DialString(dial_string.to_string()),
        )?;
        Ok(output.into_flag(PhoneOp::HandlePinMmi))
    }

    /// The current neighboring cell list. A scan that fails or yields nothing comes
    /// back as an empty list.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] without location access (see
    /// [`enforce_location()`]), or any [`RequestDispatcher::call_sync()`] error.
    ///
    /// [`BridgeError::PermissionDenied`]: crate::BridgeError::PermissionDenied
    pub fn neighboring_cell_info(&self) -> BridgeResult<Vec<NeighboringCell>> {
        enforce_location(self.permissions.as_ref())?;
        let output = self
            .dispatcher
            .call_sync(PhoneOp::NeighboringCells, PhoneArg::None)?;
        Ok(output.into_cells())
    }

    /// Returns as soon as the request is queued.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] without [`Permission::ModifyPhoneState`], or
    /// [`BridgeError::LoopUnavailable`].
    ///
    /// [`BridgeError::PermissionDenied`]: crate::BridgeError::PermissionDenied
    /// [`BridgeError::LoopUnavailable`]: crate::BridgeError::LoopUnavailable
    pub fn answer_ringing_call(&self) -> BridgeResult<()> {
        self.permissions.enforce(Permission::ModifyPhoneState)?;
        self.dispatcher
            .call_async(PhoneOp::AnswerRingingCall, PhoneArg::None)
    }

    /// Returns as soon as the request is queued.
    ///
    /// # Errors
    ///
    /// Same as [`answer_ringing_call()`](Self::answer_ringing_call).
    pub fn silence_ringer(&self) -> BridgeResult<()> {
        self.permissions.enforce(Permission::ModifyPhoneState)?;
        self.dispatcher
            .call_async(PhoneOp::SilenceRinger, PhoneArg::None)
    }

    /// Hangs up the foreground call on the owner thread. Returns `true` if a call was
    /// hung up.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] without [`Permission::CallPhone`], or any
    /// [`RequestDispatcher::call_sync()`] error.
    ///
    /// [`BridgeError::PermissionDenied`]: crate::BridgeError::PermissionDenied
    pub fn end_call(&self) -> BridgeResult<bool> {
        self.permissions.enforce(Permission::CallPhone)?;
        let output = self.dispatcher.call_sync(PhoneOp::EndCall, PhoneArg::None)?;
        let hung_up = output.into_flag(PhoneOp::EndCall);
        tracing::debug!(hung_up, "end_call");
        Ok(hung_up)
    }

    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] without [`Permission::ReadPhoneState`], or any
    /// [`RequestDispatcher::call_sync()`] error.
    ///
    /// [`BridgeError::PermissionDenied`]: crate::BridgeError::PermissionDenied
    pub fn is_sim_pin_enabled(&self) -> BridgeResult<bool> {
        self.permissions.enforce(Permission::ReadPhoneState)?;
        let output = self
            .dispatcher
            .call_sync(PhoneOp::IsSimPinEnabled, PhoneArg::None)?;
        Ok(output.into_flag(PhoneOp::IsSimPinEnabled))
    }

    /// Submits `pin` to the SIM card and blocks until it answers. Runs on its own
    /// worker thread, so the owner thread stays free while the SIM is slow.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PermissionDenied`] without [`Permission::ModifyPhoneState`], or
    /// any [`check_pin()`] error.
    ///
    /// [`BridgeError::PermissionDenied`]: crate::BridgeError::PermissionDenied
    pub fn supply_pin(&self, pin: &str) -> BridgeResult<bool> {
        self.permissions.enforce(Permission::ModifyPhoneState)?;
        check_pin(self.sim_card.as_ref(), pin, self.worker_config.clone())
    }
}

/// [`PhoneResource`] answers each op with exactly one output shape, so a mismatch is
/// a bug in the resource, not a runtime condition.
impl PhoneOutput {
    /// # Panics
    ///
    /// If the output is not a [`PhoneOutput::Flag`].
    pub(crate) fn into_flag(self, op: PhoneOp) -> bool {
        match self {
            PhoneOutput::Flag(flag) => flag,
            other => unreachable!("{op} answered with {other:?}, expected a flag"),
        }
    }

    /// # Panics
    ///
    /// If the output is not a [`PhoneOutput::Cells`].
    pub(crate) fn into_cells(self) -> Vec<NeighboringCell> {
        match self {
            PhoneOutput::Cells(cells) => cells,
            other => unreachable!(
                "{} answered with {other:?}, expected a cell list",
                PhoneOp::NeighboringCells
            ),
        }
    }
}
