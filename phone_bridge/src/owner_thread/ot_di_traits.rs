// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Traits you implement to put a resource behind an [`OwnerLoop`]. See
//! [`OwnedResource`] and [`OpCode`].
//!
//! [`OwnerLoop`]: super::OwnerLoop

use super::CompletionHandle;
use std::fmt::Debug;

/// How a synchronous call to an operation is carried out on the owner thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    /// [`OwnedResource::execute()`] returns the result right away.
    Execute,
    /// [`OwnedResource::initiate()`] starts the work and the result arrives later
    /// through a [`CompletionHandle`].
    Initiate,
}

/// The enumerated set of operations a resource understands.
pub trait OpCode: Copy + Debug + Send + 'static {
    /// Whether a synchronous call to this operation completes immediately or through
    /// a callback.
    fn mode(self) -> OpMode;
}

/// A resource that may only be touched from the owner thread.
///
/// The owner loop takes ownership of the value when it is spawned and is the only
/// code that ever calls these methods, one at a time and in queue order.
pub trait OwnedResource: Send + 'static {
    type Op: OpCode;
    type Arg: Send + 'static;
    type Output: Send + 'static;

    /// Runs an [`OpMode::Execute`] operation and returns its result.
    fn execute(&mut self, op: Self::Op, arg: &Self::Arg) -> Self::Output;

    /// Starts an [`OpMode::Initiate`] operation. The implementation (or whatever
    /// subsystem it hands `handle` to) calls [`CompletionHandle::deliver()`] later,
    /// from any thread. Holding the handle without ever delivering leaves the caller
    /// blocked. Dropping it counts as a failure, so the caller gets
    /// [`fallback_output()`](Self::fallback_output).
    fn initiate(&mut self, op: Self::Op, arg: &Self::Arg, handle: CompletionHandle<Self>)
    where
        Self: Sized;

    /// Runs an operation for its side effects only. Nobody waits for it.
    fn fire_and_forget(&mut self, op: Self::Op, arg: Self::Arg);

    /// The value handed to the caller when an initiated operation's callback reports
    /// an error or a success without a payload.
    fn fallback_output(op: Self::Op) -> Self::Output
    where
        Self: Sized;
}
