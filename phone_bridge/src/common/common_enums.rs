// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Tells a run-loop whether to keep going after handling one message.
///
/// Returned by [`run_owner_loop()`] for each [`Command`] it dispatches, and by the
/// [`SyncOverAsyncWorker`] run-loop for each message it handles.
///
/// [`Command`]: crate::Command
/// [`SyncOverAsyncWorker`]: crate::SyncOverAsyncWorker
/// [`run_owner_loop()`]: crate::run_owner_loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop/thread.
    Stop,
}

/// An indication of whether a dedicated thread is running or terminated.
///
/// # Why Not Just `bool`?
///
/// `bool` requires remembering what `true` means. With this enum:
/// - [`LivenessState::Running`] is unambiguous
/// - Pattern matching catches all cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// The dedicated thread is running and processing messages.
    Running,
    /// The dedicated thread has exited.
    Terminated,
}
