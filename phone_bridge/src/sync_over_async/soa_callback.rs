// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::PendingRequest;
use tokio::{runtime::Handle, sync::mpsc::UnboundedSender};

/// A message for a worker's private run-loop.
pub(super) enum LoopMessage {
    /// Run this on the run-loop thread.
    Dispatch(Box<dyn FnOnce() + Send>),
    /// Exit the run-loop.
    Quit,
}

/// Address of a running worker run-loop: where to post messages, and the runtime that
/// drives it.
#[derive(Clone)]
pub(super) struct RunLoopHandle {
    pub(super) tx: UnboundedSender<LoopMessage>,
    pub(super) runtime: Handle,
}

/// Completion callback bound to a [`SyncOverAsyncWorker`]'s run-loop.
///
/// The driver may call [`complete()`] from any thread, or from a task it spawned on
/// [`runtime_handle()`]. Either way the outcome is recorded by a handler running on
/// the worker's run-loop thread, which then releases the blocked caller.
///
/// Dropping the callback without completing it releases the caller with
/// [`BridgeError::RequestAbandoned`].
///
/// [`BridgeError::RequestAbandoned`]: crate::BridgeError::RequestAbandoned
/// [`SyncOverAsyncWorker`]: super::SyncOverAsyncWorker
/// [`complete()`]: Self::complete
/// [`runtime_handle()`]: Self::runtime_handle
pub struct RunLoopCallback<T> {
    run_loop: RunLoopHandle,
    request: PendingRequest<(), T>,
}

impl<T> std::fmt::Debug for RunLoopCallback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLoopCallback").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> RunLoopCallback<T> {
    pub(super) fn new(run_loop: RunLoopHandle, request: PendingRequest<(), T>) -> Self {
        Self { run_loop, request }
    }

    /// The worker's current-thread runtime, for drivers that want to do their waiting
    /// as async tasks on the worker's run-loop.
    #[must_use]
    pub fn runtime_handle(&self) -> Handle { self.run_loop.runtime.clone() }

    /// Posts `outcome` to the worker's run-loop.
    pub fn complete(self, outcome: T) {
        let Self { run_loop, request } = self;
        let handler = move || {
            tracing::debug!(
                thread = ?std::thread::current().name(),
                "run-loop: completion received"
            );
            request.complete(outcome);
        };
        if run_loop
            .tx
            .send(LoopMessage::Dispatch(Box::new(handler)))
            .is_err()
        {
            // The handler (and the request inside it) was dropped with the error, so
            // the caller sees an abandoned request.
            tracing::debug!("run-loop already exited, completion dropped");
        }
    }
}
