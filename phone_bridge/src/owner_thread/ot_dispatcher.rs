// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The caller-facing side of the bridge. See [`RequestDispatcher`].

use super::{Command, OpCode, OpMode, OwnedResource, PendingRequest, RequestWaiter};
use crate::{BridgeError, BridgeResult};
use std::{thread::ThreadId, time::Duration};
use tokio::sync::mpsc::UnboundedSender;

/// Submits work to an [`OwnerLoop`] from any thread.
///
/// Cheap to clone. All clones feed the same FIFO queue, so commands run in the order
/// they were submitted, across all callers.
///
/// | Method                       | Blocks caller?        | Result                     |
/// | :--------------------------- | :-------------------- | :------------------------- |
/// | [`call_sync()`]              | Until completed       | The operation's output     |
/// | [`call_sync_with_deadline()`] | At most `timeout`    | Output or deadline error   |
/// | [`call_async()`]             | No                    | Nothing                    |
///
/// [`OwnerLoop`]: super::OwnerLoop
/// [`call_async()`]: Self::call_async
/// [`call_sync()`]: Self::call_sync
/// [`call_sync_with_deadline()`]: Self::call_sync_with_deadline
pub struct RequestDispatcher<R: OwnedResource> {
    tx: UnboundedSender<Command<R>>,
    owner_thread_id: ThreadId,
    default_deadline: Option<Duration>,
}

impl<R: OwnedResource> Clone for RequestDispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            owner_thread_id: self.owner_thread_id,
            default_deadline: self.default_deadline,
        }
    }
}

impl<R: OwnedResource> std::fmt::Debug for RequestDispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("owner_thread_id", &self.owner_thread_id)
            .field("default_deadline", &self.default_deadline)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<R: OwnedResource> RequestDispatcher<R> {
    #[must_use]
    pub fn new(
        tx: UnboundedSender<Command<R>>,
        owner_thread_id: ThreadId,
        default_deadline: Option<Duration>,
    ) -> Self {
        Self {
            tx,
            owner_thread_id,
            default_deadline,
        }
    }

    pub(super) fn sender(&self) -> &UnboundedSender<Command<R>> { &self.tx }

    #[must_use]
    pub fn owner_thread_id(&self) -> ThreadId { self.owner_thread_id }

    /// Whether the current thread is the owner thread. Synchronous calls from it
    /// would deadlock.
    #[must_use]
    pub fn is_owner_thread(&self) -> bool {
        std::thread::current().id() == self.owner_thread_id
    }

    /// Runs `op` on the owner thread and blocks until its result is available.
    ///
    /// Without a configured default deadline this waits forever, including when an
    /// initiated operation's callback never fires.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::WouldDeadlock`] when called from the owner thread. Returned
    ///   immediately, nothing is enqueued.
    /// - [`BridgeError::LoopUnavailable`] when the loop is gone, or goes away before
    ///   running the request.
    /// - [`BridgeError::DeadlineExceeded`] only with a default deadline configured.
    pub fn call_sync(&self, op: R::Op, arg: R::Arg) -> BridgeResult<R::Output> {
        if let Some(timeout) = self.default_deadline {
            return self.call_sync_with_deadline(op, arg, timeout);
        }
        self.submit(op, arg)?.wait().map_err(loop_gone)
    }

    /// Like [`call_sync()`], but stops waiting after `timeout`.
    ///
    /// Expiry only detaches this caller: the command stays queued (or parked) and the
    /// owner loop completes it later with nobody listening.
    ///
    /// # Errors
    ///
    /// Same as [`call_sync()`], plus [`BridgeError::DeadlineExceeded`].
    ///
    /// [`call_sync()`]: Self::call_sync
    pub fn call_sync_with_deadline(
        &self,
        op: R::Op,
        arg: R::Arg,
        timeout: Duration,
    ) -> BridgeResult<R::Output> {
        match self.submit(op, arg)?.wait_timeout(timeout).map_err(loop_gone)? {
            Some(output) => Ok(output),
            None => {
                tracing::warn!(?op, ?timeout, "caller gave up waiting");
                Err(BridgeError::DeadlineExceeded {
                    op: format!("{op:?}"),
                    timeout,
                })
            }
        }
    }

    /// Enqueues `op` as a fire-and-forget command and returns immediately. Allowed
    /// from the owner thread too, since it never waits.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopUnavailable`] when the loop is gone.
    pub fn call_async(&self, op: R::Op, arg: R::Arg) -> BridgeResult<()> {
        tracing::debug!(?op, "call_async");
        self.tx
            .send(Command::FireAndForget { op, arg })
            .map_err(|_| BridgeError::LoopUnavailable)
    }

    fn submit(&self, op: R::Op, arg: R::Arg) -> BridgeResult<RequestWaiter<R::Output>> {
        if self.is_owner_thread() {
            let err = BridgeError::WouldDeadlock {
                op: format!("{op:?}"),
            };
            tracing::error!(error = %err, "call_sync from the owner thread");
            return Err(err);
        }

        let request = PendingRequest::new(arg);
        let waiter = request.waiter();
        let command = match op.mode() {
            OpMode::Execute => Command::ExecuteAndReturn { op, request },
            OpMode::Initiate => Command::InitiateAsync { op, request },
        };
        tracing::debug!(?op, kind = command.kind(), "call_sync");
        self.tx
            .send(command)
            .map_err(|_| BridgeError::LoopUnavailable)?;
        Ok(waiter)
    }
}

/// A request that was dropped uncompleted by the dispatcher's loop means the loop was
/// torn down before (or while) serving it.
fn loop_gone(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::RequestAbandoned => BridgeError::LoopUnavailable,
        other => other,
    }
}
