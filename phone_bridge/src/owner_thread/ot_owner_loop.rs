// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The owner thread and its serialized command loop. See [`OwnerLoop`] and
//! [`run_owner_loop()`].

use super::{AsyncCompletionAdapter, Command, CompletionHandle, OwnedResource,
            OwnerLoopConfig, RequestDispatcher, TerminationGuard, ThreadLiveness};
use crate::{BridgeError, BridgeResult, Continuation, LivenessState};
use std::{sync::Arc,
          thread::{JoinHandle, ThreadId}};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Handle to a running owner thread.
///
/// [`spawn()`] moves the resource onto a freshly spawned thread that owns an unbounded
/// FIFO queue of [`Command`]s. From then on the resource is only reachable through
/// that queue, via the [`RequestDispatcher`] returned by [`dispatcher()`].
///
/// ```text
///  caller threads                         owner thread
///  ──────────────                         ────────────
///  call_sync(op, arg) ──┐
///  call_sync(op, arg) ──┼──► [ FIFO queue ] ──► run_owner_loop()
///  call_async(op, arg) ─┘          ▲                 │ execute / initiate / fire
///                                  │                 ▼
///                                  └── CompletionHandle::deliver() (any thread)
/// ```
///
/// # Lifecycle
///
/// - [`shutdown()`] (or dropping the handle) enqueues [`Command::Shutdown`], so every
///   command submitted before it still runs, and then joins the thread.
/// - When the loop exits, commands still queued behind the shutdown and requests still
///   parked for a callback are dropped. Their callers wake with
///   [`BridgeError::LoopUnavailable`].
/// - A panic inside the resource ends the loop the same way. [`liveness()`] reports
///   [`LivenessState::Terminated`] in both cases.
///
/// [`dispatcher()`]: Self::dispatcher
/// [`liveness()`]: Self::liveness
/// [`shutdown()`]: Self::shutdown
/// [`spawn()`]: Self::spawn
pub struct OwnerLoop<R: OwnedResource> {
    dispatcher: RequestDispatcher<R>,
    liveness: Arc<ThreadLiveness>,
    join_handle: Option<JoinHandle<()>>,
}

impl<R: OwnedResource> std::fmt::Debug for OwnerLoop<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerLoop")
            .field("owner_thread_id", &self.dispatcher.owner_thread_id())
            .field("liveness", &self.liveness)
            .finish_non_exhaustive()
    }
}

impl<R: OwnedResource> OwnerLoop<R> {
    /// Moves `resource` onto a new owner thread and starts serving its queue.
    ///
    /// # Errors
    ///
    /// [`BridgeError::ThreadSpawn`] if the thread could not be created.
    pub fn spawn(resource: R, config: OwnerLoopConfig) -> BridgeResult<Self> {
        let (tx, rx) = unbounded_channel();
        let liveness = Arc::new(ThreadLiveness::new());

        let loop_tx = tx.clone();
        let liveness_clone = Arc::clone(&liveness);
        let join_handle = std::thread::Builder::new()
            .name(format!("{}-gen-{}", config.thread_name, liveness.generation))
            .spawn(move || run_owner_loop(resource, rx, loop_tx, liveness_clone))
            .map_err(BridgeError::ThreadSpawn)?;

        let owner_thread_id = join_handle.thread().id();
        tracing::debug!(
            ?owner_thread_id,
            generation = liveness.generation,
            "owner loop spawned"
        );

        Ok(Self {
            dispatcher: RequestDispatcher::new(tx, owner_thread_id, config.default_deadline),
            liveness,
            join_handle: Some(join_handle),
        })
    }

    /// A dispatcher for this loop. Clone it freely and hand it to caller threads.
    #[must_use]
    pub fn dispatcher(&self) -> RequestDispatcher<R> { self.dispatcher.clone() }

    #[must_use]
    pub fn owner_thread_id(&self) -> ThreadId { self.dispatcher.owner_thread_id() }

    #[must_use]
    pub fn liveness(&self) -> LivenessState { self.liveness.is_running() }

    #[must_use]
    pub fn generation(&self) -> u8 { self.liveness.generation }

    /// Lets every already-queued command run, then stops the owner thread and waits
    /// for it to exit.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopUnavailable`] if the owner thread had already died (it
    /// panicked, or it was stopped before).
    pub fn shutdown(mut self) -> BridgeResult<()> { self.stop_and_join() }

    fn stop_and_join(&mut self) -> BridgeResult<()> {
        let Some(join_handle) = self.join_handle.take() else {
            return Ok(());
        };

        // The loop may already be gone, in which case join() reports why.
        drop(self.dispatcher.sender().send(Command::Shutdown));

        if std::thread::current().id() == join_handle.thread().id() {
            // Dropped from inside the owner thread: the loop exits after this command.
            return Ok(());
        }

        join_handle.join().map_err(|_| {
            tracing::error!("owner thread panicked");
            BridgeError::LoopUnavailable
        })
    }
}

impl<R: OwnedResource> Drop for OwnerLoop<R> {
    fn drop(&mut self) { drop(self.stop_and_join()); }
}

/// State owned by the owner thread while its loop runs.
pub struct OwnerLoopState<R: OwnedResource> {
    resource: R,
    adapter: AsyncCompletionAdapter<R>,
    /// Clone of the queue's sender, used to mint [`CompletionHandle`]s that route
    /// callbacks back into the queue.
    tx: UnboundedSender<Command<R>>,
}

impl<R: OwnedResource> std::fmt::Debug for OwnerLoopState<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerLoopState")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

impl<R: OwnedResource> OwnerLoopState<R> {
    #[must_use]
    pub fn new(resource: R, tx: UnboundedSender<Command<R>>) -> Self {
        Self {
            resource,
            adapter: AsyncCompletionAdapter::new(),
            tx,
        }
    }

    pub fn resource(&self) -> &R { &self.resource }

    pub fn adapter(&self) -> &AsyncCompletionAdapter<R> { &self.adapter }

    /// Executes one command against the resource. Never blocks on a caller.
    pub fn handle_command(&mut self, command: Command<R>) -> Continuation {
        tracing::trace!(kind = command.kind(), "owner loop: dequeued");
        match command {
            Command::ExecuteAndReturn { op, request } => {
                tracing::debug!(?op, "owner loop: execute");
                let output = self.resource.execute(op, request.argument());
                request.complete(output);
            }

            Command::InitiateAsync { op, request } => {
                let token = self.adapter.mint_token();
                tracing::debug!(?op, %token, "owner loop: initiate");
                let handle = CompletionHandle::new(token, self.tx.clone());
                self.resource.initiate(op, request.argument(), handle);
                // Any delivery made inside initiate() is queued behind this command,
                // so parking afterwards cannot miss it.
                self.adapter.park(token, op, request);
            }

            Command::FireAndForget { op, arg } => {
                tracing::debug!(?op, "owner loop: fire and forget");
                self.resource.fire_and_forget(op, arg);
            }

            Command::AsyncCompleted { token, outcome } => {
                self.adapter.resolve(token, outcome);
            }

            Command::Shutdown => {
                tracing::debug!("owner loop: shutdown requested");
                return Continuation::Stop;
            }
        }
        Continuation::Continue
    }
}

/// Runs on the owner thread: dequeue, dispatch, repeat, until
/// [`Command::Shutdown`].
///
/// The [`TerminationGuard`] marks the loop terminated on every exit path, including
/// a panic in the resource.
pub fn run_owner_loop<R: OwnedResource>(
    resource: R,
    mut rx: UnboundedReceiver<Command<R>>,
    tx: UnboundedSender<Command<R>>,
    liveness: Arc<ThreadLiveness>,
) {
    let _guard = TerminationGuard::new(liveness);
    let mut state = OwnerLoopState::new(resource, tx);

    // The loop holds a sender itself, so `None` never arrives while it runs.
    while let Some(command) = rx.blocking_recv() {
        if state.handle_command(command) == Continuation::Stop {
            break;
        }
    }

    rx.close();
    let mut discarded = 0_usize;
    while let Ok(command) = rx.try_recv() {
        tracing::debug!(kind = command.kind(), "owner loop: discarding after shutdown");
        discarded += 1;
    }
    let outstanding = state.adapter.outstanding();
    if discarded > 0 || outstanding > 0 {
        tracing::warn!(
            discarded,
            outstanding,
            "owner loop exiting with unfinished requests, callers see LoopUnavailable"
        );
    }
    tracing::debug!("owner loop exited");
}
