// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A disposable worker with its own run-loop. See [`SyncOverAsyncWorker`].

use super::{LoopMessage, RunLoopCallback, RunLoopHandle};
use crate::{BridgeError, BridgeResult, Continuation, LivenessState, PendingRequest,
            TerminationGuard, ThreadLiveness};
use std::{sync::Arc, thread::JoinHandle};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Default name prefix for worker threads. The generation number is appended.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "sync-over-async";

/// Settings for [`SyncOverAsyncWorker::start()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOverAsyncConfig {
    pub thread_name: String,
}

impl Default for SyncOverAsyncConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

/// Turns one callback-based async operation into a blocking call, on a dedicated
/// short-lived thread that never touches the [`OwnerLoop`].
///
/// ```text
///  calling thread                       worker thread
///  ──────────────                       ─────────────
///  start() ─── spawn ─────────────────► build current-thread runtime
///     │                                 create message channel
///     ◄──────── ready (private signal) ─┘
///  call(submit) ─► driver op(callback)  block_on(run-loop) ◄─ callback.complete()
///     │                                      │ handler records outcome
///     ◄──────── completion signal ───────────┘
///  Quit + join ───────────────────────► run-loop exits, thread ends
/// ```
///
/// The callback is dispatched through the worker's own run-loop rather than the
/// owner loop, so waiting for a slow subsystem (a SIM card, a secure element) never
/// holds up the owner thread.
///
/// A worker is used for exactly one call: [`call()`] consumes it. The thread is joined
/// on every exit path, including when the worker is dropped without being called.
///
/// [`OwnerLoop`]: crate::OwnerLoop
/// [`call()`]: Self::call
pub struct SyncOverAsyncWorker {
    run_loop: RunLoopHandle,
    liveness: Arc<ThreadLiveness>,
    join_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SyncOverAsyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOverAsyncWorker")
            .field("liveness", &self.liveness)
            .finish_non_exhaustive()
    }
}

impl SyncOverAsyncWorker {
    /// Spawns the worker thread and blocks until its run-loop is ready to receive
    /// completions.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::ThreadSpawn`] if the thread could not be created.
    /// - [`BridgeError::RunLoopCreation`] if the worker's runtime could not be built.
    pub fn start(config: SyncOverAsyncConfig) -> BridgeResult<Self> {
        let liveness = Arc::new(ThreadLiveness::new());
        let ready = PendingRequest::new(());
        let ready_waiter = ready.waiter();

        let liveness_clone = Arc::clone(&liveness);
        let join_handle = std::thread::Builder::new()
            .name(format!("{}-gen-{}", config.thread_name, liveness.generation))
            .spawn(move || run_worker_thread(ready, liveness_clone))
            .map_err(BridgeError::ThreadSpawn)?;

        // A worker thread that dies before signalling abandons `ready`.
        let run_loop = match ready_waiter.wait().and_then(|it| it) {
            Ok(run_loop) => run_loop,
            Err(err) => {
                drop(join_handle.join());
                return Err(err);
            }
        };
        tracing::debug!(generation = liveness.generation, "worker run-loop ready");

        Ok(Self {
            run_loop,
            liveness,
            join_handle: Some(join_handle),
        })
    }

    /// The worker thread's liveness. Stays valid after the worker is consumed, so
    /// callers can confirm the thread is gone.
    #[must_use]
    pub fn liveness_tracker(&self) -> Arc<ThreadLiveness> { Arc::clone(&self.liveness) }

    #[must_use]
    pub fn liveness(&self) -> LivenessState { self.liveness.is_running() }

    /// Hands `submit` a [`RunLoopCallback`], blocks until the callback is completed,
    /// tears the run-loop down, and returns the outcome.
    ///
    /// Blocks forever if the driver holds the callback and never completes it.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RequestAbandoned`] if the callback was dropped uncompleted.
    pub fn call<T, F>(mut self, submit: F) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(RunLoopCallback<T>),
    {
        let request = PendingRequest::new(());
        let waiter = request.waiter();
        submit(RunLoopCallback::new(self.run_loop.clone(), request));

        tracing::debug!("waiting for completion");
        let outcome = waiter.wait();
        tracing::debug!(completed = outcome.is_ok(), "done");

        self.stop_and_join();
        outcome
    }

    fn stop_and_join(&mut self) {
        let Some(join_handle) = self.join_handle.take() else {
            return;
        };
        drop(self.run_loop.tx.send(LoopMessage::Quit));
        if join_handle.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }
}

impl Drop for SyncOverAsyncWorker {
    fn drop(&mut self) { self.stop_and_join(); }
}

/// Body of the worker thread.
fn run_worker_thread(
    ready: PendingRequest<(), BridgeResult<RunLoopHandle>>,
    liveness: Arc<ThreadLiveness>,
) {
    let _guard = TerminationGuard::new(liveness);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            ready.complete(Err(BridgeError::RunLoopCreation(err)));
            return;
        }
    };

    // The receiver exists before readiness is signalled, so nothing posted after
    // `start()` returns can be lost.
    let (tx, rx) = unbounded_channel();
    ready.complete(Ok(RunLoopHandle {
        tx,
        runtime: runtime.handle().clone(),
    }));

    runtime.block_on(run_loop(rx));
    tracing::debug!("worker run-loop exited");
}

async fn run_loop(mut rx: UnboundedReceiver<LoopMessage>) {
    while let Some(message) = rx.recv().await {
        if handle_message(message) == Continuation::Stop {
            break;
        }
    }
}

fn handle_message(message: LoopMessage) -> Continuation {
    match message {
        LoopMessage::Dispatch(handler) => {
            handler();
            Continuation::Continue
        }
        LoopMessage::Quit => Continuation::Stop,
    }
}
