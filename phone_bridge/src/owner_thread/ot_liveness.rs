// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Liveness tracking for dedicated threads. See [`ThreadLiveness`] and
//! [`TerminationGuard`].

use crate::LivenessState;
use std::sync::{atomic::{AtomicBool, AtomicU8, Ordering},
                Arc};

/// Counter for thread generations. Incremented each time a dedicated thread is
/// spawned. Wraps naturally from `255` to `0`.
static THREAD_GENERATION: AtomicU8 = AtomicU8::new(0);

/// A tracker for thread liveness state and incarnation generation.
///
/// Shared via [`Arc`] between the handle that spawned a thread ([`OwnerLoop`],
/// [`SyncOverAsyncWorker`]) and the thread itself. The thread holds a
/// [`TerminationGuard`] which flips the flag when the thread's loop exits, including
/// by unwinding.
///
/// [`AtomicBool`] rather than [`Mutex<bool>`] because [`is_running()`] is queried
/// from caller threads that may already hold other locks.
///
/// [`Mutex<bool>`]: std::sync::Mutex
/// [`OwnerLoop`]: super::OwnerLoop
/// [`SyncOverAsyncWorker`]: crate::SyncOverAsyncWorker
/// [`is_running()`]: Self::is_running
#[derive(Debug)]
pub struct ThreadLiveness {
    is_running: AtomicBool,

    /// Thread generation number. Immutable after creation.
    pub generation: u8,
}

impl ThreadLiveness {
    /// Creates new liveness in the [`Running`] state with a fresh generation.
    ///
    /// [`Running`]: LivenessState::Running
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_running: AtomicBool::new(true),
            generation: THREAD_GENERATION
                .fetch_add(1, Ordering::SeqCst)
                .wrapping_add(1),
        }
    }

    pub fn mark_terminated(&self) { self.is_running.store(false, Ordering::SeqCst); }

    #[must_use]
    pub fn is_running(&self) -> LivenessState {
        if self.is_running.load(Ordering::SeqCst) {
            LivenessState::Running
        } else {
            LivenessState::Terminated
        }
    }
}

impl Default for ThreadLiveness {
    fn default() -> Self { Self::new() }
}

/// [RAII] guard that calls [`mark_terminated()`] when a dedicated thread's loop exits.
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
/// [`mark_terminated()`]: ThreadLiveness::mark_terminated
#[derive(Debug)]
pub struct TerminationGuard {
    liveness: Arc<ThreadLiveness>,
}

impl TerminationGuard {
    #[must_use]
    pub fn new(liveness: Arc<ThreadLiveness>) -> Self { Self { liveness } }
}

impl Drop for TerminationGuard {
    fn drop(&mut self) { self.liveness.mark_terminated(); }
}
