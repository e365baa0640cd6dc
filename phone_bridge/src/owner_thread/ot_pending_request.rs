// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One in-flight call: an argument, a write-once result slot, and the signal used to
//! wake the caller. See [`PendingRequest`] and [`RequestWaiter`].

use crate::{BridgeError, BridgeResult};
use std::{sync::{atomic::{AtomicBool, Ordering},
                 Arc, Condvar, Mutex, MutexGuard, PoisonError},
          time::Duration};

/// Lifecycle of a [`ResultSlot`].
///
/// ```text
/// Pending ──complete()──► Ready ──wait()──► Taken
///    │
///    └──dropped without complete()──► Abandoned
/// ```
#[derive(Debug)]
enum SlotState<T> {
    Pending,
    Ready(T),
    Taken,
    Abandoned,
}

/// The result slot and its [`Condvar`]. Each request owns its own pair, so a
/// completion wakes exactly the caller that is waiting on it and nobody else.
#[derive(Debug)]
struct ResultSlot<T> {
    state: Mutex<SlotState<T>>,
    signal: Condvar,
}

impl<T> ResultSlot<T> {
    /// The state is only ever replaced wholesale, so it is consistent even if a
    /// holder of the lock panicked.
    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves `next` into the slot if it is still [`SlotState::Pending`]. Returns
    /// `false` (and leaves the slot untouched) otherwise.
    fn settle(&self, next: SlotState<T>) -> bool {
        let settled = {
            let mut state = self.lock();
            if matches!(*state, SlotState::Pending) {
                *state = next;
                true
            } else {
                false
            }
        };
        if settled {
            self.signal.notify_all();
        }
        settled
    }
}

/// A request on its way to the owner thread.
///
/// Created by the caller immediately before submission, moved into the [`Command`]
/// that carries it, and completed by whoever executes it (the owner loop directly, or
/// the [`AsyncCompletionAdapter`] when the result arrives through a callback). The
/// caller keeps the [`RequestWaiter`] half obtained from [`waiter()`].
///
/// # Contract
///
/// - [`complete()`] may be called once. A second call is a programming error and
///   panics instead of overwriting the first result.
/// - Dropping a request that was never completed marks it abandoned, which wakes the
///   caller with [`BridgeError::RequestAbandoned`]. This is how a torn-down loop
///   releases callers whose commands it will never run.
///
/// [`AsyncCompletionAdapter`]: super::AsyncCompletionAdapter
/// [`Command`]: super::Command
/// [`complete()`]: Self::complete
/// [`waiter()`]: Self::waiter
#[derive(Debug)]
pub struct PendingRequest<A, T> {
    argument: A,
    slot: Arc<ResultSlot<T>>,
    waiter_issued: AtomicBool,
}

impl<A, T> PendingRequest<A, T> {
    #[must_use]
    pub fn new(argument: A) -> Self {
        Self {
            argument,
            slot: Arc::new(ResultSlot {
                state: Mutex::new(SlotState::Pending),
                signal: Condvar::new(),
            }),
            waiter_issued: AtomicBool::new(false),
        }
    }

    /// The argument this request was created with.
    pub fn argument(&self) -> &A { &self.argument }

    /// Returns the caller's half of this request.
    ///
    /// # Panics
    ///
    /// If called more than once. A request belongs to exactly one logical call.
    #[must_use]
    pub fn waiter(&self) -> RequestWaiter<T> {
        let already_issued = self.waiter_issued.swap(true, Ordering::SeqCst);
        assert!(
            !already_issued,
            "PendingRequest::waiter() called twice: a request has exactly one caller"
        );
        RequestWaiter {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Publishes `result` and wakes every thread blocked on this request.
    ///
    /// # Panics
    ///
    /// If this request was already completed.
    pub fn complete(&self, result: T) {
        let settled = self.slot.settle(SlotState::Ready(result));
        assert!(settled, "PendingRequest::complete() called twice on the same request");
    }

    /// Whether a result has been published (it may already have been taken).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(*self.slot.lock(), SlotState::Ready(_) | SlotState::Taken)
    }
}

impl<A, T> Drop for PendingRequest<A, T> {
    fn drop(&mut self) {
        // No-op when the request was completed.
        self.slot.settle(SlotState::Abandoned);
    }
}

/// The caller's half of a [`PendingRequest`]. Consumed by waiting on it, since the
/// result moves out to the caller.
#[derive(Debug)]
pub struct RequestWaiter<T> {
    slot: Arc<ResultSlot<T>>,
}

impl<T> RequestWaiter<T> {
    /// Blocks until the request is completed or abandoned.
    ///
    /// There is no upper bound: if nobody ever completes or drops the request, this
    /// never returns. Use [`wait_timeout()`] for a bounded wait.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RequestAbandoned`] if the request was dropped uncompleted.
    ///
    /// [`wait_timeout()`]: Self::wait_timeout
    pub fn wait(self) -> BridgeResult<T> {
        let guard = self
            .slot
            .signal
            .wait_while(self.slot.lock(), |state| {
                matches!(state, SlotState::Pending)
            })
            .unwrap_or_else(PoisonError::into_inner);
        take_settled(guard)
    }

    /// Like [`wait()`] but gives up after `timeout`, returning `Ok(None)`.
    ///
    /// Giving up only detaches this caller. The request stays alive and may still be
    /// completed later, with nobody observing the result.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RequestAbandoned`] if the request was dropped uncompleted.
    ///
    /// [`wait()`]: Self::wait
    pub fn wait_timeout(self, timeout: Duration) -> BridgeResult<Option<T>> {
        let (guard, wait_result) = self
            .slot
            .signal
            .wait_timeout_while(self.slot.lock(), timeout, |state| {
                matches!(state, SlotState::Pending)
            })
            .unwrap_or_else(PoisonError::into_inner);
        if wait_result.timed_out() && matches!(*guard, SlotState::Pending) {
            return Ok(None);
        }
        take_settled(guard).map(Some)
    }

    /// Non-blocking check.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(*self.slot.lock(), SlotState::Pending)
    }
}

fn take_settled<T>(mut guard: MutexGuard<'_, SlotState<T>>) -> BridgeResult<T> {
    match std::mem::replace(&mut *guard, SlotState::Taken) {
        SlotState::Ready(value) => Ok(value),
        SlotState::Abandoned => {
            *guard = SlotState::Abandoned;
            Err(BridgeError::RequestAbandoned)
        }
        // The waiter is consumed by waiting and only one is ever issued, so the value
        // cannot have been taken before, and the wait predicate excludes `Pending`.
        SlotState::Taken | SlotState::Pending => Err(BridgeError::RequestAbandoned),
    }
}
