// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Confines a resource to a single owner thread and lets any number of caller threads
//! use it, synchronously or not.
//!
//! # The problem
//!
//! Some resources (a modem or radio abstraction is the canonical case) are not thread
//! safe and must only be touched from one designated thread. Requests, however, arrive
//! on arbitrary threads (an IPC thread pool), and some of those callers need the result
//! before they can return.
//!
//! # The pieces
//!
//! | Type                       | Role                                                        |
//! | :------------------------- | :---------------------------------------------------------- |
//! | [`PendingRequest`]         | One in-flight call: argument, write-once result, signal     |
//! | [`OwnerLoop`]              | The owner thread: FIFO queue of [`Command`]s, one at a time |
//! | [`RequestDispatcher`]      | `call_sync` / `call_async` from any caller thread           |
//! | [`AsyncCompletionAdapter`] | Routes callback completions back to the parked request      |
//! | [`OwnedResource`]          | What you implement: the resource and its [`OpCode`]s        |
//!
//! # Control flow
//!
//! ```text
//! caller ─► call_sync ─► [queue] ─► owner loop ─► execute() ─► complete ─► caller wakes
//!                                        │
//!                                        └─► initiate(handle) ... later, any thread:
//!                                            handle.deliver() ─► [queue] ─► adapter
//!                                            ─► complete (payload or fallback) ─► wakes
//! ```
//!
//! Callback completions travel through the same queue as commands, so everything the
//! owner thread does is totally ordered.
//!
//! # Guarantees
//!
//! 1. The resource is only ever touched on the owner thread.
//! 2. Commands run in submission order, one at a time.
//! 3. A blocked caller is woken exactly once, by the one writer of its request.
//! 4. The owner loop never waits on a caller. A synchronous call from the owner thread
//!    fails fast with [`BridgeError::WouldDeadlock`].
//! 5. An initiated operation whose callback fails, or succeeds without a payload,
//!    still resolves the caller, with [`OwnedResource::fallback_output()`].
//!
//! A [`CompletionHandle`] dropped without firing counts as a failed callback. A handle
//! that is held but never fired blocks its caller forever unless a deadline is used
//! ([`RequestDispatcher::call_sync_with_deadline()`] or
//! [`OwnerLoopConfig::default_deadline`]).
//!
//! [`BridgeError::WouldDeadlock`]: crate::BridgeError::WouldDeadlock

// Attach.
mod ot_command;
mod ot_completion_adapter;
mod ot_config;
mod ot_di_traits;
mod ot_dispatcher;
mod ot_liveness;
mod ot_owner_loop;
mod ot_pending_request;

// Re-export.
pub use ot_command::*;
pub use ot_completion_adapter::*;
pub use ot_config::*;
pub use ot_di_traits::*;
pub use ot_dispatcher::*;
pub use ot_liveness::*;
pub use ot_owner_loop::*;
pub use ot_pending_request::*;

#[cfg(test)]
mod tests;
