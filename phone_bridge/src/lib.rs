// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # `phone_bridge`
//!
//! A telephony service has a radio object that is not thread safe: it must only be
//! touched from one designated owner thread. Requests arrive on arbitrary caller
//! threads, and many of those callers need an answer before they can return. This
//! crate bridges the two.
//!
//! - [`owner_thread`]: the owner loop, the [`RequestDispatcher`] that callers use to
//!   submit work to it synchronously or fire-and-forget, the [`PendingRequest`] that
//!   carries one answer back, and the [`AsyncCompletionAdapter`] that turns callback
//!   completions (including failures) into answers.
//! - [`sync_over_async`]: a disposable [`SyncOverAsyncWorker`] with its own run-loop,
//!   for blocking on a callback-based driver (the SIM card) without occupying the
//!   owner thread.
//! - [`phone`]: the permission-checked [`PhoneInterface`] on top of both.
//! - [`log`]: [`init_tracing()`] for apps and tests.
//!
//! ```no_run
//! use phone_bridge::{AllowAll, OwnerLoop, OwnerLoopConfig, PhoneInterface,
//!                    PhoneResource};
//! # use phone_bridge::{NeighboringCellsReply, Radio, RunLoopCallback,
//! #                    DriverOutcome, SecurityElementDriver};
//! # use std::sync::Arc;
//! # struct MyRadio;
//! # impl Radio for MyRadio {
//! #     fn handle_pin_mmi(&mut self, _: &str) -> bool { true }
//! #     fn request_neighboring_cells(&mut self, reply: NeighboringCellsReply) {
//! #         reply.cells(vec![]);
//! #     }
//! #     fn answer_ringing_call(&mut self) {}
//! #     fn silence_ringer(&mut self) {}
//! #     fn hang_up(&mut self) -> bool { false }
//! #     fn is_sim_pin_enabled(&self) -> bool { false }
//! # }
//! # struct MySim;
//! # impl SecurityElementDriver for MySim {
//! #     fn supply_pin(&self, _: &str, callback: RunLoopCallback<DriverOutcome>) {
//! #         callback.complete(Ok(()));
//! #     }
//! # }
//! # fn main() -> miette::Result<()> {
//! let owner_loop =
//!     OwnerLoop::spawn(PhoneResource::new(MyRadio), OwnerLoopConfig::default())?;
//! let phone = PhoneInterface::new(
//!     owner_loop.dispatcher(),
//!     Arc::new(MySim),
//!     Arc::new(AllowAll),
//! );
//!
//! let handled = phone.handle_pin_mmi("**04*1234*5678*5678#")?;
//! let cells = phone.neighboring_cell_info()?;
//! let pin_ok = phone.supply_pin("1234")?;
//!
//! owner_loop.shutdown()?;
//! # Ok(())
//! # }
//! ```

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod common;
pub mod log;
pub mod owner_thread;
pub mod phone;
pub mod sync_over_async;

// Re-export.
pub use common::*;
pub use log::*;
pub use owner_thread::*;
pub use phone::*;
pub use sync_over_async::*;
