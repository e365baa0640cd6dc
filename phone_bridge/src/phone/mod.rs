// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The phone service on top of the owner loop: a [`Radio`] confined to the owner
//! thread, permission checks in front of every call, and PIN entry through a
//! [`SyncOverAsyncWorker`].
//!
//! | Call                      | Permission                 | Route                      |
//! | :------------------------ | :------------------------- | :------------------------- |
//! | `handle_pin_mmi`          | `MODIFY_PHONE_STATE`       | owner thread, sync         |
//! | `neighboring_cell_info`   | fine, else coarse location | owner thread, callback     |
//! | `answer_ringing_call`     | `MODIFY_PHONE_STATE`       | owner thread, fire/forget  |
//! | `silence_ringer`          | `MODIFY_PHONE_STATE`       | owner thread, fire/forget  |
//! | `end_call`                | `CALL_PHONE`               | owner thread, sync         |
//! | `is_sim_pin_enabled`      | `READ_PHONE_STATE`         | owner thread, sync         |
//! | `supply_pin`              | `MODIFY_PHONE_STATE`       | disposable worker          |
//!
//! [`SyncOverAsyncWorker`]: crate::SyncOverAsyncWorker

// Attach.
mod phone_interface;
mod phone_permissions;
mod phone_radio;

// Re-export.
pub use phone_interface::*;
pub use phone_permissions::*;
pub use phone_radio::*;

#[cfg(test)]
mod tests;
