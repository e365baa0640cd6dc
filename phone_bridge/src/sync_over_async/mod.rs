// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Blocking calls over callback-based drivers, without going through the owner
//! thread. See [`SyncOverAsyncWorker`].

// Attach.
mod soa_callback;
mod soa_driver;
mod soa_worker;

// Re-export.
pub use soa_callback::RunLoopCallback;
use soa_callback::{LoopMessage, RunLoopHandle};
pub use soa_driver::*;
pub use soa_worker::*;
