// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach.
pub mod common_bridge_error;
pub mod common_enums;

// Re-export.
pub use common_bridge_error::*;
pub use common_enums::*;
