// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::time::Duration;

/// Default name prefix for the owner thread. The generation number is appended.
pub const DEFAULT_OWNER_THREAD_NAME: &str = "owner-loop";

/// Settings for [`OwnerLoop::spawn()`].
///
/// Fields:
/// - `thread_name`: prefix for the owner thread's name, shows up in logs and
///   debuggers as `<thread_name>-gen-<n>`.
/// - `default_deadline`: when set, [`RequestDispatcher::call_sync()`] stops waiting
///   after this long and returns [`BridgeError::DeadlineExceeded`]. `None` (the
///   default) waits forever.
///
/// [`BridgeError::DeadlineExceeded`]: crate::BridgeError::DeadlineExceeded
/// [`OwnerLoop::spawn()`]: super::OwnerLoop::spawn
/// [`RequestDispatcher::call_sync()`]: super::RequestDispatcher::call_sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerLoopConfig {
    pub thread_name: String,
    pub default_deadline: Option<Duration>,
}

impl Default for OwnerLoopConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_OWNER_THREAD_NAME.to_string(),
            default_deadline: None,
        }
    }
}

impl OwnerLoopConfig {
    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    #[must_use]
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = Some(deadline);
        self
    }
}
