// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The security-element driver seam and the blocking PIN check built on
//! [`SyncOverAsyncWorker`].

use super::{RunLoopCallback, SyncOverAsyncConfig, SyncOverAsyncWorker};
use crate::BridgeResult;

/// Failure reported by a [`SecurityElementDriver`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("security element rejected the request: {0}")]
pub struct DriverFailure(pub String);

/// What a [`SecurityElementDriver`] reports through its callback.
pub type DriverOutcome = Result<(), DriverFailure>;

/// A subsystem with one asynchronous operation whose completion is delivered through
/// a callback bound to a run-loop (a SIM card, a secure element).
///
/// The driver must tolerate being called from an arbitrary thread.
pub trait SecurityElementDriver: Send + Sync {
    /// Starts verifying `pin`. Must eventually call [`RunLoopCallback::complete()`],
    /// from any thread, or drop the callback.
    fn supply_pin(&self, pin: &str, callback: RunLoopCallback<DriverOutcome>);
}

impl SyncOverAsyncWorker {
    /// Submits `pin` to `driver` and blocks until the driver answers.
    ///
    /// Returns `true` if the driver reported success, `false` if it reported a
    /// failure.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RequestAbandoned`] if the driver dropped the callback.
    ///
    /// [`BridgeError::RequestAbandoned`]: crate::BridgeError::RequestAbandoned
    pub fn check_pin(self, driver: &dyn SecurityElementDriver, pin: &str) -> BridgeResult<bool> {
        let outcome = self.call(|callback| driver.supply_pin(pin, callback))?;
        if let Err(failure) = &outcome {
            tracing::debug!(%failure, "PIN rejected");
        }
        Ok(outcome.is_ok())
    }
}

/// Starts a fresh [`SyncOverAsyncWorker`], runs [`SyncOverAsyncWorker::check_pin()`]
/// on it, and disposes of it.
///
/// # Errors
///
/// Any error from [`SyncOverAsyncWorker::start()`] or
/// [`SyncOverAsyncWorker::check_pin()`].
pub fn check_pin(
    driver: &dyn SecurityElementDriver,
    pin: &str,
    config: SyncOverAsyncConfig,
) -> BridgeResult<bool> {
    SyncOverAsyncWorker::start(config)?.check_pin(driver, pin)
}
