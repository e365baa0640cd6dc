// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Errors surfaced by the owner-thread bridge and the sync-over-async worker. See
//! [`BridgeError`].

use std::time::Duration;

/// Type alias for results produced by this crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors from [`RequestDispatcher`], [`OwnerLoop`], [`SyncOverAsyncWorker`] and the
/// [`PhoneInterface`] facade.
///
/// | Variant                  | Cause                                                   | Fatal to  |
/// | :----------------------- | :------------------------------------------------------ | :-------- |
/// | [`WouldDeadlock`]        | Synchronous call issued from the owner thread itself    | The call  |
/// | [`LoopUnavailable`]      | Owner loop torn down, or it rejected the submission     | The call  |
/// | [`DeadlineExceeded`]     | Caller gave up waiting; the request may still complete  | The call  |
/// | [`AsyncOperationFailed`] | Callback reported an error (absorbed into a default)    | Nothing   |
/// | [`PermissionDenied`]     | The authorization collaborator refused the caller       | The call  |
/// | [`ThreadSpawn`]          | [`std::thread::Builder::spawn()`] failed                | Setup     |
/// | [`RunLoopCreation`]      | The worker's private runtime could not be built         | Setup     |
/// | [`RequestAbandoned`]     | Completion handle dropped without ever firing           | The call  |
///
/// [`AsyncOperationFailed`]: Self::AsyncOperationFailed
/// [`DeadlineExceeded`]: Self::DeadlineExceeded
/// [`LoopUnavailable`]: Self::LoopUnavailable
/// [`OwnerLoop`]: crate::OwnerLoop
/// [`PermissionDenied`]: Self::PermissionDenied
/// [`PhoneInterface`]: crate::PhoneInterface
/// [`RequestAbandoned`]: Self::RequestAbandoned
/// [`RequestDispatcher`]: crate::RequestDispatcher
/// [`RunLoopCreation`]: Self::RunLoopCreation
/// [`SyncOverAsyncWorker`]: crate::SyncOverAsyncWorker
/// [`ThreadSpawn`]: Self::ThreadSpawn
/// [`WouldDeadlock`]: Self::WouldDeadlock
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum BridgeError {
    /// A synchronous call was made from the owner thread, which would wait on the
    /// very queue it is supposed to be serving.
    #[error("Synchronous call to `{op}` from the owner thread would deadlock")]
    #[diagnostic(
        code(phone_bridge::owner_loop::would_deadlock),
        help(
            "Code running inside the owner loop must call the resource directly \
             or use `call_async`, never `call_sync`."
        )
    )]
    WouldDeadlock {
        /// Debug name of the operation that was requested.
        op: String,
    },

    /// The owner loop (or the worker run-loop) is gone.
    #[error("Owner loop is not accepting requests")]
    #[diagnostic(
        code(phone_bridge::owner_loop::unavailable),
        help("The loop was shut down or its thread exited. Spawn a new one.")
    )]
    LoopUnavailable,

    /// The caller's deadline expired before the owner loop produced a result.
    #[error("No result for `{op}` within {timeout:?}")]
    #[diagnostic(
        code(phone_bridge::owner_loop::deadline_exceeded),
        help(
            "The request was not cancelled; the owner loop may still complete it \
             later with nobody observing the result."
        )
    )]
    DeadlineExceeded {
        /// Debug name of the operation that was requested.
        op: String,
        /// How long the caller waited.
        timeout: Duration,
    },

    /// The resource's callback reported a failure or an empty payload. This is logged
    /// by the completion adapter; the waiting caller receives the operation's default
    /// value instead.
    #[error("Async operation `{op}` failed: {reason}")]
    #[diagnostic(code(phone_bridge::completion::async_operation_failed))]
    AsyncOperationFailed {
        /// Debug name of the operation that was requested.
        op: String,
        /// What the callback reported.
        reason: String,
    },

    /// The authorization collaborator refused the caller.
    #[error("Permission denied: caller lacks {permission}")]
    #[diagnostic(code(phone_bridge::phone::permission_denied))]
    PermissionDenied {
        /// Name of the missing capability.
        permission: String,
    },

    /// [`std::thread::Builder::spawn()`] failed.
    #[error("Failed to spawn a dedicated thread")]
    #[diagnostic(
        code(phone_bridge::thread_spawn),
        help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `cat /proc/sys/kernel/threads-max` for system-wide limit"
        )
    )]
    ThreadSpawn(#[source] std::io::Error),

    /// The worker's current-thread runtime could not be built.
    #[error("Failed to create the worker run-loop")]
    #[diagnostic(code(phone_bridge::sync_over_async::run_loop_creation))]
    RunLoopCreation(#[source] std::io::Error),

    /// The completion handle for a request was dropped without being fired.
    #[error("Request was abandoned before it completed")]
    #[diagnostic(
        code(phone_bridge::request_abandoned),
        help("The driver dropped its callback without invoking it.")
    )]
    RequestAbandoned,
}
