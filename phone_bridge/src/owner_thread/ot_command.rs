// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{CompletionToken, OwnedResource, PendingRequest};

/// Request slot type for a resource.
pub type ResourceRequest<R> =
    PendingRequest<<R as OwnedResource>::Arg, <R as OwnedResource>::Output>;

/// A message in the owner loop's queue.
///
/// Callbacks come back as [`Command::AsyncCompleted`] through the same queue as
/// everything else, so all owner-thread activity is totally ordered.
#[allow(missing_debug_implementations)]
pub enum Command<R: OwnedResource> {
    /// Run a synchronous operation and complete `request` with its result.
    ExecuteAndReturn { op: R::Op, request: ResourceRequest<R> },

    /// Start an operation whose result arrives through a callback. `request` is
    /// parked in the [`AsyncCompletionAdapter`] until then.
    ///
    /// [`AsyncCompletionAdapter`]: super::AsyncCompletionAdapter
    InitiateAsync { op: R::Op, request: ResourceRequest<R> },

    /// Run an operation for its side effects. No request, no result.
    FireAndForget { op: R::Op, arg: R::Arg },

    /// A callback fired for a previously minted token.
    AsyncCompleted {
        token: CompletionToken,
        outcome: AsyncOutcome<R::Output>,
    },

    /// Stop after everything queued before this message has run.
    Shutdown,
}

impl<R: OwnedResource> Command<R> {
    /// Short name for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Command::ExecuteAndReturn { .. } => "ExecuteAndReturn",
            Command::InitiateAsync { .. } => "InitiateAsync",
            Command::FireAndForget { .. } => "FireAndForget",
            Command::AsyncCompleted { .. } => "AsyncCompleted",
            Command::Shutdown => "Shutdown",
        }
    }
}

/// What a resource's callback reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncOutcome<O> {
    /// The operation succeeded. `None` means it produced no usable payload.
    Success(Option<O>),
    /// The operation failed.
    Failure(String),
}
