// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Routes callback completions back to the request that is waiting for them. See
//! [`AsyncCompletionAdapter`].

use super::{AsyncOutcome, Command, OwnedResource, ResourceRequest};
use crate::BridgeError;
use std::{collections::HashMap, fmt};
use tokio::sync::mpsc::UnboundedSender;

/// Correlates a callback with the request it answers. Minted once per initiated
/// operation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionToken(u64);

impl CompletionToken {
    #[must_use]
    pub fn as_u64(self) -> u64 { self.0 }
}

impl fmt::Display for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Handed to [`OwnedResource::initiate()`]. Firing it re-enters the owner loop's queue
/// as a [`Command::AsyncCompleted`], so it can be fired from any thread.
///
/// Firing consumes the handle. If the owner loop is gone by then the outcome is
/// dropped.
///
/// Dropping the handle without firing it delivers a failure, since the callback can
/// no longer happen. The parked request then resolves with the fallback output.
pub struct CompletionHandle<R: OwnedResource> {
    token: CompletionToken,
    /// `None` once fired.
    tx: Option<UnboundedSender<Command<R>>>,
}

impl<R: OwnedResource> fmt::Debug for CompletionHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl<R: OwnedResource> CompletionHandle<R> {
    #[must_use]
    pub fn new(token: CompletionToken, tx: UnboundedSender<Command<R>>) -> Self {
        Self {
            token,
            tx: Some(tx),
        }
    }

    #[must_use]
    pub fn token(&self) -> CompletionToken { self.token }

    pub fn deliver(mut self, outcome: AsyncOutcome<R::Output>) { self.send(outcome); }

    pub fn succeed(self, output: R::Output) {
        self.deliver(AsyncOutcome::Success(Some(output)));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.deliver(AsyncOutcome::Failure(reason.into()));
    }

    fn send(&mut self, outcome: AsyncOutcome<R::Output>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let token = self.token;
        if tx.send(Command::AsyncCompleted { token, outcome }).is_err() {
            tracing::debug!(%token, "completion dropped: owner loop is gone");
        }
    }
}

impl<R: OwnedResource> Drop for CompletionHandle<R> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::debug!(token = %self.token, "completion handle dropped unfired");
            self.send(AsyncOutcome::Failure(HANDLE_DROPPED.to_string()));
        }
    }
}

/// Failure reason delivered by a [`CompletionHandle`] dropped without firing.
pub const HANDLE_DROPPED: &str = "completion handle dropped";

/// What [`AsyncCompletionAdapter::resolve()`] did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The callback's payload was handed to the caller.
    Delivered,
    /// The callback failed or had no payload; the caller got the fallback value.
    Fallback,
    /// No parked request matched the token.
    UnknownToken,
}

struct ParkedRequest<R: OwnedResource> {
    op: R::Op,
    request: ResourceRequest<R>,
}

/// Lives inside the owner loop. Mints [`CompletionToken`]s, parks the requests of
/// initiated operations, and completes them when their callback comes back.
///
/// # Always resolve
///
/// A callback that reports a failure, or a success without a payload, still completes
/// the request, with [`OwnedResource::fallback_output()`]. A blocked caller therefore
/// always sees a terminal value, at the cost of not being able to tell "empty" from
/// "failed". The failure is logged as [`BridgeError::AsyncOperationFailed`].
pub struct AsyncCompletionAdapter<R: OwnedResource> {
    next_token: u64,
    parked: HashMap<CompletionToken, ParkedRequest<R>>,
}

impl<R: OwnedResource> fmt::Debug for AsyncCompletionAdapter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCompletionAdapter")
            .field("next_token", &self.next_token)
            .field("outstanding", &self.parked.len())
            .finish()
    }
}

impl<R: OwnedResource> Default for AsyncCompletionAdapter<R> {
    fn default() -> Self { Self::new() }
}

impl<R: OwnedResource> AsyncCompletionAdapter<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: 0,
            parked: HashMap::new(),
        }
    }

    pub fn mint_token(&mut self) -> CompletionToken {
        self.next_token += 1;
        CompletionToken(self.next_token)
    }

    pub fn park(&mut self, token: CompletionToken, op: R::Op, request: ResourceRequest<R>) {
        let previous = self.parked.insert(token, ParkedRequest { op, request });
        debug_assert!(previous.is_none(), "completion token {token} reused");
    }

    pub fn resolve(
        &mut self,
        token: CompletionToken,
        outcome: AsyncOutcome<R::Output>,
    ) -> Resolution {
        let Some(ParkedRequest { op, request }) = self.parked.remove(&token) else {
            tracing::warn!(%token, "completion for unknown or already resolved token");
            return Resolution::UnknownToken;
        };

        match outcome {
            AsyncOutcome::Success(Some(output)) => {
                tracing::debug!(%token, ?op, "async operation completed");
                request.complete(output);
                Resolution::Delivered
            }
            AsyncOutcome::Success(None) => {
                tracing::warn!(%token, ?op, "async operation returned no payload, using fallback");
                request.complete(R::fallback_output(op));
                Resolution::Fallback
            }
            AsyncOutcome::Failure(reason) => {
                let err = BridgeError::AsyncOperationFailed {
                    op: format!("{op:?}"),
                    reason,
                };
                tracing::warn!(%token, error = %err, "using fallback");
                request.complete(R::fallback_output(op));
                Resolution::Fallback
            }
        }
    }

    /// Number of parked requests still waiting for their callback.
    #[must_use]
    pub fn outstanding(&self) -> usize { self.parked.len() }
}
