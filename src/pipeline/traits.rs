// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The external collaborator contracts a crawler stage plugs into the
//! pipeline through (spec §4.I).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::{ProcessError, SharedError};
use super::payload::{Outcome, Payload, ProcessFailure};

/// Transforms one payload into zero or one payloads.
///
/// Returning `Ok(Outcome::Drop(p))` means "drop `p` silently" — the stage
/// runner still calls `p.mark_as_processed()` on the caller's behalf, it
/// simply does not forward it downstream. Returning `Err` must hand the
/// payload back inside [`ProcessFailure`] — the stage runner calls
/// `mark_as_processed` on it before publishing the error, since the
/// end-of-life hook binds along the error branch too (spec §8).
#[async_trait]
pub trait Processor<P: Payload>: Send + Sync {
    async fn process(&self, cancel: &CancellationToken, payload: P) -> Result<Outcome<P>, ProcessFailure<P>>;
}

/// Produces a finite or unbounded sequence of payloads under external
/// control: the driver calls `next` to advance, `payload` to take the item,
/// and `error` once `next` returns `false` to learn why the source stopped.
#[async_trait]
pub trait Source<P: Payload>: Send {
    async fn next(&mut self, cancel: &CancellationToken) -> bool;
    fn payload(&mut self) -> P;
    fn error(&self) -> Option<SharedError>;
}

/// Consumes payloads one at a time. The last stop before
/// `mark_as_processed` — the driver calls it regardless of the outcome.
#[async_trait]
pub trait Sink<P: Payload>: Send {
    async fn consume(&mut self, cancel: &CancellationToken, payload: &P) -> Result<(), ProcessError>;
}
