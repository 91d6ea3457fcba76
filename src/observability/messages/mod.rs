// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging and distributed tracing.
//!
//! Each message type implements:
//!
//! * `Display` - human-readable output
//! * `StructuredLog` - machine-readable fields + span creation
//!
//! Organized by engine: `pipeline` for stage/driver events, `bsp` for
//! superstep/worker events.

pub mod bsp;
pub mod pipeline;

use tracing::Span;

/// Messages that support structured logging and distributed tracing.
///
/// `log` emits both the `Display` message and queryable fields; `span`
/// creates a `tracing::Span` carrying those same fields as attributes so a
/// caller can enter it for the duration of the work the message describes.
pub trait StructuredLog {
    fn log(&self);
    fn span(&self, name: &str) -> Span;
}
