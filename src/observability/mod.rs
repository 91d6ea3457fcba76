// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display` impl so that:
//!
//! * Magic strings don't get scattered across the pipeline and BSP engines
//! * Log output stays consistent regardless of which engine emits it
//! * Structured fields (for querying / span attributes) live next to the
//!   human-readable message instead of being reconstructed from it
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::pipeline` - stage/driver lifecycle and error-propagation events
//! * `messages::bsp` - superstep, worker, and executor lifecycle events

pub mod messages;
