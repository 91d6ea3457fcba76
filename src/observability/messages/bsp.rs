// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for BSP superstep and worker lifecycle events.

use super::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A superstep completed with the given number of active vertices.
///
/// # Log Level
/// `debug!` - Routine per-step progress, high volume
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::bsp::SuperstepCompleted;
///
/// let msg = SuperstepCompleted {
///     superstep: 3,
///     active_in_step: 12,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct SuperstepCompleted {
    pub superstep: usize,
    pub active_in_step: i64,
}

impl Display for SuperstepCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "superstep {} completed, {} vertices active",
            self.superstep, self.active_in_step
        )
    }
}

impl StructuredLog for SuperstepCompleted {
    fn log(&self) {
        tracing::debug!(
            superstep = self.superstep,
            active_in_step = self.active_in_step,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "superstep",
            span_name = name,
            superstep = self.superstep,
            active_in_step = self.active_in_step,
        )
    }
}

/// A vertex's compute function (or its queue discard) returned an error.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::bsp::VertexComputeFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
/// let msg = VertexComputeFailed {
///     vertex_id: "page-42",
///     superstep: 3,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct VertexComputeFailed<'a> {
    pub vertex_id: &'a str,
    pub superstep: usize,
    pub error: &'a (dyn std::error::Error + 'static),
}

impl Display for VertexComputeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "vertex {:?} failed in superstep {}: {}",
            self.vertex_id, self.superstep, self.error
        )
    }
}

impl StructuredLog for VertexComputeFailed<'_> {
    fn log(&self) {
        tracing::error!(
            vertex_id = self.vertex_id,
            superstep = self.superstep,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "vertex_compute_failed",
            span_name = name,
            vertex_id = self.vertex_id,
            superstep = self.superstep,
        )
    }
}

/// The executor is halting after a step, reporting why.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::bsp::ExecutorHalted;
///
/// let msg = ExecutorHalted {
///     superstep: 5,
///     reason: "post_step_keep_running returned false",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutorHalted {
    pub superstep: usize,
    pub reason: &'static str,
}

impl Display for ExecutorHalted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "executor halted at superstep {}: {}", self.superstep, self.reason)
    }
}

impl StructuredLog for ExecutorHalted {
    fn log(&self) {
        tracing::info!(superstep = self.superstep, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("executor_halted", span_name = name, superstep = self.superstep)
    }
}
