// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline stage and driver lifecycle events.

use super::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A pipeline run started with the given stage count.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::pipeline::PipelineStarted;
///
/// let msg = PipelineStarted { stage_count: 3 };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineStarted {
    pub stage_count: usize,
}

impl Display for PipelineStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "starting pipeline with {} stages", self.stage_count)
    }
}

impl StructuredLog for PipelineStarted {
    fn log(&self) {
        tracing::info!(stage_count = self.stage_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pipeline_run", span_name = name, stage_count = self.stage_count)
    }
}

/// A stage reported an error and is terminating.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::pipeline::StageFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
/// let msg = StageFailed {
///     stage_index: 1,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct StageFailed<'a> {
    pub stage_index: usize,
    pub error: &'a (dyn std::error::Error + 'static),
}

impl Display for StageFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "pipeline stage {} failed: {}", self.stage_index, self.error)
    }
}

impl StructuredLog for StageFailed<'_> {
    fn log(&self) {
        tracing::error!(stage_index = self.stage_index, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("stage_failed", span_name = name, stage_index = self.stage_index)
    }
}

/// The source produced a terminal error after its input channel closed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::pipeline::SourceFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
/// let msg = SourceFailed { error: &error };
///
/// tracing::error!("{}", msg);
/// ```
pub struct SourceFailed<'a> {
    pub error: &'a (dyn std::error::Error + 'static),
}

impl Display for SourceFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "pipeline source failed: {}", self.error)
    }
}

impl StructuredLog for SourceFailed<'_> {
    fn log(&self) {
        tracing::error!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("source_failed", span_name = name)
    }
}

/// A pipeline run completed, successfully or not.
///
/// # Log Level
/// `info!` when error-free, `warn!` when `error_count` is nonzero
///
/// # Example
/// ```
/// use linkgraph_engines::observability::messages::pipeline::PipelineCompleted;
///
/// let msg = PipelineCompleted { error_count: 0 };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineCompleted {
    pub error_count: usize,
}

impl Display for PipelineCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.error_count == 0 {
            write!(f, "pipeline completed with no errors")
        } else {
            write!(f, "pipeline completed with {} error(s)", self.error_count)
        }
    }
}

impl StructuredLog for PipelineCompleted {
    fn log(&self) {
        if self.error_count == 0 {
            tracing::info!(error_count = self.error_count, "{}", self);
        } else {
            tracing::warn!(error_count = self.error_count, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pipeline_run", span_name = name, error_count = self.error_count)
    }
}
