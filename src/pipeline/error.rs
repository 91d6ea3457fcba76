// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the pipeline engine (spec §7).

use std::fmt;
use std::sync::Arc;

/// A boxed error returned directly by a processor, source, or sink call.
pub type ProcessError = Box<dyn std::error::Error + Send + Sync>;

/// An error a [`crate::pipeline::Source`] can hand back after its last
/// call to `next`. Wrapped in an `Arc` so `Source::error` can return an
/// owned handle to it without requiring the error type itself to be
/// `Clone`.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors produced while running a [`crate::pipeline::Pipeline`].
#[derive(Debug)]
pub enum PipelineError {
    /// A stage's processor returned an error; the stage terminated after
    /// publishing this once (first-wins per stage).
    Stage {
        index: usize,
        source: ProcessError,
    },
    /// The source reported a terminal error after its input was exhausted.
    Source(SharedError),
    /// The sink reported an error while consuming a payload.
    Sink(ProcessError),
    /// Construction-time misconfiguration (e.g. a zero-worker pool, or a
    /// broadcast stage with no processors).
    Config(String),
    /// The pipeline was cancelled before it ran to completion.
    Cancelled,
    /// More than one of the above occurred; order matches arrival order on
    /// the shared error channel.
    Aggregated(Vec<PipelineError>),
}

impl PipelineError {
    /// Collapse a batch of collected errors into a single `PipelineError`,
    /// or `None` if the batch is empty.
    pub fn aggregate(mut errors: Vec<PipelineError>) -> Option<PipelineError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(PipelineError::Aggregated(errors)),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Stage { index, source } => {
                write!(f, "pipeline stage {}: {}", index, source)
            }
            PipelineError::Source(err) => write!(f, "pipeline source: {}", err),
            PipelineError::Sink(err) => write!(f, "pipeline sink: {}", err),
            PipelineError::Config(msg) => write!(f, "pipeline configuration: {}", msg),
            PipelineError::Cancelled => write!(f, "pipeline cancelled"),
            PipelineError::Aggregated(errors) => {
                write!(f, "{} pipeline error(s): ", errors.len())?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PipelineError {}
