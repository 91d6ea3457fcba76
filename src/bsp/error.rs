// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the graph engine (spec §7).

use std::fmt;

/// Construction-time misconfiguration of a [`crate::bsp::Graph`]. Fatal —
/// reported back from `GraphConfig::validate`/`Graph::new`, never panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingComputeFn,
    MissingQueueFactory,
    NonPositiveWorkerCount(i64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingComputeFn => write!(f, "graph config: compute function is required"),
            ConfigError::MissingQueueFactory => write!(f, "graph config: queue factory is required"),
            ConfigError::NonPositiveWorkerCount(n) => {
                write!(f, "graph config: compute worker count must be positive, got {}", n)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors produced while a [`crate::bsp::Graph`] is running.
#[derive(Debug)]
pub enum GraphError {
    /// `AddEdge` was called with a source vertex id not present in the graph.
    UnknownEdgeSource { src_id: String },
    /// Sentinel returned by a [`crate::bsp::Relayer`] to decline a message —
    /// not surfaced to callers of `SendMessage`, handled internally.
    DestinationIsLocal,
    /// `SendMessage` targeted an id that is neither a local vertex nor
    /// claimed by the registered relayer.
    InvalidMessageDestination { dst_id: String },
    /// The graph was closed more than once.
    AlreadyClosed,
    /// A vertex's compute function returned an error.
    Compute {
        vertex_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A message queue failed to discard its read buffer after a step.
    QueueDiscard {
        vertex_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownEdgeSource { src_id } => {
                write!(f, "unknown edge source vertex {:?}", src_id)
            }
            GraphError::DestinationIsLocal => write!(f, "destination is local"),
            GraphError::InvalidMessageDestination { dst_id } => {
                write!(f, "invalid message destination {:?}", dst_id)
            }
            GraphError::AlreadyClosed => write!(f, "graph already closed"),
            GraphError::Compute { vertex_id, source } => {
                write!(f, "compute function for vertex {:?} failed: {}", vertex_id, source)
            }
            GraphError::QueueDiscard { vertex_id, source } => {
                write!(
                    f,
                    "discarding unprocessed messages for vertex {:?} failed: {}",
                    vertex_id, source
                )
            }
        }
    }
}

impl std::error::Error for GraphError {}
