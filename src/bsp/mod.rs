// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The bulk-synchronous-parallel graph engine (spec §2, §4.A–§4.E): a
//! Pregel-style orchestrator running user compute functions across
//! supersteps, with double-buffered per-vertex message queues, pluggable
//! aggregators, and an optional relay hook for cross-partition delivery.

pub mod aggregator;
pub mod error;
pub mod executor;
pub mod graph;
pub mod message;

pub use aggregator::{Aggregator, Int64Aggregator};
pub use error::{ConfigError, GraphError};
pub use executor::{Executor, ExecutorCallbacks, ExecutorError};
pub use graph::{ComputeFn, Edge, Graph, GraphConfig, Relayer, Vertex};
pub use message::{InMemoryQueue, Message, MessageIterator, Queue, QueueFactory};
