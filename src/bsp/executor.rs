// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The superstep-driving orchestration loop (spec §4.E).

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::observability::messages::bsp::{ExecutorHalted, SuperstepCompleted};
use crate::observability::messages::StructuredLog;

use super::error::GraphError;
use super::graph::Graph;

type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// A hook invoked before each superstep — a good place to reset
/// per-superstep aggregator state.
pub type PreStep<V, E> = Box<dyn Fn(&Graph<V, E>) -> Result<(), CallbackError> + Send + Sync>;
/// A hook invoked after each superstep with the number of vertices that
/// were active during it.
pub type PostStep<V, E> = Box<dyn Fn(&Graph<V, E>, i64) -> Result<(), CallbackError> + Send + Sync>;
/// A hook invoked after `PostStep` to decide whether to run another
/// superstep.
pub type PostStepKeepRunning<V, E> = Box<dyn Fn(&Graph<V, E>, i64) -> Result<bool, CallbackError> + Send + Sync>;

/// Callbacks an [`Executor`] invokes around each superstep. Every field is
/// optional; an absent callback behaves as identity (`PreStep`/`PostStep`)
/// or "keep running" (`PostStepKeepRunning`).
#[derive(Default)]
pub struct ExecutorCallbacks<V, E> {
    pub pre_step: Option<PreStep<V, E>>,
    pub post_step: Option<PostStep<V, E>>,
    pub post_step_keep_running: Option<PostStepKeepRunning<V, E>>,
}

/// Errors that can terminate [`Executor::run_to_completion`].
#[derive(Debug)]
pub enum ExecutorError {
    Cancelled,
    PreStep(CallbackError),
    Step(GraphError),
    PostStep(CallbackError),
    PostStepKeepRunning(CallbackError),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::Cancelled => write!(f, "executor cancelled"),
            ExecutorError::PreStep(err) => write!(f, "pre-step callback failed: {}", err),
            ExecutorError::Step(err) => write!(f, "superstep failed: {}", err),
            ExecutorError::PostStep(err) => write!(f, "post-step callback failed: {}", err),
            ExecutorError::PostStepKeepRunning(err) => {
                write!(f, "post-step-keep-running callback failed: {}", err)
            }
        }
    }
}

impl std::error::Error for ExecutorError {}

/// Orchestrates a [`Graph`] through repeated supersteps until cancellation,
/// a callback error, a step error, or `PostStepKeepRunning` returning
/// `false`. All parallelism lives inside `Graph::step`; the executor itself
/// is single-threaded.
pub struct Executor<V, E> {
    graph: Arc<Graph<V, E>>,
    callbacks: ExecutorCallbacks<V, E>,
}

impl<V, E> Executor<V, E>
where
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new(graph: Arc<Graph<V, E>>, callbacks: ExecutorCallbacks<V, E>) -> Self {
        graph.reset_superstep_counter();
        Self { graph, callbacks }
    }

    pub async fn run_to_completion(&self, cancel: CancellationToken) -> Result<(), ExecutorError> {
        loop {
            if cancel.is_cancelled() {
                ExecutorHalted {
                    superstep: self.graph.superstep() as usize,
                    reason: "cancelled",
                }
                .log();
                return Err(ExecutorError::Cancelled);
            }

            if let Some(pre_step) = &self.callbacks.pre_step {
                pre_step(&self.graph).map_err(ExecutorError::PreStep)?;
            }

            let (active_in_step, error) = self.graph.step().await;
            SuperstepCompleted {
                superstep: self.graph.superstep() as usize,
                active_in_step,
            }
            .log();
            if let Some(error) = error {
                ExecutorHalted {
                    superstep: self.graph.superstep() as usize,
                    reason: "step error",
                }
                .log();
                return Err(ExecutorError::Step(error));
            }

            if let Some(post_step) = &self.callbacks.post_step {
                post_step(&self.graph, active_in_step).map_err(ExecutorError::PostStep)?;
            }

            let keep_running = match &self.callbacks.post_step_keep_running {
                Some(cb) => cb(&self.graph, active_in_step).map_err(ExecutorError::PostStepKeepRunning)?,
                None => true,
            };

            if !keep_running {
                ExecutorHalted {
                    superstep: self.graph.superstep() as usize,
                    reason: "post_step_keep_running returned false",
                }
                .log();
                return Ok(());
            }

            // Mirrors the reference executor's for-loop post-statement: the
            // superstep counter only advances when another iteration
            // follows, never on the iteration that decides to stop.
            self.graph.advance_superstep();
        }
    }
}
