// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage runners: strategies binding processors to a scheduling policy
//! (spec §4.F).

mod broadcast;
mod elastic_pool;
mod fifo;
mod fixed_pool;

pub use broadcast::Broadcast;
pub use elastic_pool::ElasticPool;
pub use fifo::Fifo;
pub use fixed_pool::FixedPool;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::error::PipelineError;
use super::payload::Payload;

pub(crate) type PayloadReceiver<P> = Arc<Mutex<mpsc::Receiver<P>>>;
pub(crate) type PayloadSender<P> = mpsc::Sender<P>;
pub(crate) type ErrorSender = mpsc::Sender<PipelineError>;

/// The information a [`StageRunner`] needs to do its job (spec §4.F):
/// its position in the pipeline, and its input, output and error channels.
pub struct StageParams<P: Payload> {
    stage_index: usize,
    input: PayloadReceiver<P>,
    output: PayloadSender<P>,
    error: ErrorSender,
}

impl<P: Payload> StageParams<P> {
    pub(crate) fn new(
        stage_index: usize,
        input: PayloadReceiver<P>,
        output: PayloadSender<P>,
        error: ErrorSender,
    ) -> Self {
        Self {
            stage_index,
            input,
            output,
            error,
        }
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn input(&self) -> &PayloadReceiver<P> {
        &self.input
    }

    pub fn output(&self) -> &PayloadSender<P> {
        &self.output
    }

    pub fn error(&self) -> &ErrorSender {
        &self.error
    }
}

impl<P: Payload> Clone for StageParams<P> {
    fn clone(&self) -> Self {
        Self {
            stage_index: self.stage_index,
            input: Arc::clone(&self.input),
            output: self.output.clone(),
            error: self.error.clone(),
        }
    }
}

/// A strategy that reads incoming payloads from `params.input()`, processes
/// them, and writes results to `params.output()`.
///
/// `run` is expected to return once its input channel closes, the
/// cancellation token fires, or an unrecoverable error occurs.
#[async_trait]
pub trait StageRunner<P: Payload>: Send + Sync {
    async fn run(&self, cancel: CancellationToken, params: StageParams<P>);

    /// Upper bound on how many concurrent workers this runner may use —
    /// lets the driver size the shared error channel so no worker's error
    /// is ever dropped for lack of capacity. Defaults to 1 (FIFO).
    fn worker_count(&self) -> usize {
        1
    }
}
