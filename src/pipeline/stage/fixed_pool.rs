// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed-width worker pool (spec §4.F "Fixed worker pool").

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::fifo::Fifo;
use super::{StageParams, StageRunner};
use crate::pipeline::error::PipelineError;
use crate::pipeline::payload::Payload;
use crate::pipeline::traits::Processor;

/// Spawns `workers` independent [`Fifo`] instances sharing the same input,
/// output, and error channels. Ordering is NOT preserved across workers
/// (explicit, spec §5). Exits only once every worker has exited.
pub struct FixedPool<P: Payload> {
    processor: Arc<dyn Processor<P>>,
    workers: usize,
}

impl<P: Payload> FixedPool<P> {
    /// Non-positive `workers` is a construction-time error (spec §7).
    pub fn new(processor: Arc<dyn Processor<P>>, workers: usize) -> Result<Self, PipelineError> {
        if workers == 0 {
            return Err(PipelineError::Config(
                "fixed worker pool requires at least one worker".to_string(),
            ));
        }
        Ok(Self { processor, workers })
    }
}

#[async_trait]
impl<P: Payload> StageRunner<P> for FixedPool<P> {
    async fn run(&self, cancel: CancellationToken, params: StageParams<P>) {
        let mut workers: JoinSet<()> = JoinSet::new();
        for _ in 0..self.workers {
            let fifo = Fifo::new(Arc::clone(&self.processor));
            let worker_params = params.clone();
            let worker_cancel = cancel.clone();
            workers.spawn(async move { fifo.run(worker_cancel, worker_params).await });
        }
        while workers.join_next().await.is_some() {}
    }

    fn worker_count(&self) -> usize {
        self.workers
    }
}
