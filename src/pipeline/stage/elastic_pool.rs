// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Elastic (dynamic) worker pool (spec §4.F "Elastic (dynamic) worker pool").

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{StageParams, StageRunner};
use crate::pipeline::error::PipelineError;
use crate::pipeline::payload::{Outcome, Payload, ProcessFailure};
use crate::pipeline::traits::Processor;

/// Maintains a semaphore-style token pool of size `size`. Each incoming
/// payload acquires a token and is processed on its own task; the token is
/// released on completion. Shutdown drains the token pool back to full by
/// waiting for every spawned task to finish, guaranteeing all in-flight
/// work has completed before `run` returns.
pub struct ElasticPool<P: Payload> {
    processor: Arc<dyn Processor<P>>,
    size: usize,
}

impl<P: Payload> ElasticPool<P> {
    /// Non-positive `size` is a construction-time error (spec §7).
    pub fn new(processor: Arc<dyn Processor<P>>, size: usize) -> Result<Self, PipelineError> {
        if size == 0 {
            return Err(PipelineError::Config(
                "elastic worker pool requires a positive token count".to_string(),
            ));
        }
        Ok(Self { processor, size })
    }
}

#[async_trait]
impl<P: Payload> StageRunner<P> for ElasticPool<P> {
    async fn run(&self, cancel: CancellationToken, params: StageParams<P>) {
        let semaphore = Arc::new(Semaphore::new(self.size));
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            let payload_in = {
                let mut input = params.input().lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = input.recv() => received,
                }
            };
            let Some(mut payload_in) = payload_in else {
                break;
            };

            // The token acquire races cancellation while we already own
            // `payload_in` — losing the race must still flush its
            // end-of-life hook rather than dropping it silently.
            let permit = tokio::select! {
                _ = cancel.cancelled() => None,
                acquired = Arc::clone(&semaphore).acquire_owned() => acquired.ok(),
            };
            let Some(permit) = permit else {
                payload_in.mark_as_processed();
                break;
            };

            let processor = Arc::clone(&self.processor);
            let output = params.output().clone();
            let error = params.error().clone();
            let stage_index = params.stage_index();
            let task_cancel = cancel.clone();

            in_flight.spawn(async move {
                let _permit = permit;
                match processor.process(&task_cancel, payload_in).await {
                    Ok(Outcome::Forward(mut payload_out)) => {
                        let permit = tokio::select! {
                            _ = task_cancel.cancelled() => None,
                            permit = output.reserve() => permit.ok(),
                        };
                        match permit {
                            Some(permit) => permit.send(payload_out),
                            None => payload_out.mark_as_processed(),
                        }
                    }
                    Ok(Outcome::Drop(mut payload)) => {
                        payload.mark_as_processed();
                    }
                    Err(ProcessFailure { mut payload, source }) => {
                        payload.mark_as_processed();
                        let wrapped = PipelineError::Stage {
                            index: stage_index,
                            source,
                        };
                        let _ = error.try_send(wrapped);
                    }
                }
            });
        }

        // Drain: every acquired token's task must finish before we return.
        while in_flight.join_next().await.is_some() {}
    }

    fn worker_count(&self) -> usize {
        self.size
    }
}
