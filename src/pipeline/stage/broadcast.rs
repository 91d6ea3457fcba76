// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fan-out stage runner (spec §4.F "Broadcast").

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{ErrorSender, PayloadReceiver, PayloadSender, StageParams, StageRunner};
use crate::pipeline::error::PipelineError;
use crate::pipeline::payload::{Outcome, Payload, ProcessFailure};
use crate::pipeline::traits::Processor;

/// Runs `processors.len()` independent processors against every incoming
/// payload, each writing to its own output channel. Every processor sees
/// an independent clone of the payload — the last processor receives the
/// original, the rest receive `payload.clone()`. This sidesteps an
/// off-by-one in the reference implementation, where the fan-out loop
/// never terminated for more than one downstream consumer.
pub struct Broadcast<P: Payload> {
    processors: Vec<Arc<dyn Processor<P>>>,
}

impl<P: Payload> Broadcast<P> {
    /// An empty processor list is a construction-time error (spec §7).
    pub fn new(processors: Vec<Arc<dyn Processor<P>>>) -> Result<Self, PipelineError> {
        if processors.is_empty() {
            return Err(PipelineError::Config(
                "broadcast stage requires at least one processor".to_string(),
            ));
        }
        Ok(Self { processors })
    }
}

async fn run_one<P: Payload>(
    processor: Arc<dyn Processor<P>>,
    cancel: CancellationToken,
    payload_in: P,
    output: PayloadSender<P>,
    error: ErrorSender,
    stage_index: usize,
) {
    match processor.process(&cancel, payload_in).await {
        Ok(Outcome::Forward(mut payload_out)) => {
            let permit = tokio::select! {
                _ = cancel.cancelled() => None,
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
}

#[async_trait]
impl<P: Payload> StageRunner<P> for Broadcast<P> {
    async fn run(&self, cancel: CancellationToken, params: StageParams<P>) {
        let input: PayloadReceiver<P> = Arc::clone(params.input());
        loop {
            let payload_in = {
                let mut input = input.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    received = input.recv() => received,
                }
            };
            let Some(payload_in) = payload_in else {
                return;
            };

            let last = self.processors.len() - 1;
            let mut in_flight: JoinSet<()> = JoinSet::new();
            // Every processor but the last gets an independent clone; the
            // last consumes the original payload directly.
            for processor in &self.processors[..last] {
                let processor = Arc::clone(processor);
                let cancel = cancel.clone();
                let output = params.output().clone();
                let error = params.error().clone();
                let stage_index = params.stage_index();
                let payload = payload_in.clone();
                in_flight.spawn(async move {
                    run_one(processor, cancel, payload, output, error, stage_index).await
                });
            }
            {
                let processor = Arc::clone(&self.processors[last]);
                let stage_index = params.stage_index();
                in_flight.spawn(run_one(
                    processor,
                    cancel.clone(),
                    payload_in,
                    params.output().clone(),
                    params.error().clone(),
                    stage_index,
                ));
            }
            while in_flight.join_next().await.is_some() {}
        }
    }

    fn worker_count(&self) -> usize {
        self.processors.len()
    }
}
