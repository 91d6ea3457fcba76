// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sequential stage runner (spec §4.F "FIFO").

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{StageParams, StageRunner};
use crate::pipeline::error::PipelineError;
use crate::pipeline::payload::{Outcome, Payload, ProcessFailure};
use crate::pipeline::traits::Processor;

/// Processes incoming payloads one at a time, in arrival order. On error,
/// marks the failed payload processed, publishes once (non-blocking,
/// first-wins) and terminates — a stage that has errored has no contract to
/// process further inputs.
pub struct Fifo<P: Payload> {
    processor: Arc<dyn Processor<P>>,
}

impl<P: Payload> Fifo<P> {
    pub fn new(processor: Arc<dyn Processor<P>>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl<P: Payload> StageRunner<P> for Fifo<P> {
    async fn run(&self, cancel: CancellationToken, params: StageParams<P>) {
        loop {
            let payload_in = {
                let mut input = params.input().lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    received = input.recv() => received,
                }
            };
            let Some(payload_in) = payload_in else {
                return;
            };

            match self.processor.process(&cancel, payload_in).await {
                Ok(Outcome::Forward(mut payload_out)) => {
                    // `reserve` doesn't take ownership of the payload, so a
                    // cancellation that wins the race never drops it silently
                    // — the permit path sends synchronously once granted.
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => None,
                        permit = params.output().reserve() => permit.ok(),
                    };
                    match permit {
                        Some(permit) => permit.send(payload_out),
                        None => {
                            payload_out.mark_as_processed();
                            return;
                        }
                    }
                }
                Ok(Outcome::Drop(mut payload)) => {
                    payload.mark_as_processed();
                }
                Err(ProcessFailure { mut payload, source }) => {
                    payload.mark_as_processed();
                    let wrapped = PipelineError::Stage {
                        index: params.stage_index(),
                        source,
                    };
                    let _ = params.error().try_send(wrapped);
                    return;
                }
            }
        }
    }
}
