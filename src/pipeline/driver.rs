// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The pipeline driver: wires a source, an ordered list of stages, and a
//! sink together and runs them to completion (spec §4).

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::observability::messages::pipeline::{
    PipelineCompleted, PipelineStarted, SourceFailed, StageFailed,
};
use crate::observability::messages::StructuredLog;

use super::error::PipelineError;
use super::payload::Payload;
use super::stage::{StageParams, StageRunner};
use super::traits::{Sink, Source};

/// Channel capacity between adjacent stages. A capacity of 1 approximates
/// an unbuffered, synchronous handoff: a stage cannot race ahead of its
/// downstream neighbor by more than a single in-flight payload.
const STAGE_CHANNEL_CAPACITY: usize = 1;

/// A linear Source → Stage₀ → … → Stageₙ₋₁ → Sink pipeline over payload
/// type `P`.
///
/// A `Pipeline` is constructed once from its stage topology (spec §6:
/// `New(stages...) → Pipeline`) and can be run against any number of
/// source/sink pairs via [`Pipeline::process`] (spec §6: `Process(ctx,
/// source, sink) → error`).
pub struct Pipeline<P: Payload> {
    stages: Vec<Arc<dyn StageRunner<P>>>,
}

impl<P: Payload> Pipeline<P> {
    pub fn new(stages: Vec<Arc<dyn StageRunner<P>>>) -> Self {
        Self { stages }
    }

    /// Runs the pipeline to completion: `source` is drained, every stage
    /// processes until its predecessor's channel closes, and `sink`
    /// consumes every payload that reaches the end. Returns once the sink
    /// task exits, aggregating every error observed along the way.
    ///
    /// `cancel` lets a caller request early shutdown; cancellation is
    /// cooperative — in-flight work finishes its current payload before
    /// honoring it.
    pub async fn process(
        &self,
        cancel: CancellationToken,
        source: Arc<Mutex<dyn Source<P>>>,
        sink: Arc<Mutex<dyn Sink<P>>>,
    ) -> Result<(), PipelineError> {
        let stage_count = self.stages.len();
        PipelineStarted { stage_count }.log();

        // Size the error channel so every worker across every stage, plus
        // the source and sink, can always publish without blocking.
        let error_capacity = 2 + self
            .stages
            .iter()
            .map(|stage| stage.worker_count())
            .sum::<usize>();
        let (error_tx, mut error_rx) = mpsc::channel::<PipelineError>(error_capacity.max(1));

        let mut stage_senders: Vec<mpsc::Sender<P>> = Vec::with_capacity(stage_count + 1);
        let mut stage_receivers: Vec<Arc<Mutex<mpsc::Receiver<P>>>> =
            Vec::with_capacity(stage_count + 1);
        for _ in 0..=stage_count {
            let (tx, rx) = mpsc::channel::<P>(STAGE_CHANNEL_CAPACITY);
            stage_senders.push(tx);
            stage_receivers.push(Arc::new(Mutex::new(rx)));
        }

        let mut tasks: JoinSet<()> = JoinSet::new();

        // Source task: feeds stage_senders[0], then reports its terminal
        // error (if any) on the error channel.
        {
            let source = Arc::clone(&source);
            let output = stage_senders[0].clone();
            let error = error_tx.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let mut source = source.lock().await;
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if !source.next(&cancel).await {
                        break;
                    }
                    let mut payload = source.payload();
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => None,
                        permit = output.reserve() => permit.ok(),
                    };
                    match permit {
                        Some(permit) => permit.send(payload),
                        None => {
                            payload.mark_as_processed();
                            break;
                        }
                    }
                }
                if let Some(err) = source.error() {
                    SourceFailed { error: err.as_ref() }.log();
                    let _ = error.try_send(PipelineError::Source(err));
                }
            });
        }

        // Stage tasks.
        for (index, runner) in self.stages.iter().enumerate() {
            let runner = Arc::clone(runner);
            let params = StageParams::new(
                index,
                Arc::clone(&stage_receivers[index]),
                stage_senders[index + 1].clone(),
                error_tx.clone(),
            );
            let cancel = cancel.clone();
            tasks.spawn(async move { runner.run(cancel, params).await });
        }

        // Sink task: drains the final stage's output.
        {
            let sink = Arc::clone(&sink);
            let input = Arc::clone(&stage_receivers[stage_count]);
            let error = error_tx.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let mut sink = sink.lock().await;
                loop {
                    let payload = {
                        let mut input = input.lock().await;
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            received = input.recv() => received,
                        }
                    };
                    let Some(mut payload) = payload else {
                        break;
                    };
                    if let Err(source) = sink.consume(&cancel, &payload).await {
                        let _ = error.try_send(PipelineError::Sink(source));
                    }
                    payload.mark_as_processed();
                }
            });
        }

        // Drop every local sender handle: the stage tasks above hold the
        // only remaining clones, so each channel closes as soon as its
        // producing task exits — cascading shutdown end to end. Receivers
        // are kept so a cancelled run can drain and flush anything left
        // sitting in a channel's buffer below, instead of silently
        // dropping it.
        drop(stage_senders);
        drop(error_tx);

        while tasks.join_next().await.is_some() {}

        // Every task that could have consumed a channel's buffered payload
        // has now exited. Drain what's left — a payload that was fully
        // handed off into a channel but never received before its
        // consumer bailed on cancellation — so it still reaches
        // `mark_as_processed` exactly once.
        for receiver in &stage_receivers {
            let mut receiver = receiver.lock().await;
            while let Ok(mut payload) = receiver.try_recv() {
                payload.mark_as_processed();
            }
        }
        drop(stage_receivers);

        let mut errors = Vec::new();
        while let Ok(err) = error_rx.try_recv() {
            if let PipelineError::Stage { index, ref source } = err {
                StageFailed {
                    stage_index: index,
                    error: source.as_ref(),
                }
                .log();
            }
            errors.push(err);
        }

        PipelineCompleted {
            error_count: errors.len(),
        }
        .log();

        if cancel.is_cancelled() && errors.is_empty() {
            return Err(PipelineError::Cancelled);
        }

        match PipelineError::aggregate(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
