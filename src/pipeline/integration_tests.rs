// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Integration tests exercising a full `Source → Stage → Sink` run, the way
//! crawler code would assemble one.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex as AsyncMutex;
    use tokio_util::sync::CancellationToken;

    use crate::pipeline::error::{PipelineError, ProcessError, SharedError};
    use crate::pipeline::payload::{Outcome, Payload, ProcessFailure};
    use crate::pipeline::stage::{Broadcast, ElasticPool, Fifo, FixedPool, StageRunner};
    use crate::pipeline::traits::{Processor, Sink, Source};
    use crate::pipeline::Pipeline;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Item {
        id: u32,
        processed: bool,
        /// Shared log every instance's `mark_as_processed` reports to, so a
        /// test can assert that a payload handed to a stage reached its
        /// end-of-life hook exactly once, even when the instance itself
        /// never makes it back out of a cancelled pipeline.
        marked: Option<Arc<StdMutex<Vec<u32>>>>,
    }

    impl Payload for Item {
        fn mark_as_processed(&mut self) {
            self.processed = true;
            if let Some(log) = &self.marked {
                log.lock().unwrap().push(self.id);
            }
        }
    }

    struct VecSource {
        items: std::vec::IntoIter<Item>,
        current: Option<Item>,
        error: Option<SharedError>,
        taken: Option<Arc<AtomicUsize>>,
    }

    impl VecSource {
        fn new(ids: impl IntoIterator<Item = u32>) -> Self {
            Self::with_marked_log(ids, None, None)
        }

        fn with_marked_log(
            ids: impl IntoIterator<Item = u32>,
            marked: Option<Arc<StdMutex<Vec<u32>>>>,
            taken: Option<Arc<AtomicUsize>>,
        ) -> Self {
            Self {
                items: ids
                    .into_iter()
                    .map(|id| Item {
                        id,
                        processed: false,
                        marked: marked.clone(),
                    })
                    .collect::<Vec<_>>()
                    .into_iter(),
                current: None,
                error: None,
                taken,
            }
        }
    }

    #[async_trait]
    impl Source<Item> for VecSource {
        async fn next(&mut self, _cancel: &CancellationToken) -> bool {
            self.current = self.items.next();
            self.current.is_some()
        }

        fn payload(&mut self) -> Item {
            let item = self.current.take().expect("next() must be true before payload()");
            if let Some(taken) = &self.taken {
                taken.fetch_add(1, Ordering::SeqCst);
            }
            item
        }

        fn error(&self) -> Option<SharedError> {
            self.error.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        seen: StdMutex<Vec<u32>>,
    }

    #[async_trait]
    impl Sink<Item> for RecordingSink {
        async fn consume(&mut self, _cancel: &CancellationToken, payload: &Item) -> Result<(), ProcessError> {
            self.seen.lock().unwrap().push(payload.id);
            Ok(())
        }
    }

    struct Identity;

    #[async_trait]
    impl Processor<Item> for Identity {
        async fn process(&self, _cancel: &CancellationToken, payload: Item) -> Result<Outcome<Item>, ProcessFailure<Item>> {
            Ok(Outcome::Forward(payload))
        }
    }

    struct DropEven;

    #[async_trait]
    impl Processor<Item> for DropEven {
        async fn process(&self, _cancel: &CancellationToken, payload: Item) -> Result<Outcome<Item>, ProcessFailure<Item>> {
            if payload.id % 2 == 0 {
                Ok(Outcome::Drop(payload))
            } else {
                Ok(Outcome::Forward(payload))
            }
        }
    }

    /// A processor that always fails on a chosen id, handing the payload
    /// back inside the error so the runner can still mark it processed.
    struct FailOn(u32);

    #[async_trait]
    impl Processor<Item> for FailOn {
        async fn process(&self, _cancel: &CancellationToken, payload: Item) -> Result<Outcome<Item>, ProcessFailure<Item>> {
            if payload.id == self.0 {
                Err(ProcessFailure {
                    payload,
                    source: "boom".into(),
                })
            } else {
                Ok(Outcome::Forward(payload))
            }
        }
    }

    #[tokio::test]
    async fn single_fifo_stage_matches_direct_application() {
        let source = Arc::new(AsyncMutex::new(VecSource::new(1..=5)));
        let sink = Arc::new(AsyncMutex::new(RecordingSink::default()));
        let stages: Vec<Arc<dyn StageRunner<Item>>> = vec![Arc::new(Fifo::new(Arc::new(Identity)))];
        let pipeline = Pipeline::new(stages);

        pipeline
            .process(CancellationToken::new(), Arc::clone(&source), Arc::clone(&sink))
            .await
            .unwrap();

        assert_eq!(sink.lock().await.seen.lock().unwrap().clone(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn dropped_payloads_still_reach_sink_count_correctly() {
        let source = Arc::new(AsyncMutex::new(VecSource::new(1..=6)));
        let sink = Arc::new(AsyncMutex::new(RecordingSink::default()));
        let stages: Vec<Arc<dyn StageRunner<Item>>> = vec![Arc::new(Fifo::new(Arc::new(DropEven)))];
        let pipeline = Pipeline::new(stages);

        pipeline
            .process(CancellationToken::new(), Arc::clone(&source), Arc::clone(&sink))
            .await
            .unwrap();

        let mut seen = sink.lock().await.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn fixed_pool_with_one_worker_matches_fifo() {
        let source = Arc::new(AsyncMutex::new(VecSource::new(1..=10)));
        let sink = Arc::new(AsyncMutex::new(RecordingSink::default()));
        let stages: Vec<Arc<dyn StageRunner<Item>>> =
            vec![Arc::new(FixedPool::new(Arc::new(Identity), 1).unwrap())];
        let pipeline = Pipeline::new(stages);

        pipeline
            .process(CancellationToken::new(), Arc::clone(&source), Arc::clone(&sink))
            .await
            .unwrap();

        assert_eq!(sink.lock().await.seen.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn broadcast_fans_every_payload_out_to_every_processor() {
        let source = Arc::new(AsyncMutex::new(VecSource::new([1, 2, 3])));
        let sink = Arc::new(AsyncMutex::new(RecordingSink::default()));
        let stages: Vec<Arc<dyn StageRunner<Item>>> = vec![Arc::new(
            Broadcast::new(vec![Arc::new(Identity), Arc::new(Identity)]).unwrap(),
        )];
        let pipeline = Pipeline::new(stages);

        pipeline
            .process(CancellationToken::new(), Arc::clone(&source), Arc::clone(&sink))
            .await
            .unwrap();

        let mut seen = sink.lock().await.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 1, 2, 2, 3, 3]);
    }

    #[tokio::test]
    async fn broadcast_requires_at_least_one_processor() {
        let err = Broadcast::<Item>::new(vec![]).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    /// A processor failure still reaches `mark_as_processed` exactly once
    /// (spec §8) — the error branch is not exempt from the payload's
    /// end-of-life hook, only from forwarding.
    #[tokio::test]
    async fn fifo_stage_error_still_marks_the_failed_payload_processed() {
        let marked = Arc::new(StdMutex::new(Vec::new()));
        let source = Arc::new(AsyncMutex::new(VecSource::with_marked_log(
            1..=3,
            Some(Arc::clone(&marked)),
            None,
        )));
        let sink = Arc::new(AsyncMutex::new(RecordingSink::default()));
        let stages: Vec<Arc<dyn StageRunner<Item>>> = vec![Arc::new(Fifo::new(Arc::new(FailOn(2))))];
        let pipeline = Pipeline::new(stages);

        let err = pipeline
            .process(CancellationToken::new(), Arc::clone(&source), Arc::clone(&sink))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stage { index: 0, .. }));

        // item 1 reached the sink (and was marked there); item 2 failed in
        // the stage and must still have been marked, even though the
        // terminated stage never forwards it.
        assert_eq!(sink.lock().await.seen.lock().unwrap().clone(), vec![1]);
        assert!(marked.lock().unwrap().contains(&2));
    }

    #[tokio::test]
    async fn elastic_pool_cancellation_marks_every_in_flight_payload_processed() {
        let processed = Arc::new(AtomicUsize::new(0));
        struct CountingSlow {
            delay: Duration,
            processed: Arc<AtomicUsize>,
        }
        #[async_trait]
        impl Processor<Item> for CountingSlow {
            async fn process(
                &self,
                cancel: &CancellationToken,
                payload: Item,
            ) -> Result<Outcome<Item>, ProcessFailure<Item>> {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.delay) => {}
                }
                self.processed.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::Forward(payload))
            }
        }

        let marked = Arc::new(StdMutex::new(Vec::new()));
        let taken = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(AsyncMutex::new(VecSource::with_marked_log(
            1..=100,
            Some(Arc::clone(&marked)),
            Some(Arc::clone(&taken)),
        )));
        let sink = Arc::new(AsyncMutex::new(RecordingSink::default()));
        let processor = Arc::new(CountingSlow {
            delay: Duration::from_millis(100),
            processed: Arc::clone(&processed),
        });
        let stages: Vec<Arc<dyn StageRunner<Item>>> = vec![Arc::new(ElasticPool::new(processor, 4).unwrap())];
        let pipeline = Pipeline::new(stages);

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_millis(300),
            pipeline.process(cancel, Arc::clone(&source), Arc::clone(&sink)),
        )
        .await;
        assert!(result.is_ok(), "process() must return promptly after cancellation");
        assert!(matches!(result.unwrap(), Err(PipelineError::Cancelled)));

        // Every payload the source ever handed to the pipeline must have
        // reached `mark_as_processed` exactly once — whether it made it to
        // the sink or was abandoned mid-flight by the cancellation.
        let marked_ids = marked.lock().unwrap();
        let taken_count = taken.load(Ordering::SeqCst);
        assert_eq!(
            marked_ids.len(),
            taken_count,
            "every payload taken from the source must be marked processed exactly once, no leaks"
        );
        let mut unique: Vec<u32> = marked_ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), marked_ids.len(), "no payload was marked processed more than once");
    }
}
