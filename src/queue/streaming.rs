//! Incremental ingestion of items that become ready one at a time
//!
//! Each pending source (typically a video download) resolves independently.
//! Ready items go to the priority lane in the order they become ready, not in
//! the order they were requested. Failed sources still count toward
//! completion so a stream can never stall.

use std::collections::HashMap;
use std::fmt;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use uuid::Uuid;

use super::models::ReviewItem;
use super::review_queue::ReviewQueue;
use crate::backend;

/// A source that will eventually yield a ready item
pub type PendingSource = BoxFuture<'static, backend::Result<ReviewItem>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Final tally of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub total: usize,
    pub ready: usize,
    pub failed: usize,
    /// Ready items that were already queued
    pub duplicates: usize,
}

type FirstReadyFn = Box<dyn FnOnce() + Send>;
type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;
type CompleteFn = Box<dyn FnOnce(StreamSummary) + Send>;

/// Notifications for one stream
#[derive(Default)]
pub struct StreamCallbacks {
    on_first_ready: Option<FirstReadyFn>,
    on_progress: Option<ProgressFn>,
    on_complete: Option<CompleteFn>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once, the first time any item becomes ready
    pub fn on_first_ready(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_first_ready = Some(Box::new(f));
        self
    }

    /// Called with `(ready, total)` after every item that becomes ready
    pub fn on_progress(mut self, f: impl FnMut(usize, usize) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called once when every source has either become ready or failed
    pub fn on_complete(mut self, f: impl FnOnce(StreamSummary) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

/// A source resolving, tagged with its stream
pub struct Readiness {
    pub stream: StreamId,
    /// Position of the source in the original request
    pub index: usize,
    pub result: backend::Result<ReviewItem>,
}

/// A started stream: its id and one task per source
pub struct StartedStream {
    pub id: StreamId,
    pub tasks: Vec<BoxFuture<'static, Readiness>>,
}

/// What a readiness event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    /// Item is now in the priority lane (or already was)
    Ready { ready: usize, total: usize },
    /// Source failed; counted toward completion
    Failed { failed: usize, total: usize },
    /// Stream unknown or cancelled
    Ignored,
}

struct ActiveStream {
    summary: StreamSummary,
    first_fired: bool,
    callbacks: StreamCallbacks,
}

#[derive(Default)]
pub struct StreamingIngestor {
    streams: HashMap<StreamId, ActiveStream>,
}

impl StreamingIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of pending sources.
    ///
    /// The returned tasks must be driven (spawned or polled) and each
    /// [`Readiness`] fed to [`on_ready`](Self::on_ready) on the queue owner's
    /// context. An empty batch completes immediately.
    pub fn ingest_stream(
        &mut self,
        sources: Vec<PendingSource>,
        mut callbacks: StreamCallbacks,
    ) -> StartedStream {
        let id = StreamId::new();
        let total = sources.len();

        if total == 0 {
            log::debug!("Stream {}: empty, completing immediately", id);
            if let Some(complete) = callbacks.on_complete.take() {
                complete(StreamSummary::default());
            }
            return StartedStream {
                id,
                tasks: Vec::new(),
            };
        }

        log::info!("Stream {}: preparing {} items", id, total);
        self.streams.insert(
            id,
            ActiveStream {
                summary: StreamSummary {
                    total,
                    ..StreamSummary::default()
                },
                first_fired: false,
                callbacks,
            },
        );

        let tasks = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                async move {
                    Readiness {
                        stream: id,
                        index,
                        result: source.await,
                    }
                }
                .boxed()
            })
            .collect();

        StartedStream { id, tasks }
    }

    /// Apply one readiness event
    pub fn on_ready(&mut self, queue: &mut ReviewQueue, readiness: Readiness) -> IngestStep {
        let Some(stream) = self.streams.get_mut(&readiness.stream) else {
            log::debug!(
                "Stream {}: ignoring item {} from inactive stream",
                readiness.stream,
                readiness.index
            );
            return IngestStep::Ignored;
        };

        let step = match readiness.result {
            Ok(item) => {
                if !queue.push_priority(item) {
                    stream.summary.duplicates += 1;
                }
                stream.summary.ready += 1;

                if !stream.first_fired {
                    stream.first_fired = true;
                    if let Some(first) = stream.callbacks.on_first_ready.take() {
                        first();
                    }
                }
                if let Some(progress) = stream.callbacks.on_progress.as_mut() {
                    progress(stream.summary.ready, stream.summary.total);
                }

                IngestStep::Ready {
                    ready: stream.summary.ready,
                    total: stream.summary.total,
                }
            }
            Err(e) => {
                log::warn!(
                    "Stream {}: item {} failed: {}",
                    readiness.stream,
                    readiness.index,
                    e
                );
                stream.summary.failed += 1;
                IngestStep::Failed {
                    failed: stream.summary.failed,
                    total: stream.summary.total,
                }
            }
        };

        let summary = stream.summary;
        if summary.ready + summary.failed >= summary.total {
            if let Some(mut finished) = self.streams.remove(&readiness.stream) {
                log::info!(
                    "Stream {}: complete, {} ready, {} failed",
                    readiness.stream,
                    summary.ready,
                    summary.failed
                );
                if let Some(complete) = finished.callbacks.on_complete.take() {
                    complete(summary);
                }
            }
        }

        step
    }

    /// Drop every active stream; their remaining events are ignored
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.streams.len();
        if cancelled > 0 {
            log::info!("Cancelling {} active stream(s)", cancelled);
        }
        self.streams.clear();
        cancelled
    }

    pub fn active_streams(&self) -> usize {
        self.streams.len()
    }

    /// `(ready, total)` of an active stream
    pub fn progress(&self, id: StreamId) -> Option<(usize, usize)> {
        self.streams
            .get(&id)
            .map(|s| (s.summary.ready, s.summary.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::queue::models::{ItemSource, QuestionType};
    use futures_util::stream::{FuturesUnordered, StreamExt};
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    fn video_item(id: i64) -> ReviewItem {
        ReviewItem::new("run", QuestionType::VideoMc, ItemSource::Search).with_video_id(id)
    }

    fn gated_sources(
        n: usize,
    ) -> (
        Vec<oneshot::Sender<backend::Result<ReviewItem>>>,
        Vec<PendingSource>,
    ) {
        let mut senders = Vec::new();
        let mut sources = Vec::new();
        for _ in 0..n {
            let (tx, rx) = oneshot::channel::<backend::Result<ReviewItem>>();
            senders.push(tx);
            sources.push(
                async move {
                    rx.await
                        .unwrap_or_else(|_| Err(BackendError::Unavailable("dropped".into())))
                }
                .boxed(),
            );
        }
        (senders, sources)
    }

    fn recording_callbacks(log: &Arc<Mutex<Vec<String>>>) -> StreamCallbacks {
        let first = Arc::clone(log);
        let progress = Arc::clone(log);
        let complete = Arc::clone(log);
        StreamCallbacks::new()
            .on_first_ready(move || first.lock().unwrap().push("first".into()))
            .on_progress(move |r, t| progress.lock().unwrap().push(format!("{}/{}", r, t)))
            .on_complete(move |s| {
                complete
                    .lock()
                    .unwrap()
                    .push(format!("complete {}+{}", s.ready, s.failed))
            })
    }

    #[tokio::test]
    async fn test_out_of_order_readiness() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ingestor = StreamingIngestor::new();
        let mut queue = ReviewQueue::new();

        let (mut senders, sources) = gated_sources(5);
        let started = ingestor.ingest_stream(sources, recording_callbacks(&log));
        let mut pending: FuturesUnordered<_> = started.tasks.into_iter().collect();

        // Third item becomes ready first
        senders.remove(2).send(Ok(video_item(3))).unwrap();
        let readiness = pending.next().await.unwrap();
        assert_eq!(readiness.index, 2);
        let step = ingestor.on_ready(&mut queue, readiness);

        assert_eq!(step, IngestStep::Ready { ready: 1, total: 5 });
        assert_eq!(queue.peek().unwrap().video_id, Some(3));
        assert_eq!(*log.lock().unwrap(), vec!["first", "1/5"]);

        for (tx, id) in senders.into_iter().zip([1, 2, 4, 5]) {
            tx.send(Ok(video_item(id))).unwrap();
        }
        while let Some(readiness) = pending.next().await {
            ingestor.on_ready(&mut queue, readiness);
        }

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "1/5", "2/5", "3/5", "4/5", "5/5", "complete 5+0"]
        );
        assert_eq!(queue.priority_len(), 5);
        assert_eq!(ingestor.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_failures_count_toward_completion() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ingestor = StreamingIngestor::new();
        let mut queue = ReviewQueue::new();

        let (senders, sources) = gated_sources(3);
        let started = ingestor.ingest_stream(sources, recording_callbacks(&log));
        let mut pending: FuturesUnordered<_> = started.tasks.into_iter().collect();

        let mut senders = senders.into_iter();
        senders
            .next()
            .unwrap()
            .send(Err(BackendError::Media("404".into())))
            .unwrap();
        senders.next().unwrap().send(Ok(video_item(2))).unwrap();
        drop(senders.next());

        let mut steps = Vec::new();
        while let Some(readiness) = pending.next().await {
            steps.push(ingestor.on_ready(&mut queue, readiness));
        }

        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps
                .iter()
                .filter(|s| matches!(s, IngestStep::Failed { .. }))
                .count(),
            2
        );
        let log = log.lock().unwrap();
        assert_eq!(log.first().map(String::as_str), Some("first"));
        assert_eq!(log.last().map(String::as_str), Some("complete 1+2"));
        assert_eq!(queue.count(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_never_fires_first_ready() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ingestor = StreamingIngestor::new();
        let mut queue = ReviewQueue::new();

        let (senders, sources) = gated_sources(2);
        let started = ingestor.ingest_stream(sources, recording_callbacks(&log));
        drop(senders);

        for task in started.tasks {
            let readiness = task.await;
            ingestor.on_ready(&mut queue, readiness);
        }

        assert_eq!(*log.lock().unwrap(), vec!["complete 0+2"]);
    }

    #[test]
    fn test_empty_stream_completes_immediately() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ingestor = StreamingIngestor::new();

        let started = ingestor.ingest_stream(Vec::new(), recording_callbacks(&log));

        assert!(started.tasks.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["complete 0+0"]);
        assert_eq!(ingestor.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_ready_but_not_requeued() {
        let mut ingestor = StreamingIngestor::new();
        let mut queue = ReviewQueue::new();
        queue.push_normal(video_item(1));

        let summary = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&summary);
        let sources: Vec<PendingSource> = vec![
            async { Ok::<_, BackendError>(video_item(1)) }.boxed(),
            async { Ok::<_, BackendError>(video_item(2)) }.boxed(),
        ];
        let started = ingestor.ingest_stream(
            sources,
            StreamCallbacks::new().on_complete(move |s| *sink.lock().unwrap() = Some(s)),
        );
        for task in started.tasks {
            let readiness = task.await;
            ingestor.on_ready(&mut queue, readiness);
        }

        let summary = summary.lock().unwrap().unwrap();
        assert_eq!(summary.ready, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(queue.count(), 2);
        assert_eq!(queue.priority_len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_stream_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ingestor = StreamingIngestor::new();
        let mut queue = ReviewQueue::new();

        let sources: Vec<PendingSource> =
            vec![async { Ok::<_, BackendError>(video_item(1)) }.boxed()];
        let started = ingestor.ingest_stream(sources, recording_callbacks(&log));
        assert_eq!(ingestor.progress(started.id), Some((0, 1)));

        assert_eq!(ingestor.cancel_all(), 1);
        for task in started.tasks {
            let readiness = task.await;
            assert_eq!(ingestor.on_ready(&mut queue, readiness), IngestStep::Ignored);
        }

        assert!(queue.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }
}
