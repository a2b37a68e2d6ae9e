//! Practice session controller
//!
//! Owns the queue and every component that mutates it. Fetches, media
//! preparation, submissions and reveal timers run as spawned tasks whose
//! results come back over a channel; [`SessionController::pump`] applies them
//! on the controller's own context, so the queue is never shared.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::notice::{Notice, NoticeBoard, NoticeKind};
use super::state::{ActiveQuestion, Feedback, QuestionPhase, SubmissionStatus};
use super::{Result, SessionError};
use crate::backend::{
    self, Backend, BackendError, BadgeInfo, MediaPreparer, PracticeStatus, ReviewOutcome,
    ReviewSubmission, VideoQuestionRecord,
};
use crate::config::ReviewConfig;
use crate::queue::{
    IdentityKey, IngestStep, PendingSource, QueueRefillController, QueueState, Readiness,
    RefillOutcome, RefillResponse, ReviewItem, ReviewQueue, StreamCallbacks, StreamId,
    StreamSummary, StreamingIngestor,
};
use crate::retention::ForgettingCurve;

const EVENT_CAPACITY: usize = 64;

/// Changes observers may want to render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    QuestionPresented { instance: u64, key: IdentityKey },
    AwaitingQuestion,
    Feedback(Feedback),
    SubmissionSent { instance: u64 },
    SubmissionSettled { instance: u64, status: SubmissionStatus },
    QuestionRemoved { instance: u64 },
    ScoreChanged { score: i64, delta: i64 },
    BadgeEarned(BadgeInfo),
    StatusUpdated(PracticeStatus),
    QueueChanged { count: usize, is_fetching: bool, has_more: bool },
    VideosFirstReady { word: String },
    VideosProgress { word: String, ready: usize, total: usize },
    VideosComplete { word: String, ready: usize, failed: usize },
    Notice(Notice),
}

/// Everything a view needs to draw the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub queue: QueueState,
    pub phase: QuestionPhase,
    pub active: Option<ActiveQuestion>,
    pub score: i64,
    pub status: PracticeStatus,
    pub active_streams: usize,
}

/// Results delivered back to the controller
enum Completion {
    Status(backend::Result<PracticeStatus>),
    Refill(RefillResponse),
    VideoQuestions {
        generation: u64,
        word: String,
        result: backend::Result<Vec<VideoQuestionRecord>>,
    },
    SourceReady(Readiness),
    /// Sent by a stream's completion callback, not by a spawned task
    StreamFinished { word: String, summary: StreamSummary },
    RevealElapsed { instance: u64 },
    Submission {
        instance: u64,
        key: IdentityKey,
        result: backend::Result<ReviewOutcome>,
    },
    /// A spawned task panicked before producing its result
    TaskPanicked,
}

impl Completion {
    fn from_task(&self) -> bool {
        !matches!(self, Self::StreamFinished { .. })
    }
}

pub struct SessionController {
    backend: Arc<dyn Backend>,
    media: Arc<dyn MediaPreparer>,
    config: ReviewConfig,
    queue: ReviewQueue,
    refill: QueueRefillController,
    ingestor: StreamingIngestor,
    notices: NoticeBoard,
    events: broadcast::Sender<SessionEvent>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    /// Spawned tasks whose result has not been applied yet
    in_flight: usize,
    active: Option<ActiveQuestion>,
    next_instance: u64,
    status: PracticeStatus,
    score: i64,
    celebration: Option<BadgeInfo>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn Backend>,
        media: Arc<dyn MediaPreparer>,
        config: ReviewConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            refill: QueueRefillController::new(Arc::clone(&backend), &config),
            notices: NoticeBoard::new(config.notice_ttl()),
            backend,
            media,
            config,
            queue: ReviewQueue::new(),
            ingestor: StreamingIngestor::new(),
            events,
            tx,
            rx,
            in_flight: 0,
            active: None,
            next_instance: 0,
            status: PracticeStatus::default(),
            score: 0,
            celebration: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            queue: self.queue.snapshot(self.refill.is_fetching()),
            phase: self.phase(),
            active: self.active.clone(),
            score: self.score,
            status: self.status.clone(),
            active_streams: self.ingestor.active_streams(),
        }
    }

    pub fn current(&self) -> Option<&ActiveQuestion> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> QuestionPhase {
        self.active
            .as_ref()
            .map_or(QuestionPhase::AwaitingQuestion, |a| a.phase)
    }

    pub fn queue(&self) -> &ReviewQueue {
        &self.queue
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn status(&self) -> &PracticeStatus {
        &self.status
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Load the status counters and fill the queue
    pub fn start(&mut self) {
        self.refresh_status();
        self.refill_if_needed();
    }

    pub fn refresh_status(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.spawn(async move { Completion::Status(backend.get_practice_status().await) });
    }

    /// Fetch more questions if the queue is at or below the low-water mark
    pub fn refill_if_needed(&mut self) -> bool {
        match self.refill.refill_if_needed(&self.queue) {
            Some(request) => {
                self.spawn(request.run().map(Completion::Refill));
                self.emit_queue_changed();
                true
            }
            None => false,
        }
    }

    /// Discard the queue, active streams and the current question, then refetch.
    ///
    /// Results of anything issued before the refresh are ignored when they
    /// arrive. Score changes from submissions already sent still apply.
    pub fn force_refresh(&mut self) {
        self.ingestor.cancel_all();
        if let Some(active) = self.active.take() {
            log::info!("Session: dropping question {} on refresh", active.key);
            self.emit(SessionEvent::QuestionRemoved {
                instance: active.instance,
            });
        }

        let request = self.refill.force_refresh(&mut self.queue);
        self.spawn(request.run().map(Completion::Refill));
        self.emit_queue_changed();
        self.emit(SessionEvent::AwaitingQuestion);
    }

    /// Switch language pair; refreshes the queue when it changes
    pub fn set_languages(&mut self, learning_lang: &str, native_lang: &str) {
        if self.refill.languages() == (learning_lang, native_lang) {
            return;
        }
        log::info!("Session: languages now {}/{}", learning_lang, native_lang);
        self.config.learning_lang = learning_lang.to_string();
        self.config.native_lang = native_lang.to_string();
        self.refill.set_languages(learning_lang, native_lang);
        self.force_refresh();
    }

    /// Start ingesting items that become ready over time into the priority lane
    pub fn ingest_stream(
        &mut self,
        sources: Vec<PendingSource>,
        callbacks: StreamCallbacks,
    ) -> StreamId {
        let started = self.ingestor.ingest_stream(sources, callbacks);
        for task in started.tasks {
            self.spawn(task.map(Completion::SourceReady));
        }
        started.id
    }

    /// Fetch video questions for a word and stream them in as their media is prepared
    pub fn prepare_video_questions(&mut self, word: &str) {
        let backend = Arc::clone(&self.backend);
        let generation = self.refill.generation();
        let limit = self.config.video_question_limit;
        let word = word.to_string();

        log::info!("Session: requesting up to {} video questions for {}", limit, word);
        self.spawn(async move {
            let result = backend.get_video_questions(&word, limit).await;
            Completion::VideoQuestions {
                generation,
                word,
                result,
            }
        });
    }

    fn start_video_stream(&mut self, word: String, records: Vec<VideoQuestionRecord>) -> StreamId {
        let sources: Vec<PendingSource> = records
            .into_iter()
            .map(|record| {
                let media = Arc::clone(&self.media);
                async move {
                    let locator = media.prepare(&record).await?;
                    record
                        .into_item(locator)
                        .map_err(|e| BackendError::Media(e.to_string()))
                }
                .boxed()
            })
            .collect();

        let first_events = self.events.clone();
        let first_word = word.clone();
        let progress_events = self.events.clone();
        let progress_word = word.clone();
        let tx = self.tx.clone();

        let callbacks = StreamCallbacks::new()
            .on_first_ready(move || {
                let _ = first_events.send(SessionEvent::VideosFirstReady { word: first_word });
            })
            .on_progress(move |ready, total| {
                let _ = progress_events.send(SessionEvent::VideosProgress {
                    word: progress_word.clone(),
                    ready,
                    total,
                });
            })
            .on_complete(move |summary| {
                let _ = tx.send(Completion::StreamFinished { word, summary });
            });

        self.ingest_stream(sources, callbacks)
    }

    /// Present the queue head if nothing is being shown
    pub fn present_next(&mut self) -> Option<&ActiveQuestion> {
        self.present_if_idle();
        self.active.as_ref()
    }

    fn present_if_idle(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(item) = self.queue.peek().cloned() else {
            return false;
        };

        self.next_instance += 1;
        let active = ActiveQuestion::new(self.next_instance, item, Utc::now());
        log::info!(
            "Session: presenting {} (instance {})",
            active.key,
            active.instance
        );
        self.emit(SessionEvent::QuestionPresented {
            instance: active.instance,
            key: active.key.clone(),
        });
        self.active = Some(active);
        true
    }

    /// Record the learner's answer.
    ///
    /// Feedback is returned at once; the submission goes out after the reveal
    /// delay for the question type.
    pub fn answer(&mut self, correct: bool) -> Result<Feedback> {
        let active = self.active.as_mut().ok_or(SessionError::NoActiveQuestion)?;
        active.phase = active.phase.answer(correct)?;

        let instance = active.instance;
        let feedback = Feedback {
            instance,
            word: active.item.word.clone(),
            correct,
        };
        let delay = self.config.reveal_delays.for_type(active.item.question_type);

        self.emit(SessionEvent::Feedback(feedback.clone()));
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            Completion::RevealElapsed { instance }
        });
        Ok(feedback)
    }

    /// Move past a submitted question, whether or not the submission succeeded
    pub fn advance(&mut self) -> Result<Option<&ActiveQuestion>> {
        let finished = self.active.take().ok_or(SessionError::NoActiveQuestion)?;
        if let Err(e) = finished.phase.remove() {
            self.active = Some(finished);
            return Err(e);
        }

        // A successful submission already released the queue entry, and the
        // key may since belong to a fresh instance of the same word
        let still_queued = !matches!(
            finished.phase,
            QuestionPhase::SubmittedPendingAdvance {
                status: SubmissionStatus::Succeeded,
                ..
            }
        );
        if still_queued {
            self.queue.remove(&finished.key);
        }
        log::debug!("Session: removed {} (instance {})", finished.key, finished.instance);
        self.emit(SessionEvent::QuestionRemoved {
            instance: finished.instance,
        });

        self.refill_if_needed();
        if !self.present_if_idle() {
            self.emit(SessionEvent::AwaitingQuestion);
        }
        self.emit_queue_changed();
        Ok(self.active.as_ref())
    }

    /// Fetch and parse the stored curve for a saved word
    pub async fn forgetting_curve(&mut self, word_id: i64) -> backend::Result<ForgettingCurve> {
        match self.backend.get_forgetting_curve(word_id).await {
            Ok(record) => {
                let curve = ForgettingCurve::from_record(&record);
                if curve.dropped > 0 {
                    log::warn!(
                        "Session: dropped {} malformed curve entries for word {}",
                        curve.dropped,
                        word_id
                    );
                }
                Ok(curve)
            }
            Err(e) => {
                self.raise(
                    NoticeKind::CurveFailed,
                    format!("Could not load the forgetting curve: {}", e),
                );
                Err(e)
            }
        }
    }

    /// Local curve for an item, from its own history
    pub fn estimate_curve(&self, item: &ReviewItem) -> Option<ForgettingCurve> {
        let created = item
            .learned_at
            .or_else(|| item.history.first().map(|e| e.reviewed_at))?;
        Some(ForgettingCurve::estimate(
            &item.history,
            created,
            self.config.curve_sample_count,
        ))
    }

    /// The most recent badge, once
    pub fn take_celebration(&mut self) -> Option<BadgeInfo> {
        self.celebration.take()
    }

    pub fn notices(&mut self) -> Vec<Notice> {
        self.notices.active(Utc::now()).to_vec()
    }

    pub fn dismiss_notice(&mut self, id: Uuid) -> bool {
        self.notices.dismiss(id)
    }

    /// Apply the next task result, waiting for one if needed.
    ///
    /// Returns `false` once nothing is outstanding.
    pub async fn pump(&mut self) -> bool {
        if let Ok(completion) = self.rx.try_recv() {
            self.handle(completion);
            return true;
        }
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(completion) => {
                self.handle(completion);
                true
            }
            None => false,
        }
    }

    /// Apply results that have already arrived without waiting
    pub fn pump_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.handle(completion);
            applied += 1;
        }
        applied
    }

    /// Pump until every outstanding task has reported back
    pub async fn run_until_idle(&mut self) {
        while self.pump().await {}
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .unwrap_or(Completion::TaskPanicked);
            // The receiver lives as long as the controller
            let _ = tx.send(completion);
        });
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn emit_queue_changed(&self) {
        self.emit(SessionEvent::QueueChanged {
            count: self.queue.count(),
            is_fetching: self.refill.is_fetching(),
            has_more: self.queue.has_more(),
        });
    }

    fn raise(&mut self, kind: NoticeKind, message: String) {
        let notice = self.notices.raise(kind, message, Utc::now());
        self.emit(SessionEvent::Notice(notice));
    }

    fn handle(&mut self, completion: Completion) {
        if completion.from_task() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match completion {
            Completion::Status(result) => self.on_status(result),
            Completion::Refill(response) => self.on_refill(response),
            Completion::VideoQuestions {
                generation,
                word,
                result,
            } => self.on_video_questions(generation, word, result),
            Completion::SourceReady(readiness) => self.on_source_ready(readiness),
            Completion::StreamFinished { word, summary } => self.on_stream_finished(word, summary),
            Completion::RevealElapsed { instance } => self.on_reveal_elapsed(instance),
            Completion::Submission {
                instance,
                key,
                result,
            } => self.on_submission(instance, key, result),
            Completion::TaskPanicked => log::error!("Session: background task panicked"),
        }
    }

    fn on_status(&mut self, result: backend::Result<PracticeStatus>) {
        match result {
            Ok(status) => {
                log::debug!(
                    "Session: status new={} practice={} due_soon={}",
                    status.new_count,
                    status.practice_count,
                    status.due_soon_count
                );
                self.score = status.score;
                self.status = status.clone();
                self.emit(SessionEvent::StatusUpdated(status));
            }
            Err(e) => self.raise(
                NoticeKind::StatusFailed,
                format!("Could not load practice status: {}", e),
            ),
        }
    }

    fn on_refill(&mut self, response: RefillResponse) {
        match self.refill.complete(&mut self.queue, response) {
            Ok(RefillOutcome::Applied { .. }) => {
                self.emit_queue_changed();
                self.present_if_idle();
            }
            Ok(RefillOutcome::Stale) => {}
            Err(e) => {
                self.emit_queue_changed();
                self.raise(
                    NoticeKind::RefillFailed,
                    format!("Could not load more questions: {}", e),
                );
            }
        }
    }

    fn on_video_questions(
        &mut self,
        generation: u64,
        word: String,
        result: backend::Result<Vec<VideoQuestionRecord>>,
    ) {
        if generation != self.refill.generation() {
            log::info!("Session: discarding video questions for {} from before refresh", word);
            return;
        }

        match result {
            Ok(records) => {
                log::info!("Session: {} video question(s) for {}", records.len(), word);
                self.start_video_stream(word, records);
            }
            Err(e) => {
                self.raise(
                    NoticeKind::VideoPreparationFailed,
                    format!("Could not load videos for {}: {}", word, e),
                );
                self.emit(SessionEvent::VideosComplete {
                    word,
                    ready: 0,
                    failed: 0,
                });
            }
        }
    }

    fn on_source_ready(&mut self, readiness: Readiness) {
        match self.ingestor.on_ready(&mut self.queue, readiness) {
            IngestStep::Ready { .. } => {
                self.emit_queue_changed();
                self.present_if_idle();
            }
            IngestStep::Failed { .. } | IngestStep::Ignored => {}
        }
    }

    fn on_stream_finished(&mut self, word: String, summary: StreamSummary) {
        if summary.total > 0 && summary.ready == 0 {
            self.raise(
                NoticeKind::VideoPreparationFailed,
                format!("None of the {} videos for {} could be prepared", summary.total, word),
            );
        }
        self.emit(SessionEvent::VideosComplete {
            word,
            ready: summary.ready,
            failed: summary.failed,
        });
    }

    fn on_reveal_elapsed(&mut self, instance: u64) {
        let (learning_lang, native_lang) = self.refill.languages();
        let (learning_lang, native_lang) = (learning_lang.to_string(), native_lang.to_string());

        let Some(active) = self.active.as_mut().filter(|a| a.instance == instance) else {
            log::debug!("Session: reveal for instance {} no longer shown", instance);
            return;
        };
        let phase = match active.phase.submit() {
            Ok(phase) => phase,
            Err(e) => {
                log::warn!("Session: instance {}: {}", instance, e);
                return;
            }
        };
        active.phase = phase;

        let correct = matches!(phase, QuestionPhase::SubmittedPendingAdvance { correct: true, .. });
        let submission = ReviewSubmission {
            word: active.item.word.clone(),
            learning_lang,
            native_lang,
            correct,
            question_type: active.item.question_type,
        };
        let key = active.key.clone();
        let backend = Arc::clone(&self.backend);

        log::info!("Session: submitting {} (correct: {})", key, correct);
        self.emit(SessionEvent::SubmissionSent { instance });
        self.spawn(async move {
            let result = backend.submit_review(&submission).await;
            Completion::Submission {
                instance,
                key,
                result,
            }
        });
    }

    fn on_submission(
        &mut self,
        instance: u64,
        key: IdentityKey,
        result: backend::Result<ReviewOutcome>,
    ) {
        let still_shown = self.active.as_ref().is_some_and(|a| {
            a.instance == instance
                && matches!(
                    a.phase,
                    QuestionPhase::SubmittedPendingAdvance {
                        status: SubmissionStatus::Pending,
                        ..
                    }
                )
        });

        let status = match result {
            Ok(outcome) => {
                self.apply_outcome(outcome);
                // Once advanced or refreshed away, the queue no longer holds this instance
                if still_shown && self.queue.remove(&key).is_some() {
                    self.emit_queue_changed();
                }
                self.refill_if_needed();
                SubmissionStatus::Succeeded
            }
            Err(e) => {
                self.raise(
                    NoticeKind::SubmissionFailed,
                    format!("Could not save your answer for {}: {}", key.word, e),
                );
                SubmissionStatus::Failed
            }
        };

        let auto_advance = match self.active.as_mut() {
            Some(active) if active.instance == instance => match active.phase.settle(status) {
                Ok(phase) => {
                    active.phase = phase;
                    active.item.question_type.auto_advances()
                }
                Err(e) => {
                    log::warn!("Session: instance {}: {}", instance, e);
                    return;
                }
            },
            _ => return,
        };

        self.emit(SessionEvent::SubmissionSettled { instance, status });
        if auto_advance {
            if let Err(e) = self.advance() {
                log::warn!("Session: auto-advance failed: {}", e);
            }
        }
    }

    fn apply_outcome(&mut self, outcome: ReviewOutcome) {
        if outcome.score_delta != 0 {
            self.score += outcome.score_delta;
            self.emit(SessionEvent::ScoreChanged {
                score: self.score,
                delta: outcome.score_delta,
            });
        }
        if let Some(badge) = outcome.new_badge {
            log::info!("Session: badge earned: {}", badge.name);
            self.celebration = Some(badge.clone());
            self.emit(SessionEvent::BadgeEarned(badge));
        }
    }
}
