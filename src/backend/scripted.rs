//! In-memory backend with scripted replies for tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::models::*;
use super::{Backend, BackendError, Result};
use crate::queue::models::QuestionType;
use crate::retention::ForgettingCurveRecord;

#[derive(Default)]
pub struct ScriptedBackend {
    pub status: Mutex<PracticeStatus>,
    batches: Mutex<VecDeque<Result<QuestionBatch>>>,
    videos: Mutex<HashMap<String, Vec<VideoQuestionRecord>>>,
    outcomes: Mutex<VecDeque<Result<ReviewOutcome>>>,
    curves: Mutex<HashMap<i64, ForgettingCurveRecord>>,
    pub submissions: Mutex<Vec<ReviewSubmission>>,
    /// How long `submit_review` takes to answer
    pub submit_delay: Mutex<Duration>,
    pub question_calls: AtomicUsize,
    pub video_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, words: &[&str], has_more: bool) {
        let questions = words
            .iter()
            .map(|w| QuestionRecord {
                source: Some("scheduled".into()),
                ..QuestionRecord::new(*w, QuestionType::McWord)
            })
            .collect();
        self.batches.lock().unwrap().push_back(Ok(QuestionBatch {
            questions,
            has_more,
        }));
    }

    pub fn push_records(&self, questions: Vec<QuestionRecord>) {
        self.batches.lock().unwrap().push_back(Ok(QuestionBatch {
            questions,
            has_more: false,
        }));
    }

    pub fn push_batch_error(&self, message: &str) {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(BackendError::Unavailable(message.into())));
    }

    pub fn set_videos(&self, word: &str, ids: &[i64]) {
        let records = ids
            .iter()
            .map(|id| VideoQuestionRecord {
                video_id: *id,
                word: word.into(),
                video_url: format!("https://cdn.example.com/{}.mp4", id),
                question_type: None,
                question: serde_json::Value::Null,
            })
            .collect();
        self.videos.lock().unwrap().insert(word.into(), records);
    }

    pub fn push_outcome(&self, outcome: Result<ReviewOutcome>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn set_curve(&self, word_id: i64, record: ForgettingCurveRecord) {
        self.curves.lock().unwrap().insert(word_id, record);
    }

    pub fn question_calls(&self) -> usize {
        self.question_calls.load(Ordering::SeqCst)
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn get_practice_status(&self) -> Result<PracticeStatus> {
        Ok(self.status.lock().unwrap().clone())
    }

    async fn get_next_questions(
        &self,
        _learning_lang: &str,
        _native_lang: &str,
        limit: usize,
    ) -> Result<QuestionBatch> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(Ok(mut batch)) => {
                batch.questions.truncate(limit);
                Ok(batch)
            }
            Some(Err(e)) => Err(e),
            None => Ok(QuestionBatch::default()),
        }
    }

    async fn get_video_questions(
        &self,
        word: &str,
        limit: usize,
    ) -> Result<Vec<VideoQuestionRecord>> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self
            .videos
            .lock()
            .unwrap()
            .get(word)
            .cloned()
            .unwrap_or_default();
        records.truncate(limit);
        Ok(records)
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<ReviewOutcome> {
        self.submissions.lock().unwrap().push(submission.clone());
        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ReviewOutcome::default()))
    }

    async fn get_forgetting_curve(&self, word_id: i64) -> Result<ForgettingCurveRecord> {
        self.curves
            .lock()
            .unwrap()
            .get(&word_id)
            .cloned()
            .ok_or_else(|| BackendError::Server {
                status: 404,
                message: format!("word {} not found", word_id),
            })
    }
}
