//! Practice backend collaborator
//!
//! The review subsystem talks to the server only through the [`Backend`]
//! trait, so the session can be driven by the HTTP client in production and
//! by a scripted backend in tests. Media for video questions is prepared
//! through [`MediaPreparer`], which owns any on-device caching policy.

pub mod http;
pub mod models;

#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;
use thiserror::Error;

use crate::retention::ForgettingCurveRecord;

pub use http::HttpBackend;
pub use models::*;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Media preparation failed: {0}")]
    Media(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Wrap a reqwest error, separating out timeouts
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Server-side operations used by the review session
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_practice_status(&self) -> Result<PracticeStatus>;

    async fn get_next_questions(
        &self,
        learning_lang: &str,
        native_lang: &str,
        limit: usize,
    ) -> Result<QuestionBatch>;

    async fn get_video_questions(
        &self,
        word: &str,
        limit: usize,
    ) -> Result<Vec<VideoQuestionRecord>>;

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<ReviewOutcome>;

    async fn get_forgetting_curve(&self, word_id: i64) -> Result<ForgettingCurveRecord>;
}

/// Makes the media of a video question playable and returns its locator
#[async_trait]
pub trait MediaPreparer: Send + Sync {
    async fn prepare(&self, video: &VideoQuestionRecord) -> Result<String>;
}

/// Streams media straight from the remote URL without local caching
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteMediaPreparer;

#[async_trait]
impl MediaPreparer for RemoteMediaPreparer {
    async fn prepare(&self, video: &VideoQuestionRecord) -> Result<String> {
        if video.video_url.trim().is_empty() {
            return Err(BackendError::Media(format!(
                "video {} has no URL",
                video.video_id
            )));
        }
        Ok(video.video_url.clone())
    }
}
