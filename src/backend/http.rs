//! JSON-over-HTTP implementation of [`Backend`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::models::{
    PracticeStatus, QuestionBatch, ReviewOutcome, ReviewSubmission, VideoQuestionRecord,
};
use super::{Backend, BackendError, Result};
use crate::config::BackendConfig;
use crate::retention::ForgettingCurveRecord;

/// JSON-over-HTTP practice backend
pub struct HttpBackend {
    client: Client,
    base_url: String,
    user_id: Option<String>,
}

/// Submission body with the optional user id alongside
#[derive(Serialize)]
struct SubmitBody<'a> {
    #[serde(flatten)]
    submission: &'a ReviewSubmission,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        // Normalize URL - ensure no trailing slash
        let base_url = config.base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(BackendError::from_reqwest)?;

        Ok(Self {
            client,
            base_url,
            user_id: config.user_id.clone(),
        })
    }

    /// Build full URL for a path
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_user(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user_id {
            Some(user_id) => request.query(&[("user_id", user_id.as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(BackendError::from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        log::warn!("Backend responded {}: {}", status, message);
        Err(BackendError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.with_user(self.client.get(self.url(path)).query(query));
        let response = self.send(request).await?;
        response.json().await.map_err(BackendError::from_reqwest)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_practice_status(&self) -> Result<PracticeStatus> {
        self.get_json("practice/status", &[]).await
    }

    async fn get_next_questions(
        &self,
        learning_lang: &str,
        native_lang: &str,
        limit: usize,
    ) -> Result<QuestionBatch> {
        log::debug!("Fetching up to {} questions ({} -> {})", limit, learning_lang, native_lang);
        self.get_json(
            "review/next",
            &[
                ("learning_lang", learning_lang.to_string()),
                ("native_lang", native_lang.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn get_video_questions(
        &self,
        word: &str,
        limit: usize,
    ) -> Result<Vec<VideoQuestionRecord>> {
        self.get_json(
            "videos/questions",
            &[("word", word.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn submit_review(&self, submission: &ReviewSubmission) -> Result<ReviewOutcome> {
        let body = SubmitBody {
            submission,
            user_id: self.user_id.as_deref(),
        };
        let request = self.client.post(self.url("reviews/submit")).json(&body);
        let response = self.send(request).await?;
        response.json().await.map_err(BackendError::from_reqwest)
    }

    async fn get_forgetting_curve(&self, word_id: i64) -> Result<ForgettingCurveRecord> {
        self.get_json(&format!("words/{}/forgetting-curve", word_id), &[])
            .await
    }
}
