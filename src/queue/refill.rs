//! Queue refill with single-flight fetches and stale-result rejection
//!
//! The controller never touches the network itself. It hands out a
//! [`RefillRequest`] carrying the generation it was issued under; whoever
//! drives the request feeds the [`RefillResponse`] back through
//! [`QueueRefillController::complete`] on the queue owner's context. A
//! response whose generation is older than the controller's is discarded.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::review_queue::ReviewQueue;
use crate::backend::{self, Backend, BackendError, QuestionBatch};
use crate::config::ReviewConfig;

/// A fetch issued by the controller, not yet awaited
pub struct RefillRequest {
    pub generation: u64,
    /// Issued by `force_refresh`
    pub forced: bool,
    fetch: BoxFuture<'static, backend::Result<QuestionBatch>>,
}

impl RefillRequest {
    /// Perform the fetch
    pub async fn run(self) -> RefillResponse {
        RefillResponse {
            generation: self.generation,
            result: self.fetch.await,
        }
    }
}

impl std::fmt::Debug for RefillRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefillRequest")
            .field("generation", &self.generation)
            .field("forced", &self.forced)
            .finish_non_exhaustive()
    }
}

/// Result of a fetch, tagged with the generation it was issued under
#[derive(Debug)]
pub struct RefillResponse {
    pub generation: u64,
    pub result: backend::Result<QuestionBatch>,
}

/// What applying a response did to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    Applied {
        added: usize,
        duplicates: usize,
        /// Records rejected as unparseable
        dropped: usize,
    },
    /// Issued before the latest `force_refresh`; ignored
    Stale,
}

pub struct QueueRefillController {
    backend: Arc<dyn Backend>,
    learning_lang: String,
    native_lang: String,
    batch_size: usize,
    low_water_mark: usize,
    is_fetching: bool,
    generation: u64,
}

impl QueueRefillController {
    pub fn new(backend: Arc<dyn Backend>, config: &ReviewConfig) -> Self {
        Self {
            backend,
            learning_lang: config.learning_lang.clone(),
            native_lang: config.native_lang.clone(),
            batch_size: config.batch_size,
            low_water_mark: config.low_water_mark,
            is_fetching: false,
            generation: 0,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn languages(&self) -> (&str, &str) {
        (&self.learning_lang, &self.native_lang)
    }

    /// Change the language pair used by later fetches.
    ///
    /// Queued items keep the old pair; follow with `force_refresh` to replace them.
    pub fn set_languages(&mut self, learning_lang: &str, native_lang: &str) {
        self.learning_lang = learning_lang.to_string();
        self.native_lang = native_lang.to_string();
    }

    pub fn needs_refill(&self, queue: &ReviewQueue) -> bool {
        queue.count() <= self.low_water_mark
    }

    /// Issue a fetch if the queue is low and nothing is in flight
    pub fn refill_if_needed(&mut self, queue: &ReviewQueue) -> Option<RefillRequest> {
        if self.is_fetching {
            log::debug!("Refill: fetch already in flight, skipping");
            return None;
        }
        if !self.needs_refill(queue) {
            return None;
        }

        log::info!(
            "Refill: queue at {} (low-water mark {}), fetching {} more",
            queue.count(),
            self.low_water_mark,
            self.batch_size
        );
        Some(self.issue(false))
    }

    /// Clear the queue and fetch unconditionally.
    ///
    /// Any fetch still in flight is invalidated, not cancelled: its response
    /// will be reported as [`RefillOutcome::Stale`].
    pub fn force_refresh(&mut self, queue: &mut ReviewQueue) -> RefillRequest {
        queue.clear();
        self.generation += 1;
        log::info!("Refill: forced refresh, generation now {}", self.generation);
        self.issue(true)
    }

    fn issue(&mut self, forced: bool) -> RefillRequest {
        self.is_fetching = true;

        let backend = Arc::clone(&self.backend);
        let learning_lang = self.learning_lang.clone();
        let native_lang = self.native_lang.clone();
        let limit = self.batch_size;

        RefillRequest {
            generation: self.generation,
            forced,
            fetch: async move {
                backend
                    .get_next_questions(&learning_lang, &native_lang, limit)
                    .await
            }
            .boxed(),
        }
    }

    /// Apply a fetch result to the queue.
    ///
    /// A failed fetch clears `is_fetching` and returns the error; nothing is
    /// retried automatically.
    pub fn complete(
        &mut self,
        queue: &mut ReviewQueue,
        response: RefillResponse,
    ) -> Result<RefillOutcome, BackendError> {
        if response.generation != self.generation {
            log::info!(
                "Refill: discarding result from generation {} (current {})",
                response.generation,
                self.generation
            );
            return Ok(RefillOutcome::Stale);
        }

        self.is_fetching = false;

        let batch = match response.result {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("Refill: fetch failed: {}", e);
                return Err(e);
            }
        };

        queue.set_has_more(batch.has_more);

        let mut added = 0;
        let mut duplicates = 0;
        let mut dropped = 0;
        for record in batch.questions {
            match record.into_item() {
                Ok(item) => {
                    if queue.push_normal(item) {
                        added += 1;
                    } else {
                        duplicates += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Refill: dropping record: {}", e);
                    dropped += 1;
                }
            }
        }

        log::info!(
            "Refill: added {}, duplicates {}, dropped {}; queue now {}",
            added,
            duplicates,
            dropped,
            queue.count()
        );

        Ok(RefillOutcome::Applied {
            added,
            duplicates,
            dropped,
        })
    }
}
