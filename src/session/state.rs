//! Life cycle of a presented question
//!
//! ```text
//! AwaitingQuestion -> Presented -> Answered -> SubmittedPendingAdvance -> Removed
//! ```
//!
//! `AwaitingQuestion` holds while the queue is empty. `Removed` is terminal for
//! one presentation; the same word and type shown again is a new instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Result, SessionError};
use crate::queue::models::{IdentityKey, ReviewItem};

/// Where the backend submission stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionStatus {
    Pending,
    Succeeded,
    /// The learner may still advance
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum QuestionPhase {
    AwaitingQuestion,
    Presented,
    Answered {
        correct: bool,
    },
    SubmittedPendingAdvance {
        correct: bool,
        status: SubmissionStatus,
    },
    Removed,
}

impl QuestionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingQuestion => "awaiting a question",
            Self::Presented => "presented",
            Self::Answered { .. } => "answered",
            Self::SubmittedPendingAdvance { .. } => "submitted",
            Self::Removed => "removed",
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            phase: self.name(),
        }
    }

    /// First response from the learner
    pub fn answer(&self, correct: bool) -> Result<Self> {
        match self {
            Self::Presented => Ok(Self::Answered { correct }),
            other => Err(other.invalid("answer")),
        }
    }

    /// Reveal delay elapsed and the submission was issued
    pub fn submit(&self) -> Result<Self> {
        match self {
            Self::Answered { correct } => Ok(Self::SubmittedPendingAdvance {
                correct: *correct,
                status: SubmissionStatus::Pending,
            }),
            other => Err(other.invalid("submit")),
        }
    }

    /// Backend replied
    pub fn settle(&self, status: SubmissionStatus) -> Result<Self> {
        match self {
            Self::SubmittedPendingAdvance {
                correct,
                status: SubmissionStatus::Pending,
            } => Ok(Self::SubmittedPendingAdvance {
                correct: *correct,
                status,
            }),
            other => Err(other.invalid("settle")),
        }
    }

    /// Learner moved on
    pub fn remove(&self) -> Result<Self> {
        match self {
            Self::SubmittedPendingAdvance { .. } => Ok(Self::Removed),
            other => Err(other.invalid("advance")),
        }
    }

    pub fn can_advance(&self) -> bool {
        matches!(self, Self::SubmittedPendingAdvance { .. })
    }
}

/// One presentation of a queued item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveQuestion {
    pub instance: u64,
    pub item: ReviewItem,
    pub key: IdentityKey,
    pub phase: QuestionPhase,
    pub presented_at: DateTime<Utc>,
    /// Retention estimate at presentation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<f64>,
}

impl ActiveQuestion {
    pub fn new(instance: u64, item: ReviewItem, now: DateTime<Utc>) -> Self {
        let key = item.identity_key();
        let retention = item.retention_at(now);
        Self {
            instance,
            item,
            key,
            phase: QuestionPhase::Presented,
            presented_at: now,
            retention,
        }
    }
}

/// Instant affordance shown before the backend round-trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub instance: u64,
    pub word: String,
    pub correct: bool,
}
