//! Data models for the review queue

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retention::{retention_at, ReviewHistory};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelParseError {
    #[error("Unknown question type: {0}")]
    QuestionType(String),

    #[error("Unknown item source: {0}")]
    Source(String),
}

/// Kind of practice question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Self-graded "do you know this word" card
    Recognition,
    /// Pick the definition of a word
    McDefinition,
    /// Pick the word matching a definition
    McWord,
    /// Complete a sentence with the word
    FillBlank,
    /// Read an example sentence aloud
    PronounceSentence,
    /// Multiple choice over a video clip
    VideoMc,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        Self::Recognition,
        Self::McDefinition,
        Self::McWord,
        Self::FillBlank,
        Self::PronounceSentence,
        Self::VideoMc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recognition => "recognition",
            Self::McDefinition => "mc_definition",
            Self::McWord => "mc_word",
            Self::FillBlank => "fill_blank",
            Self::PronounceSentence => "pronounce_sentence",
            Self::VideoMc => "video_mc",
        }
    }

    /// Question types that move on by themselves once the answer is submitted
    pub fn auto_advances(&self) -> bool {
        matches!(self, Self::Recognition | Self::PronounceSentence)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|qt| qt.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ModelParseError::QuestionType(s.to_string()))
    }
}

/// Why an item is in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// Due for review
    #[default]
    Scheduled,
    /// Never practised
    New,
    /// Prepared for a word the learner looked up
    Search,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::New => "new",
            Self::Search => "search",
        }
    }
}

impl FromStr for ItemSource {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" | "due" | "review" => Ok(Self::Scheduled),
            "new" => Ok(Self::New),
            "search" => Ok(Self::Search),
            _ => Err(ModelParseError::Source(s.to_string())),
        }
    }
}

/// Third component of an identity key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum KeyDiscriminator {
    Video(i64),
    SavedWord(i64),
    Source(ItemSource),
}

/// Uniqueness key of a queued item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityKey {
    pub word: String,
    pub question_type: QuestionType,
    pub discriminator: KeyDiscriminator,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discriminator {
            KeyDiscriminator::Video(id) => {
                write!(f, "{}/{}/video:{}", self.word, self.question_type, id)
            }
            KeyDiscriminator::SavedWord(id) => {
                write!(f, "{}/{}/saved:{}", self.word, self.question_type, id)
            }
            KeyDiscriminator::Source(source) => {
                write!(f, "{}/{}/{}", self.word, self.question_type, source.as_str())
            }
        }
    }
}

/// A practice question waiting in the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub word: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub source: ItemSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_word_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<i64>,
    /// When the learner first saved the word
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: ReviewHistory,
    /// Question body, rendered by the UI
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Locator of prepared media for video questions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl ReviewItem {
    pub fn new(word: impl Into<String>, question_type: QuestionType, source: ItemSource) -> Self {
        Self {
            word: word.into(),
            question_type,
            source,
            saved_word_id: None,
            video_id: None,
            learned_at: None,
            history: ReviewHistory::default(),
            payload: serde_json::Value::Null,
            media: None,
        }
    }

    pub fn with_saved_word_id(mut self, id: i64) -> Self {
        self.saved_word_id = Some(id);
        self
    }

    pub fn with_video_id(mut self, id: i64) -> Self {
        self.video_id = Some(id);
        self
    }

    pub fn with_history(
        mut self,
        learned_at: Option<DateTime<Utc>>,
        history: ReviewHistory,
    ) -> Self {
        self.learned_at = learned_at;
        self.history = history;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Video id wins over saved word id, which wins over the source
    pub fn identity_key(&self) -> IdentityKey {
        let discriminator = match (self.video_id, self.saved_word_id) {
            (Some(video), _) => KeyDiscriminator::Video(video),
            (None, Some(saved)) => KeyDiscriminator::SavedWord(saved),
            (None, None) => KeyDiscriminator::Source(self.source),
        };
        IdentityKey {
            word: self.word.clone(),
            question_type: self.question_type,
            discriminator,
        }
    }

    /// Current retention estimate, if the word has a known start date
    pub fn retention_at(&self, now: DateTime<Utc>) -> Option<f64> {
        let created = self
            .learned_at
            .or_else(|| self.history.first().map(|e| e.reviewed_at))?;
        Some(retention_at(&self.history, created, now))
    }
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    /// Priority lane first, then the normal lane
    pub items: Vec<ReviewItem>,
    pub is_fetching: bool,
    pub has_more: bool,
}

impl QueueState {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn head(&self) -> Option<&ReviewItem> {
        self.items.first()
    }
}
