//! Wire records exchanged with the practice backend

use serde::{Deserialize, Serialize};

use crate::queue::models::{ItemSource, ModelParseError, QuestionType, ReviewItem};
use crate::retention::{parse_timestamp, ReviewHistory, ReviewHistoryEntry};

/// Counters shown on the practice home screen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeStatus {
    #[serde(default)]
    pub new_count: u32,
    #[serde(default)]
    pub practice_count: u32,
    #[serde(default)]
    pub due_soon_count: u32,
    #[serde(default)]
    pub score: i64,
}

/// One graded review as sent by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHistoryEntry {
    pub reviewed_at: String,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u32>,
}

/// A practice question before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub word: String,
    pub question_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_word_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_at: Option<String>,
    #[serde(default)]
    pub review_history: Vec<RawHistoryEntry>,
    #[serde(default)]
    pub question: serde_json::Value,
}

impl QuestionRecord {
    pub fn new(word: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            word: word.into(),
            question_type: question_type.as_str().to_string(),
            source: None,
            saved_word_id: None,
            video_id: None,
            learned_at: None,
            review_history: Vec::new(),
            question: serde_json::Value::Null,
        }
    }

    /// Validate into a queue item.
    ///
    /// An unknown question type or source rejects the record. Dates that do not
    /// parse only drop the affected field or history entry.
    pub fn into_item(self) -> Result<ReviewItem, ModelParseError> {
        let question_type: QuestionType = self.question_type.parse()?;
        let source = match self.source.as_deref() {
            Some(raw) => raw.parse()?,
            None => ItemSource::default(),
        };

        let learned_at = self.learned_at.as_deref().and_then(parse_timestamp);
        let history = ReviewHistory::new(
            self.review_history
                .iter()
                .filter_map(|raw| {
                    let reviewed_at = parse_timestamp(&raw.reviewed_at)?;
                    Some(ReviewHistoryEntry {
                        reviewed_at,
                        correct: raw.correct,
                        response_time_ms: raw.response_time_ms,
                    })
                })
                .collect(),
        );

        let mut item = ReviewItem::new(self.word, question_type, source)
            .with_history(learned_at, history)
            .with_payload(self.question);
        item.saved_word_id = self.saved_word_id;
        item.video_id = self.video_id;
        Ok(item)
    }
}

/// A page of practice questions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBatch {
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
    #[serde(default)]
    pub has_more: bool,
}

/// A video-backed question whose media still has to be prepared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoQuestionRecord {
    pub video_id: i64,
    pub word: String,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default)]
    pub question: serde_json::Value,
}

impl VideoQuestionRecord {
    /// Validate into a queue item pointing at prepared media
    pub fn into_item(self, media: String) -> Result<ReviewItem, ModelParseError> {
        let question_type = match self.question_type.as_deref() {
            Some(raw) => raw.parse()?,
            None => QuestionType::VideoMc,
        };

        let mut item = ReviewItem::new(self.word, question_type, ItemSource::Search)
            .with_video_id(self.video_id)
            .with_payload(self.question);
        item.media = Some(media);
        Ok(item)
    }
}

/// Graded answer sent after the reveal delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub word: String,
    pub learning_lang: String,
    pub native_lang: String,
    pub correct: bool,
    pub question_type: QuestionType,
}

/// A badge the learner just earned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Backend reply to a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    #[serde(default)]
    pub score_delta: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_badge: Option<BadgeInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::models::KeyDiscriminator;

    #[test]
    fn test_question_record_into_item() {
        let json = r#"{
            "word": "ephemeral",
            "question_type": "mc_definition",
            "source": "new",
            "saved_word_id": 42,
            "learned_at": "2026-03-01T00:00:00Z",
            "review_history": [
                {"reviewed_at": "2026-03-04", "correct": false},
                {"reviewed_at": "bogus", "correct": true},
                {"reviewed_at": "2026-03-02", "correct": true}
            ],
            "question": {"options": ["a", "b"]}
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        let item = record.into_item().unwrap();

        assert_eq!(item.question_type, QuestionType::McDefinition);
        assert_eq!(item.source, ItemSource::New);
        assert_eq!(item.identity_key().discriminator, KeyDiscriminator::SavedWord(42));
        assert_eq!(item.history.len(), 2);
        assert!(item.history.first().unwrap().correct);
        assert!(item.learned_at.is_some());
        assert_eq!(item.payload["options"][1], "b");
    }

    #[test]
    fn test_unknown_question_type_is_rejected() {
        let record = QuestionRecord {
            question_type: "crossword".into(),
            ..QuestionRecord::new("cat", QuestionType::McWord)
        };
        assert_eq!(
            record.into_item(),
            Err(ModelParseError::QuestionType("crossword".into()))
        );
    }

    #[test]
    fn test_video_record_defaults() {
        let record = VideoQuestionRecord {
            video_id: 5,
            word: "run".into(),
            video_url: "https://cdn.example.com/5.mp4".into(),
            question_type: None,
            question: serde_json::Value::Null,
        };
        let item = record.into_item("file:///cache/5.mp4".into()).unwrap();

        assert_eq!(item.question_type, QuestionType::VideoMc);
        assert_eq!(item.source, ItemSource::Search);
        assert_eq!(item.identity_key().discriminator, KeyDiscriminator::Video(5));
        assert_eq!(item.media.as_deref(), Some("file:///cache/5.mp4"));
    }

    #[test]
    fn test_outcome_tolerates_missing_fields() {
        let outcome: ReviewOutcome = serde_json::from_str("{}").unwrap();
        assert_eq!(outcome, ReviewOutcome::default());

        let outcome: ReviewOutcome = serde_json::from_str(
            r#"{"score_delta": 3, "new_badge": {"id": "streak_7", "name": "Week Streak"}}"#,
        )
        .unwrap();
        assert_eq!(outcome.score_delta, 3);
        assert_eq!(outcome.new_badge.unwrap().name, "Week Streak");
    }
}
