//! Data models for retention estimates and forgetting curves

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single graded review of a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewHistoryEntry {
    pub reviewed_at: DateTime<Utc>,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u32>,
}

impl ReviewHistoryEntry {
    pub fn new(reviewed_at: DateTime<Utc>, correct: bool) -> Self {
        Self {
            reviewed_at,
            correct,
            response_time_ms: None,
        }
    }
}

/// Review history of one word, always ordered by `reviewed_at` ascending.
///
/// Entries arrive from the backend in no guaranteed order, so sorting happens
/// once here instead of in every decay calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ReviewHistoryEntry>", into = "Vec<ReviewHistoryEntry>")]
pub struct ReviewHistory {
    entries: Vec<ReviewHistoryEntry>,
}

impl ReviewHistory {
    pub fn new(mut entries: Vec<ReviewHistoryEntry>) -> Self {
        entries.sort_by_key(|e| e.reviewed_at);
        Self { entries }
    }

    pub fn entries(&self) -> &[ReviewHistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first(&self) -> Option<&ReviewHistoryEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&ReviewHistoryEntry> {
        self.entries.last()
    }

    /// Append a review, keeping the ordering invariant
    pub fn record(&mut self, entry: ReviewHistoryEntry) {
        let idx = self
            .entries
            .partition_point(|e| e.reviewed_at <= entry.reviewed_at);
        self.entries.insert(idx, entry);
    }

    /// Entries reviewed at or before `at`
    pub fn up_to(&self, at: DateTime<Utc>) -> &[ReviewHistoryEntry] {
        let end = self.entries.partition_point(|e| e.reviewed_at <= at);
        &self.entries[..end]
    }
}

impl From<Vec<ReviewHistoryEntry>> for ReviewHistory {
    fn from(entries: Vec<ReviewHistoryEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<ReviewHistory> for Vec<ReviewHistoryEntry> {
    fn from(history: ReviewHistory) -> Self {
        history.entries
    }
}

/// A point on a forgetting curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSample {
    pub at: DateTime<Utc>,
    /// Estimated recall in `[0.10, 1.0]`
    pub retention: f64,
    /// True when the sample lies after the latest known review
    pub is_projection: bool,
}

/// Kind of event marked on a forgetting curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// The word was saved / first learned
    Creation,
    /// A graded review
    Review,
    /// The next scheduled review
    NextReview,
}

impl MarkerKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "creation" | "created" => Some(Self::Creation),
            "review" => Some(Self::Review),
            "next_review" | "next-review" | "nextreview" => Some(Self::NextReview),
            _ => None,
        }
    }
}

/// An event drawn on top of the curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveMarker {
    pub kind: MarkerKind,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// A parsed forgetting curve ready for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgettingCurve {
    pub samples: Vec<RetentionSample>,
    pub markers: Vec<CurveMarker>,
    /// Number of samples or markers dropped because they failed to parse
    #[serde(default)]
    pub dropped: usize,
}
