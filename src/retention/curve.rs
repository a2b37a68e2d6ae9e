//! Conversion of backend forgetting-curve records into display curves

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{clamp_retention, curve_between, default_curve_end, projected_review_time};
use super::dates::parse_timestamp;
use super::models::{
    CurveMarker, ForgettingCurve, MarkerKind, RetentionSample, ReviewHistory, ReviewHistoryEntry,
};

/// Retention level at which a review is projected to be due
pub const REVIEW_THRESHOLD: f64 = 0.5;

/// Curve sample as sent by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCurveSample {
    pub date: String,
    pub retention: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_projection: Option<bool>,
}

/// Curve marker as sent by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCurveMarker {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// Response of the forgetting-curve endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgettingCurveRecord {
    #[serde(default)]
    pub forgetting_curve: Vec<RawCurveSample>,
    #[serde(default)]
    pub all_markers: Vec<RawCurveMarker>,
}

impl ForgettingCurve {
    /// Build a display curve from a backend record.
    ///
    /// Samples and markers that cannot be parsed are dropped and counted in
    /// `dropped`; the rest of the curve is kept.
    pub fn from_record(record: &ForgettingCurveRecord) -> Self {
        let mut dropped = 0;

        let mut markers: Vec<CurveMarker> = Vec::with_capacity(record.all_markers.len());
        for raw in &record.all_markers {
            match (MarkerKind::parse(&raw.kind), parse_timestamp(&raw.date)) {
                (Some(kind), Some(at)) => markers.push(CurveMarker {
                    kind,
                    at,
                    success: raw.success,
                }),
                _ => {
                    log::debug!("Dropping curve marker {:?} at {:?}", raw.kind, raw.date);
                    dropped += 1;
                }
            }
        }
        markers.sort_by_key(|m| m.at);

        let last_review = markers
            .iter()
            .filter(|m| m.kind == MarkerKind::Review)
            .map(|m| m.at)
            .max();

        let mut samples: Vec<RetentionSample> = Vec::with_capacity(record.forgetting_curve.len());
        for raw in &record.forgetting_curve {
            let Some(at) = parse_timestamp(&raw.date) else {
                log::debug!("Dropping curve sample with unparseable date {:?}", raw.date);
                dropped += 1;
                continue;
            };
            if !raw.retention.is_finite() {
                dropped += 1;
                continue;
            }

            // Backends report either a fraction or a percentage
            let fraction = if raw.retention > 1.0 {
                raw.retention / 100.0
            } else {
                raw.retention
            };

            let is_projection = raw
                .is_projection
                .unwrap_or_else(|| last_review.map_or(false, |last| at > last));

            samples.push(RetentionSample {
                at,
                retention: clamp_retention(fraction),
                is_projection,
            });
        }
        samples.sort_by_key(|s| s.at);

        if dropped > 0 {
            log::warn!("Forgetting curve: dropped {} unparseable entries", dropped);
        }

        Self {
            samples,
            markers,
            dropped,
        }
    }

    /// Estimate a curve locally from a review history
    pub fn estimate(
        history: &ReviewHistory,
        created_at: DateTime<Utc>,
        sample_count: usize,
    ) -> Self {
        let next_review = projected_review_time(history, REVIEW_THRESHOLD);
        let end = default_curve_end(history, created_at, next_review);

        let mut markers = vec![CurveMarker {
            kind: MarkerKind::Creation,
            at: created_at,
            success: None,
        }];
        markers.extend(history.entries().iter().map(|e| CurveMarker {
            kind: MarkerKind::Review,
            at: e.reviewed_at,
            success: Some(e.correct),
        }));
        if let Some(at) = next_review {
            markers.push(CurveMarker {
                kind: MarkerKind::NextReview,
                at,
                success: None,
            });
        }

        Self {
            samples: curve_between(history, created_at, end, sample_count),
            markers,
            dropped: 0,
        }
    }

    /// Graded reviews recorded on the curve
    pub fn history(&self) -> ReviewHistory {
        ReviewHistory::new(
            self.markers
                .iter()
                .filter(|m| m.kind == MarkerKind::Review)
                .filter_map(|m| m.success.map(|ok| ReviewHistoryEntry::new(m.at, ok)))
                .collect(),
        )
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.markers
            .iter()
            .find(|m| m.kind == MarkerKind::Creation)
            .map(|m| m.at)
    }

    pub fn next_review(&self) -> Option<DateTime<Utc>> {
        self.markers
            .iter()
            .find(|m| m.kind == MarkerKind::NextReview)
            .map(|m| m.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::algorithm::{CORRECT_BASE, RETENTION_FLOOR};
    use chrono::{Duration, TimeZone};

    fn sample(date: &str, retention: f64) -> RawCurveSample {
        RawCurveSample {
            date: date.to_string(),
            retention,
            is_projection: None,
        }
    }

    fn marker(kind: &str, date: &str, success: Option<bool>) -> RawCurveMarker {
        RawCurveMarker {
            kind: kind.to_string(),
            date: date.to_string(),
            success,
        }
    }

    #[test]
    fn test_from_record_drops_bad_entries() {
        let record = ForgettingCurveRecord {
            forgetting_curve: vec![
                sample("2026-03-01", 1.0),
                sample("not a date", 0.8),
                sample("2026-03-03T00:00:00Z", 0.8),
                sample("2026-03-04", f64::NAN),
            ],
            all_markers: vec![
                marker("creation", "2026-03-01", None),
                marker("mystery", "2026-03-02", None),
                marker("review", "garbage", Some(true)),
            ],
        };

        let curve = ForgettingCurve::from_record(&record);
        assert_eq!(curve.samples.len(), 2);
        assert_eq!(curve.markers.len(), 1);
        assert_eq!(curve.dropped, 4);
    }

    #[test]
    fn test_from_record_clamps_and_normalises_percentages() {
        let record = ForgettingCurveRecord {
            forgetting_curve: vec![sample("2026-03-01", 85.0), sample("2026-03-02", 0.01)],
            all_markers: vec![],
        };

        let curve = ForgettingCurve::from_record(&record);
        assert!((curve.samples[0].retention - 0.85).abs() < 1e-9);
        assert_eq!(curve.samples[1].retention, RETENTION_FLOOR);
    }

    #[test]
    fn test_projection_inferred_from_last_review() {
        let record = ForgettingCurveRecord {
            forgetting_curve: vec![
                sample("2026-03-05", 0.6),
                sample("2026-03-01", 1.0),
                RawCurveSample {
                    date: "2026-03-02".into(),
                    retention: 0.9,
                    is_projection: Some(true),
                },
            ],
            all_markers: vec![marker("review", "2026-03-03", Some(false))],
        };

        let curve = ForgettingCurve::from_record(&record);
        let flags: Vec<bool> = curve.samples.iter().map(|s| s.is_projection).collect();
        assert_eq!(flags, vec![false, true, true]);

        let history = curve.history();
        assert_eq!(history.len(), 1);
        assert!(!history.entries()[0].correct);
    }

    #[test]
    fn test_record_deserializes_backend_shape() {
        let json = r#"{
            "forgetting_curve": [{"date": "2026-03-01", "retention": 1.0}],
            "all_markers": [
                {"type": "creation", "date": "2026-03-01"},
                {"type": "next_review", "date": "2026-03-09"}
            ]
        }"#;
        let record: ForgettingCurveRecord = serde_json::from_str(json).unwrap();
        let curve = ForgettingCurve::from_record(&record);

        assert_eq!(
            curve.next_review(),
            Some(Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap())
        );
        assert_eq!(
            curve.created_at(),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_estimate_builds_markers_and_samples() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let history = ReviewHistory::new(vec![
            ReviewHistoryEntry::new(created, true),
            ReviewHistoryEntry::new(created + Duration::days(2), true),
        ]);

        let curve = ForgettingCurve::estimate(&history, created, 10);
        assert_eq!(curve.history(), history);
        assert_eq!(curve.created_at(), Some(created));
        assert!(curve.next_review().unwrap() > created + Duration::days(2));
        assert!(curve.samples.len() >= 10);
        assert_eq!(curve.samples[0].retention, CORRECT_BASE);
    }
}
