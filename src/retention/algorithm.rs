//! Exponential forgetting model
//!
//! Retention jumps to a base value at every review (0.95 after a correct
//! answer, 0.70 after an incorrect one) and then decays as
//! `base * e^(-rate * days)`. The rate slows as reviews accumulate:
//!
//! | reviews so far | rate |
//! |----------------|------|
//! | 1              | 0.15 |
//! | 2              | 0.10 |
//! | 3-4            | 0.07 |
//! | 5+             | 0.04 |
//!
//! Results are clamped to `[0.10, 1.0]`.

use chrono::{DateTime, Duration, Utc};

use super::models::{RetentionSample, ReviewHistory};

/// Lowest retention ever reported
pub const RETENTION_FLOOR: f64 = 0.10;

/// Retention right after a correct review
pub const CORRECT_BASE: f64 = 0.95;

/// Retention right after an incorrect review
pub const INCORRECT_BASE: f64 = 0.70;

/// Minimum visible span of a curve when no next review is known
const MIN_CURVE_SPAN_DAYS: i64 = 30;

/// Extra span drawn past the last review
const CURVE_BUFFER_DAYS: i64 = 7;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Decay rate after `review_count` reviews
pub fn decay_rate_for(review_count: usize) -> f64 {
    match review_count {
        0 | 1 => 0.15,
        2 => 0.10,
        3 | 4 => 0.07,
        _ => 0.04,
    }
}

/// Clamp a raw retention value into the reportable range
pub fn clamp_retention(value: f64) -> f64 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(RETENTION_FLOOR, 1.0)
}

fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / MS_PER_DAY).max(0.0)
}

/// Estimate recall of a word at `target`.
///
/// Before the word was created, before its first review, or when it has never
/// been reviewed, recall is assumed perfect (`1.0`).
pub fn retention_at(
    history: &ReviewHistory,
    created_at: DateTime<Utc>,
    target: DateTime<Utc>,
) -> f64 {
    if target < created_at {
        return 1.0;
    }

    let reviewed = history.up_to(target);
    let Some(latest) = reviewed.last() else {
        return 1.0;
    };

    let base = if latest.correct {
        CORRECT_BASE
    } else {
        INCORRECT_BASE
    };
    let rate = decay_rate_for(reviewed.len());
    let days = elapsed_days(latest.reviewed_at, target);

    clamp_retention(base * (-rate * days).exp())
}

/// Sample the forgetting curve across `[created_at, end]`.
///
/// `sample_count` points are spaced evenly over the range, and every review
/// inside the range is added as an extra anchor so the jump at each review is
/// visible. Samples after the latest review are marked as projections.
pub fn curve_between(
    history: &ReviewHistory,
    created_at: DateTime<Utc>,
    end: DateTime<Utc>,
    sample_count: usize,
) -> Vec<RetentionSample> {
    if sample_count == 0 {
        return Vec::new();
    }

    let end = end.max(created_at);
    let span_ms = (end - created_at).num_milliseconds();

    let mut times: Vec<DateTime<Utc>> = if sample_count == 1 {
        vec![created_at]
    } else {
        let steps = (sample_count - 1) as i64;
        (0..sample_count as i64)
            .map(|i| created_at + Duration::milliseconds(span_ms * i / steps))
            .collect()
    };

    times.extend(
        history
            .entries()
            .iter()
            .map(|e| e.reviewed_at)
            .filter(|at| *at >= created_at && *at <= end),
    );
    times.sort();
    times.dedup();

    let last_known = history
        .last()
        .map(|e| e.reviewed_at)
        .unwrap_or(created_at);

    times
        .into_iter()
        .map(|at| RetentionSample {
            at,
            retention: retention_at(history, created_at, at),
            is_projection: at > last_known,
        })
        .collect()
}

/// Where a curve should end when the caller has no better idea.
///
/// A known next review wins. Otherwise the curve runs to the later of a short
/// buffer past the last review and 30 days after creation.
pub fn default_curve_end(
    history: &ReviewHistory,
    created_at: DateTime<Utc>,
    projected_next_review: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let last_known = history
        .last()
        .map(|e| e.reviewed_at)
        .unwrap_or(created_at)
        .max(created_at);

    if let Some(next) = projected_next_review {
        return next.max(last_known);
    }

    (last_known + Duration::days(CURVE_BUFFER_DAYS))
        .max(created_at + Duration::days(MIN_CURVE_SPAN_DAYS))
}

/// When retention is expected to fall to `threshold` after the latest review.
///
/// Returns `None` for words that were never reviewed or for thresholds the
/// curve can never reach (at or below the floor).
pub fn projected_review_time(
    history: &ReviewHistory,
    threshold: f64,
) -> Option<DateTime<Utc>> {
    let latest = history.last()?;
    if threshold <= RETENTION_FLOOR || threshold.is_nan() {
        return None;
    }

    let base = if latest.correct {
        CORRECT_BASE
    } else {
        INCORRECT_BASE
    };
    if base <= threshold {
        return Some(latest.reviewed_at);
    }

    let days = (base / threshold).ln() / decay_rate_for(history.len());
    Some(latest.reviewed_at + Duration::milliseconds((days * MS_PER_DAY) as i64))
}
