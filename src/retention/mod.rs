//! Memory retention estimates for reviewed words
//!
//! This module provides:
//! - The exponential forgetting model (`retention_at`, `curve_between`)
//! - Parsing of backend timestamps in the formats seen in the wild
//! - Conversion of backend forgetting-curve records into display curves

pub mod algorithm;
pub mod curve;
pub mod dates;
pub mod models;

pub use algorithm::{
    curve_between, decay_rate_for, default_curve_end, projected_review_time, retention_at,
    RETENTION_FLOOR,
};
pub use curve::{ForgettingCurveRecord, RawCurveMarker, RawCurveSample, REVIEW_THRESHOLD};
pub use dates::parse_timestamp;
pub use models::*;
