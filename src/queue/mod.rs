//! Adaptive review queue
//!
//! This module provides:
//! - The two-lane review queue with identity-key deduplication
//! - Refill control with single-flight fetches and generation tokens
//! - Streaming ingestion of items that become ready over time

pub mod models;
pub mod refill;
pub mod review_queue;
pub mod streaming;

pub use models::*;
pub use refill::{QueueRefillController, RefillOutcome, RefillRequest, RefillResponse};
pub use review_queue::{Lane, ReviewQueue};
pub use streaming::{
    IngestStep, PendingSource, Readiness, StartedStream, StreamCallbacks, StreamId,
    StreamSummary, StreamingIngestor,
};
