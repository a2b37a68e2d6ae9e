//! Review core of the vocabulary client.
//!
//! - [`retention`] estimates how well a word is remembered and builds
//!   forgetting curves for display.
//! - [`queue`] keeps practice items flowing: a two-lane queue, refills and
//!   streamed video questions.
//! - [`session`] drives a learner through the queue.
//! - [`backend`] talks to the vocabulary service.

pub mod backend;
pub mod config;
pub mod queue;
pub mod retention;
pub mod session;
