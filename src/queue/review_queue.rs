//! Two-lane review queue
//!
//! Streamed items wait in the priority lane and are served before scheduled
//! ones. Identity keys are unique across both lanes; a repeated push is a no-op.

use std::collections::{HashSet, VecDeque};

use super::models::{IdentityKey, QueueState, ReviewItem};

/// Lane an item is pushed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Streamed items, served first
    Priority,
    /// Scheduled and new items
    Normal,
}

/// Pending review items in two FIFO lanes.
///
/// Identity keys are unique across both lanes. Pushing an item whose key is
/// already queued is a silent no-op, since streamed and fetched batches are
/// expected to overlap.
#[derive(Debug, Default)]
pub struct ReviewQueue {
    priority: VecDeque<ReviewItem>,
    normal: VecDeque<ReviewItem>,
    keys: HashSet<IdentityKey>,
    has_more: bool,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the tail of the normal lane. Returns false for duplicates.
    pub fn push_normal(&mut self, item: ReviewItem) -> bool {
        self.push(Lane::Normal, item)
    }

    /// Add to the tail of the priority lane. Returns false for duplicates.
    pub fn push_priority(&mut self, item: ReviewItem) -> bool {
        self.push(Lane::Priority, item)
    }

    pub fn push(&mut self, lane: Lane, item: ReviewItem) -> bool {
        let key = item.identity_key();
        if !self.keys.insert(key) {
            log::debug!("Review queue: ignoring duplicate {}", item.identity_key());
            return false;
        }

        match lane {
            Lane::Priority => self.priority.push_back(item),
            Lane::Normal => self.normal.push_back(item),
        }
        true
    }

    /// Item that would be served next
    pub fn peek(&self) -> Option<&ReviewItem> {
        self.priority.front().or_else(|| self.normal.front())
    }

    /// Remove and return the item `peek` would return
    pub fn pop(&mut self) -> Option<ReviewItem> {
        let item = match self.priority.pop_front() {
            Some(item) => item,
            None => self.normal.pop_front()?,
        };
        self.keys.remove(&item.identity_key());
        Some(item)
    }

    /// Remove a specific item wherever it sits
    pub fn remove(&mut self, key: &IdentityKey) -> Option<ReviewItem> {
        if !self.keys.remove(key) {
            return None;
        }

        for lane in [&mut self.priority, &mut self.normal] {
            if let Some(idx) = lane.iter().position(|item| &item.identity_key() == key) {
                return lane.remove(idx);
            }
        }
        None
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    /// Empty both lanes
    pub fn clear(&mut self) {
        self.priority.clear();
        self.normal.clear();
        self.keys.clear();
        self.has_more = false;
    }

    pub fn count(&self) -> usize {
        self.priority.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn priority_len(&self) -> usize {
        self.priority.len()
    }

    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    /// Whether the backend has more pages beyond what is queued
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn set_has_more(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReviewItem> {
        self.priority.iter().chain(self.normal.iter())
    }

    pub fn snapshot(&self, is_fetching: bool) -> QueueState {
        QueueState {
            items: self.iter().cloned().collect(),
            is_fetching,
            has_more: self.has_more,
        }
    }
}
