//! Retry controller
//!
//! Decides what happens to an item after a failed attempt, and resets
//! terminally failed items for manual retry.

use super::types::{ItemStatus, WorkItem};
use crate::utils::error::WorkError;

/// Outcome of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The item goes back to the pending pool
    Requeue { retry_count: u32 },
    /// Retry budget spent; the item is now `Failed`
    Exhausted,
}

/// Bounded automatic retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Default ceiling assigned to newly added items
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Record a failed attempt on `item` and decide its next status.
    ///
    /// The item's own `max_retries` wins over the policy default so that a
    /// config change never rewrites items already in the registry.
    pub fn on_failure(&self, item: &mut WorkItem, error: &WorkError) -> RetryDecision {
        item.last_error = Some(error.to_string());

        if item.can_retry() {
            item.retry_count += 1;
            item.transition(ItemStatus::Pending);
            RetryDecision::Requeue {
                retry_count: item.retry_count,
            }
        } else {
            item.transition(ItemStatus::Failed);
            RetryDecision::Exhausted
        }
    }

    /// Give a failed item a fresh retry budget
    pub fn reset(&self, item: &mut WorkItem) {
        item.retry_count = 0;
        item.transition(ItemStatus::Pending);
    }
}
