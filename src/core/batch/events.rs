//! Batch lifecycle events

use super::scheduler::Phase;
use super::stats::BatchStats;
use super::types::{ItemId, ItemStatus, Priority};
use serde::{Deserialize, Serialize};

/// Push notification emitted by the controller.
///
/// Delivered over a broadcast channel; slow subscribers may observe
/// `RecvError::Lagged` and should fall back to `get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    ItemQueued {
        item_id: ItemId,
        priority: Priority,
    },
    ItemStarted {
        item_id: ItemId,
        attempt: u32,
    },
    ItemCompleted {
        item_id: ItemId,
    },
    ItemRetrying {
        item_id: ItemId,
        retry_count: u32,
        error: String,
    },
    ItemFailed {
        item_id: ItemId,
        error: String,
    },
    ItemRemoved {
        item_id: ItemId,
        status: ItemStatus,
    },
    BatchStarted {
        concurrency: usize,
    },
    BatchPaused,
    BatchDrained {
        stats: BatchStats,
    },
    BatchCleared,
    ConcurrencyChanged {
        from: usize,
        to: usize,
    },
}

impl BatchEvent {
    /// Item the event refers to, if any
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::ItemQueued { item_id, .. }
            | Self::ItemStarted { item_id, .. }
            | Self::ItemCompleted { item_id }
            | Self::ItemRetrying { item_id, .. }
            | Self::ItemFailed { item_id, .. }
            | Self::ItemRemoved { item_id, .. } => Some(item_id),
            _ => None,
        }
    }
}

/// Latest controller state, published on every change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub stats: BatchStats,
    pub phase: Phase,
    pub concurrency: usize,
    /// Occupied slots, including those held by removed items
    pub in_flight: usize,
    /// Incremented by every `clear`
    pub generation: u64,
}
