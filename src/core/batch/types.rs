//! Types for batch work items

use crate::utils::error::BatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of a work item, stable for the item's lifetime
pub type ItemId = String;

/// Generate a fresh item ID for callers that have none of their own
pub fn new_item_id() -> ItemId {
    Uuid::new_v4().to_string()
}

/// Lifecycle status of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting in the pending pool
    Pending,
    /// Admitted and occupying a concurrency slot
    Processing,
    /// Work function succeeded
    Completed,
    /// Retries exhausted
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Queue ordering class. Higher classes are admitted first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// All classes in admission order
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// Rank used for ordering (higher value = admitted earlier)
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Normal => 2,
            Self::Low => 1,
        }
    }

    /// Position of this class's queue in admission order
    pub(crate) fn queue_index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        };
        f.write_str(name)
    }
}

impl FromStr for Priority {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(BatchError::validation(format!(
                "unknown priority '{}', expected high, normal or low",
                other
            ))),
        }
    }
}

/// A single file/job unit tracked by the batch engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Item ID
    pub id: ItemId,
    /// Current status
    pub status: ItemStatus,
    /// Queue ordering class
    pub priority: Priority,
    /// Automatic retries already consumed
    pub retry_count: u32,
    /// Ceiling for automatic retries
    pub max_retries: u32,
    /// Total work-function invocations
    pub attempts: u32,
    /// Message of the most recent failed attempt
    pub last_error: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(id: impl Into<ItemId>, priority: Priority, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: ItemStatus::Pending,
            priority,
            retry_count: 0,
            max_retries,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether another automatic retry is allowed
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Completed or terminally failed
    pub fn is_finished(&self) -> bool {
        matches!(self.status, ItemStatus::Completed | ItemStatus::Failed)
    }

    pub(crate) fn transition(&mut self, status: ItemStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
