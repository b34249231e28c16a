//! Aggregate batch statistics

use super::registry::Registry;
use super::types::ItemStatus;
use serde::{Deserialize, Serialize};

/// Counts by status plus completion percentage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    /// `completed / total * 100`, or `0.0` for an empty registry
    pub progress: f64,
}

impl BatchStats {
    /// Derive stats from the registry's current contents
    pub fn collect(registry: &Registry) -> Self {
        let mut stats = Self {
            pending: registry.count(ItemStatus::Pending),
            processing: registry.count(ItemStatus::Processing),
            completed: registry.count(ItemStatus::Completed),
            failed: registry.count(ItemStatus::Failed),
            total: registry.len(),
            progress: 0.0,
        };
        if stats.total > 0 {
            stats.progress = stats.completed as f64 / stats.total as f64 * 100.0;
        }
        stats
    }

    /// Items not yet finished
    pub fn remaining(&self) -> usize {
        self.pending + self.processing
    }

    /// Nothing left to run
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Every item in a non-empty batch completed
    pub fn all_succeeded(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
