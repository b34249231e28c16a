//! Concurrency-bounded scheduler
//!
//! Owns the registry, the retry policy and slot accounting. Every method is
//! synchronous and meant to be called under the controller's mutex; the
//! controller does the actual spawning of work outside the lock.

use super::registry::{Registry, RegistrySnapshot};
use super::retry::{RetryDecision, RetryPolicy};
use super::stats::BatchStats;
use super::types::{ItemId, ItemStatus, Priority, WorkItem};
use crate::utils::error::WorkError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Lowest accepted concurrency limit
pub const MIN_CONCURRENCY: usize = 1;
/// Highest accepted concurrency limit
pub const MAX_CONCURRENCY: usize = 6;
/// Concurrency used when nothing else is configured
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Clamp a requested limit into `[MIN_CONCURRENCY, MAX_CONCURRENCY]`
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// Whether the scheduler is admitting work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Never started, drained or cleared
    #[default]
    Idle,
    /// Admitting new items
    Running,
    /// Explicitly paused; in-flight work still finishes
    Paused,
}

/// Identifies one admission of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptToken {
    pub item_id: ItemId,
    epoch: u64,
    attempt: u64,
}

/// An item that was just moved into `Processing`
#[derive(Debug, Clone)]
pub struct Admission {
    pub token: AttemptToken,
    /// 1-based invocation count for this item
    pub attempt: u32,
}

/// What a finished attempt did to the registry
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Completed {
        item_id: ItemId,
    },
    Retrying {
        item_id: ItemId,
        retry_count: u32,
        error: WorkError,
    },
    Failed {
        item_id: ItemId,
        error: WorkError,
    },
    /// The item was removed or the batch cleared while the attempt ran
    Discarded {
        item_id: ItemId,
    },
}

#[derive(Debug)]
pub struct Scheduler {
    registry: Registry,
    retry: RetryPolicy,
    concurrency: usize,
    phase: Phase,
    /// Occupied slots keyed by attempt number
    slots: HashMap<u64, ItemId>,
    next_attempt: u64,
    /// Bumped by `reset` so attempts from before a clear are recognized
    epoch: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, RetryPolicy::default())
    }
}

impl Scheduler {
    pub fn new(concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            registry: Registry::new(),
            retry,
            concurrency: clamp_concurrency(concurrency),
            phase: Phase::Idle,
            slots: HashMap::new(),
            next_attempt: 0,
            epoch: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Occupied slots, including those held by removed items
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats::collect(&self.registry)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.registry.get(id)
    }

    /// Queue new items with the policy's retry ceiling
    pub fn add<I>(&mut self, ids: I, priority: Priority) -> Vec<ItemId>
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.registry.add(ids, priority, self.retry.max_retries)
    }

    /// Delete an item. A running attempt keeps its slot until it returns.
    pub fn remove(&mut self, id: &str) -> Option<WorkItem> {
        self.registry.remove(id)
    }

    /// Returns the previous limit
    pub fn set_concurrency(&mut self, requested: usize) -> usize {
        std::mem::replace(&mut self.concurrency, clamp_concurrency(requested))
    }

    /// Enter `Running`. Returns the previous phase.
    pub fn resume(&mut self) -> Phase {
        std::mem::replace(&mut self.phase, Phase::Running)
    }

    /// Stop admitting. Returns `false` if the scheduler was not running.
    pub fn pause(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.phase = Phase::Paused;
        true
    }

    /// Fill free slots from the pending pool, highest priority first
    pub fn admit(&mut self) -> Vec<Admission> {
        let mut admitted = Vec::new();
        if self.phase != Phase::Running {
            return admitted;
        }

        while self.slots.len() < self.concurrency {
            let Some(item_id) = self.registry.take_next_pending() else {
                break;
            };

            let attempt = self.next_attempt;
            self.next_attempt += 1;
            let Some(count) = self.registry.begin_attempt(&item_id, attempt) else {
                continue;
            };

            self.slots.insert(attempt, item_id.clone());
            debug!(item_id = %item_id, attempt = count, "admitted item");
            admitted.push(Admission {
                token: AttemptToken {
                    item_id,
                    epoch: self.epoch,
                    attempt,
                },
                attempt: count,
            });
        }
        admitted
    }

    /// Apply the result of an attempt and free its slot
    pub fn complete(&mut self, token: &AttemptToken, result: Result<(), WorkError>) -> Completion {
        let item_id = token.item_id.clone();
        if token.epoch != self.epoch {
            return Completion::Discarded { item_id };
        }

        self.slots.remove(&token.attempt);
        let retry = &self.retry;
        let settled = self
            .registry
            .end_attempt(&item_id, token.attempt, |item| match result {
                Ok(()) => {
                    item.last_error = None;
                    item.transition(ItemStatus::Completed);
                    Ok(())
                }
                Err(error) => Err((retry.on_failure(item, &error), error)),
            });
        let Some(settled) = settled else {
            return Completion::Discarded { item_id };
        };

        match settled {
            Ok(()) => Completion::Completed { item_id },
            Err((RetryDecision::Requeue { retry_count }, error)) => {
                self.registry.enqueue(&item_id);
                Completion::Retrying {
                    item_id,
                    retry_count,
                    error,
                }
            }
            Err((RetryDecision::Exhausted, error)) => Completion::Failed { item_id, error },
        }
    }

    /// Leave `Running` once nothing is pending or in flight.
    ///
    /// Returns `true` if this call drained the batch.
    pub fn settle(&mut self) -> bool {
        if self.phase != Phase::Running || !self.slots.is_empty() {
            return false;
        }
        if self.registry.count(ItemStatus::Pending) > 0 {
            return false;
        }
        self.phase = Phase::Idle;
        true
    }

    /// Reset every failed item and put it back in the pending pool
    pub fn retry_failed(&mut self) -> Vec<ItemId> {
        let failed = self.registry.ids_with_status(ItemStatus::Failed);
        failed
            .into_iter()
            .filter(|id| self.requeue_failed(id))
            .collect()
    }

    /// Reset a single failed item. Returns `false` if it is not `Failed`.
    pub fn retry_item(&mut self, id: &str) -> bool {
        self.requeue_failed(id)
    }

    /// Drop all items and slot accounting and return to `Idle`
    pub fn reset(&mut self) {
        self.registry.clear();
        self.slots.clear();
        self.epoch += 1;
        self.phase = Phase::Idle;
    }

    fn requeue_failed(&mut self, id: &str) -> bool {
        let retry = &self.retry;
        let reset = self.registry.update(id, |item| {
            if item.status != ItemStatus::Failed {
                return false;
            }
            retry.reset(item);
            true
        });
        reset == Some(true) && self.registry.enqueue(id)
    }
}
