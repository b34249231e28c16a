//! Work item registry
//!
//! Single source of truth for which items exist and what state they are in.
//! The pending pool is one FIFO per priority class. Removing a pending item
//! drops its slot; per-status counts are maintained on every transition.

use super::types::{ItemId, ItemStatus, Priority, WorkItem};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Point-in-time view of registry membership
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Pending items in admission order
    pub pending: Vec<ItemId>,
    /// Items currently occupying a slot, in insertion order
    pub processing: Vec<ItemId>,
    /// Completed items, in insertion order
    pub completed: Vec<ItemId>,
    /// Terminally failed items, in insertion order
    pub failed: Vec<ItemId>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.pending.len() + self.processing.len() + self.completed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Entry {
    item: WorkItem,
    /// Insertion order, used for stable listings
    ordinal: u64,
    /// Sequence number of the live pending-queue slot
    queue_seq: Option<u64>,
    /// Sequence number of the live attempt
    attempt: Option<u64>,
}

#[derive(Debug)]
struct QueueSlot {
    seq: u64,
    id: ItemId,
}

/// Registry of work items and their pending pool
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<ItemId, Entry>,
    queues: [VecDeque<QueueSlot>; 3],
    /// Items per status, indexed by `status_index`
    counts: [usize; 4],
    next_seq: u64,
    next_ordinal: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert new pending items. Duplicate IDs are skipped.
    ///
    /// Returns the IDs that were actually inserted.
    pub fn add<I>(&mut self, ids: I, priority: Priority, max_retries: u32) -> Vec<ItemId>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let mut added = Vec::new();
        for id in ids {
            if self.entries.contains_key(&id) {
                debug!(item_id = %id, "ignoring duplicate item");
                continue;
            }

            let ordinal = self.next_ordinal;
            self.next_ordinal += 1;
            self.entries.insert(
                id.clone(),
                Entry {
                    item: WorkItem::new(id.clone(), priority, max_retries),
                    ordinal,
                    queue_seq: None,
                    attempt: None,
                },
            );
            self.counts[status_index(ItemStatus::Pending)] += 1;
            self.enqueue(&id);
            added.push(id);
        }
        added
    }

    /// Delete an item regardless of status
    pub fn remove(&mut self, id: &str) -> Option<WorkItem> {
        let entry = self.entries.remove(id)?;
        self.counts[status_index(entry.item.status)] -= 1;
        if let Some(seq) = entry.queue_seq {
            self.queues[entry.item.priority.queue_index()].retain(|slot| slot.seq != seq);
        }
        Some(entry.item)
    }

    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.entries.get(id).map(|entry| &entry.item)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all items in no particular order
    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.entries.values().map(|entry| &entry.item)
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.counts[status_index(status)]
    }

    /// IDs with the given status, in insertion order
    pub fn ids_with_status(&self, status: ItemStatus) -> Vec<ItemId> {
        let mut matching: Vec<&Entry> = self
            .entries
            .values()
            .filter(|entry| entry.item.status == status)
            .collect();
        matching.sort_by_key(|entry| entry.ordinal);
        matching.into_iter().map(|entry| entry.item.id.clone()).collect()
    }

    /// Pending IDs in the order they would be admitted
    pub fn pending_order(&self) -> Vec<ItemId> {
        self.queues
            .iter()
            .flat_map(|queue| queue.iter())
            .filter(|slot| self.is_live(slot))
            .map(|slot| slot.id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            pending: self.pending_order(),
            processing: self.ids_with_status(ItemStatus::Processing),
            completed: self.ids_with_status(ItemStatus::Completed),
            failed: self.ids_with_status(ItemStatus::Failed),
        }
    }

    /// Drop every item and queue slot
    pub fn clear(&mut self) {
        self.entries.clear();
        for queue in &mut self.queues {
            queue.clear();
        }
        self.counts = [0; 4];
    }

    /// Slots currently held in the pending queues, live or not
    #[cfg(test)]
    pub(crate) fn queued_slots(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Mutate an item in place, keeping the status counts in step
    pub(crate) fn update<F, R>(&mut self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut WorkItem) -> R,
    {
        let entry = self.entries.get_mut(id)?;
        let before = entry.item.status;
        let result = f(&mut entry.item);
        let after = entry.item.status;
        if before != after {
            self.counts[status_index(before)] -= 1;
            self.counts[status_index(after)] += 1;
        }
        Some(result)
    }

    /// Append a pending item to the back of its priority class
    pub(crate) fn enqueue(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if entry.item.status != ItemStatus::Pending {
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        entry.queue_seq = Some(seq);
        self.queues[entry.item.priority.queue_index()].push_back(QueueSlot {
            seq,
            id: id.to_string(),
        });
        true
    }

    /// Pop the next eligible pending item, highest class first
    pub(crate) fn take_next_pending(&mut self) -> Option<ItemId> {
        for index in 0..self.queues.len() {
            while let Some(slot) = self.queues[index].pop_front() {
                if !self.is_live(&slot) {
                    continue;
                }
                if let Some(entry) = self.entries.get_mut(&slot.id) {
                    entry.queue_seq = None;
                }
                return Some(slot.id);
            }
        }
        None
    }

    /// Move an item into Processing under the given attempt number.
    ///
    /// Returns the item's total attempt count.
    pub(crate) fn begin_attempt(&mut self, id: &str, attempt: u64) -> Option<u32> {
        let entry = self.entries.get_mut(id)?;
        if entry.item.status != ItemStatus::Pending {
            return None;
        }
        entry.attempt = Some(attempt);
        entry.queue_seq = None;
        entry.item.attempts += 1;
        entry.item.transition(ItemStatus::Processing);
        let attempts = entry.item.attempts;
        self.counts[status_index(ItemStatus::Pending)] -= 1;
        self.counts[status_index(ItemStatus::Processing)] += 1;
        Some(attempts)
    }

    /// Close the given attempt and apply `settle` to the item.
    ///
    /// Returns `None` without calling `settle` when the attempt is stale,
    /// i.e. the item was removed, re-added or already settled.
    pub(crate) fn end_attempt<F, R>(&mut self, id: &str, attempt: u64, settle: F) -> Option<R>
    where
        F: FnOnce(&mut WorkItem) -> R,
    {
        let entry = self.entries.get_mut(id)?;
        if entry.item.status != ItemStatus::Processing || entry.attempt != Some(attempt) {
            return None;
        }
        entry.attempt = None;
        self.update(id, settle)
    }

    fn is_live(&self, slot: &QueueSlot) -> bool {
        self.entries.get(&slot.id).is_some_and(|entry| {
            entry.item.status == ItemStatus::Pending && entry.queue_seq == Some(slot.seq)
        })
    }
}

fn status_index(status: ItemStatus) -> usize {
    match status {
        ItemStatus::Pending => 0,
        ItemStatus::Processing => 1,
        ItemStatus::Completed => 2,
        ItemStatus::Failed => 3,
    }
}
