//! Completion handle returned by `start`

use super::events::ProgressSnapshot;
use super::scheduler::Phase;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::IntoFuture;
use tokio::sync::watch;

/// How a started batch stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    /// Nothing pending and nothing processing
    Drained,
    /// Paused, and every in-flight attempt has returned
    Paused,
    /// `clear` was called, or the controller was dropped
    Cleared,
}

/// Resolves once the batch it was created for stops running.
///
/// Awaiting the handle is optional; dropping it has no effect on the batch.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    progress: watch::Receiver<ProgressSnapshot>,
    generation: u64,
}

impl BatchHandle {
    pub(crate) fn new(progress: watch::Receiver<ProgressSnapshot>, generation: u64) -> Self {
        Self {
            progress,
            generation,
        }
    }

    /// Most recently published controller state
    pub fn latest(&self) -> ProgressSnapshot {
        self.progress.borrow().clone()
    }

    pub async fn wait(mut self) -> BatchOutcome {
        loop {
            {
                let snapshot = self.progress.borrow_and_update();
                if let Some(outcome) = outcome_of(&snapshot, self.generation) {
                    return outcome;
                }
            }

            if self.progress.changed().await.is_err() {
                return BatchOutcome::Cleared;
            }
        }
    }
}

fn outcome_of(snapshot: &ProgressSnapshot, generation: u64) -> Option<BatchOutcome> {
    if snapshot.generation != generation {
        return Some(BatchOutcome::Cleared);
    }
    if snapshot.in_flight > 0 {
        return None;
    }
    match snapshot.phase {
        Phase::Running => None,
        Phase::Paused => Some(BatchOutcome::Paused),
        Phase::Idle => Some(BatchOutcome::Drained),
    }
}

impl IntoFuture for BatchHandle {
    type Output = BatchOutcome;
    type IntoFuture = BoxFuture<'static, BatchOutcome>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}
