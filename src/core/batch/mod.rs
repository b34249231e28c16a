//! Concurrency-bounded batch processing
//!
//! This module schedules per-item asynchronous work across a bounded number of
//! simultaneous workers, with tri-level priority ordering, bounded automatic
//! retry, pause/resume and live progress reporting.

mod controller;
mod events;
mod handle;
mod registry;
mod retry;
mod scheduler;
mod stats;
mod types;
mod work;


// Re-export all public types
pub use controller::BatchController;
pub use events::{BatchEvent, ProgressSnapshot};
pub use handle::{BatchHandle, BatchOutcome};
pub use registry::{Registry, RegistrySnapshot};
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::{
    Admission, AttemptToken, Completion, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY,
    Phase, Scheduler, clamp_concurrency,
};
pub use stats::BatchStats;
pub use types::{ItemId, ItemStatus, Priority, WorkItem, new_item_id};
pub use work::WorkFn;
