//! # imgbatch
//!
//! Concurrency-bounded batch engine for per-file asynchronous operations.
//!
//! ## Features
//!
//! - **Bounded concurrency**: at most `concurrency` items (1 to 6) run at once
//! - **Priority ordering**: high, normal and low classes, FIFO within a class
//! - **Bounded retry**: failed attempts are requeued up to `max_retries` times
//! - **Pause, resume and retry-failed** without cancelling in-flight work
//! - **Live progress**: pull-based stats plus broadcast events and a watch channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgbatch::{BatchConfig, BatchController, BatchOutcome, Priority};
//!
//! #[tokio::main]
//! async fn main() {
//!     let controller = BatchController::new(BatchConfig::default().with_concurrency(2));
//!     controller.add_to_queue(["a.jpg", "b.jpg"], None);
//!     controller.add_to_queue(["cover.png"], Some(Priority::High));
//!
//!     let handle = controller.start(|id: String| async move {
//!         println!("processing {}", id);
//!         Ok::<(), String>(())
//!     });
//!
//!     assert_eq!(handle.await, BatchOutcome::Drained);
//!     assert_eq!(controller.get_stats().progress, 100.0);
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use crate::config::{BatchConfig, Config, LoggingConfig};
pub use crate::core::batch::{
    BatchController, BatchEvent, BatchHandle, BatchOutcome, BatchStats, ItemId, ItemStatus, Phase,
    Priority, ProgressSnapshot, RegistrySnapshot, WorkFn, WorkItem, new_item_id,
};
pub use crate::core::inspect::FileInspector;
pub use crate::utils::error::{BatchError, Result, WorkError};
