//! Configuration data models
//!
//! This module defines the configuration structures used by the batch engine.

#![allow(missing_docs)]

pub mod batch;
pub mod logging;

// Re-export all configuration types
pub use batch::*;
pub use logging::*;

/// Default number of simultaneous work-function invocations
pub fn default_concurrency() -> usize {
    crate::core::batch::DEFAULT_CONCURRENCY
}

/// Default automatic retries per item
pub fn default_max_retries() -> u32 {
    2
}

/// Largest accepted broadcast buffer for batch events
pub const MAX_EVENT_CAPACITY: usize = 65_536;

/// Default broadcast buffer for batch events
pub fn default_event_capacity() -> usize {
    256
}

pub fn default_log_filter() -> String {
    "imgbatch=info".to_string()
}
