//! Batch engine and logging configuration validators
//!
//! Out-of-range concurrency is not rejected here; the controller clamps it
//! into `[1, 6]` and logs a warning.

use super::trait_def::Validate;
use crate::config::models::*;
use tracing_subscriber::EnvFilter;

impl Validate for BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.event_capacity == 0 {
            return Err("Event capacity must be greater than 0".to_string());
        }

        if self.event_capacity > MAX_EVENT_CAPACITY {
            return Err(format!(
                "Event capacity {} exceeds the maximum of {}",
                self.event_capacity, MAX_EVENT_CAPACITY
            ));
        }

        if self.item_timeout_ms == Some(0) {
            return Err("Item timeout must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.filter.trim().is_empty() {
            return Err("Log filter cannot be empty".to_string());
        }

        EnvFilter::try_new(&self.filter)
            .map_err(|e| format!("Invalid log filter '{}': {}", self.filter, e))?;

        Ok(())
    }
}
