//! Batch engine configuration

use super::*;
use crate::core::batch::Priority;
use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Batch engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Simultaneous work-function invocations, clamped to [1, 6]
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Automatic retries before an item is parked as failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Priority used when `add_to_queue` is given none
    #[serde(default)]
    pub default_priority: Priority,
    /// Per-attempt timeout in milliseconds
    #[serde(default)]
    pub item_timeout_ms: Option<u64>,
    /// Event broadcast buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            default_priority: Priority::default(),
            item_timeout_ms: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Set timeout per attempt
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_ms.map(Duration::from_millis)
    }

    /// Read `IMGBATCH_*` overrides through `lookup`, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("IMGBATCH_CONCURRENCY") {
            config.concurrency = parse_var("IMGBATCH_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("IMGBATCH_MAX_RETRIES") {
            config.max_retries = parse_var("IMGBATCH_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("IMGBATCH_DEFAULT_PRIORITY") {
            config.default_priority = Priority::from_str(&value)
                .map_err(|e| BatchError::Config(format!("IMGBATCH_DEFAULT_PRIORITY: {}", e)))?;
        }
        if let Some(value) = lookup("IMGBATCH_ITEM_TIMEOUT_MS") {
            config.item_timeout_ms = Some(parse_var("IMGBATCH_ITEM_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = lookup("IMGBATCH_EVENT_CAPACITY") {
            config.event_capacity = parse_var("IMGBATCH_EVENT_CAPACITY", &value)?;
        }

        Ok(config)
    }

    /// Load overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BatchError::Config(format!("Invalid value '{}' for {}: {}", value, key, e)))
}
