//! Error handling for the batch engine
//!
//! This module defines the error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for the batch engine
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for the batch engine
#[derive(Error, Debug)]
pub enum BatchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Work function errors
    #[error("Work error: {0}")]
    Work(#[from] WorkError),
}

/// Failure of a single work-function attempt.
///
/// Never crosses the controller's public surface; the scheduler turns it into
/// a retry or a terminal `Failed` status and keeps the message on the item.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkError {
    /// The work function reported a failure
    #[error("{0}")]
    Failed(String),

    /// The attempt exceeded the configured per-item timeout
    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The work function panicked
    #[error("Work function panicked: {0}")]
    Panicked(String),
}

/// Helper functions for creating specific errors
impl BatchError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

impl WorkError {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed(message.into())
    }
}
