//! Configuration management for the batch engine
//!
//! This module handles loading and validation of engine and logging configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Batch engine configuration
    #[serde(default)]
    pub batch: BatchConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BatchError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| BatchError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from `IMGBATCH_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("Loading configuration from environment variables");

        let mut logging = LoggingConfig::default();
        if let Some(filter) = lookup("IMGBATCH_LOG") {
            logging.filter = filter;
        }
        if let Some(json) = lookup("IMGBATCH_LOG_JSON") {
            logging.json = matches!(json.trim(), "1" | "true" | "yes");
        }

        let config = Self {
            batch: BatchConfig::from_lookup(&lookup)?,
            logging,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.batch
            .validate()
            .map_err(|e| BatchError::Config(format!("Batch config error: {}", e)))?;

        self.logging
            .validate()
            .map_err(|e| BatchError::Config(format!("Logging config error: {}", e)))?;

        Ok(())
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
