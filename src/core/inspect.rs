//! File inspection work function
//!
//! Stand-in for the real per-file image operations: each item ID is treated
//! as a filesystem path, and the attempt succeeds if the file can be read and
//! is non-empty.

use crate::core::batch::WorkFn;
use crate::utils::error::WorkError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Reads each queued file, failing on missing, non-regular or empty files
#[derive(Debug, Clone, Default)]
pub struct FileInspector {
    /// Directory relative item IDs are resolved against
    root: Option<PathBuf>,
}

impl FileInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative item IDs against `root`
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn resolve(&self, item_id: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(item_id),
            None => PathBuf::from(item_id),
        }
    }
}

#[async_trait]
impl WorkFn for FileInspector {
    async fn execute(&self, item_id: &str) -> Result<(), WorkError> {
        let path = self.resolve(item_id);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| WorkError::failed(format!("Cannot stat {}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(WorkError::failed(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| WorkError::failed(format!("Cannot read {}: {}", path.display(), e)))?;
        if bytes.is_empty() {
            return Err(WorkError::failed(format!("{} is empty", path.display())));
        }

        debug!(path = %path.display(), size = bytes.len(), "Inspected file");
        Ok(())
    }
}
