//! File inspector integration tests

#[cfg(test)]
mod tests {
    use crate::common::controller_with;
    use imgbatch::{BatchOutcome, FileInspector, ItemStatus, WorkFn};
    use std::fs;
    use tempfile::TempDir;

    fn sample_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("photo.jpg"), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        fs::write(dir.path().join("scan.pdf"), b"%PDF-1.7").unwrap();
        fs::write(dir.path().join("empty.png"), b"").unwrap();
        fs::create_dir(dir.path().join("album")).unwrap();
        dir
    }

    /// Readable non-empty files succeed
    #[tokio::test]
    async fn test_inspector_accepts_regular_files() {
        let dir = sample_dir();
        let inspector = FileInspector::new().with_root(dir.path());

        assert!(inspector.execute("photo.jpg").await.is_ok());
        assert!(inspector.execute("scan.pdf").await.is_ok());
    }

    /// Missing, empty and non-regular paths fail with a reason
    #[tokio::test]
    async fn test_inspector_rejects_bad_paths() {
        let dir = sample_dir();
        let inspector = FileInspector::new().with_root(dir.path());

        let error = inspector.execute("empty.png").await.unwrap_err();
        assert!(error.to_string().contains("is empty"));

        let error = inspector.execute("album").await.unwrap_err();
        assert!(error.to_string().contains("not a regular file"));

        let error = inspector.execute("missing.gif").await.unwrap_err();
        assert!(error.to_string().contains("Cannot stat"));
    }

    /// A batch of mixed files reports each outcome
    #[tokio::test]
    async fn test_inspector_batch() {
        let dir = sample_dir();
        let controller = controller_with(3, 1);
        controller.add_to_queue(["photo.jpg", "scan.pdf", "empty.png", "missing.gif"], None);

        let outcome = controller
            .start(FileInspector::new().with_root(dir.path()))
            .await;

        assert_eq!(outcome, BatchOutcome::Drained);
        let stats = controller.get_stats();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.progress, 50.0);

        let empty = controller.get_item("empty.png").unwrap();
        assert_eq!(empty.status, ItemStatus::Failed);
        assert_eq!(empty.attempts, 2);
    }

    /// Absolute paths work without a root
    #[tokio::test]
    async fn test_inspector_absolute_paths() {
        let dir = sample_dir();
        let path = dir.path().join("photo.jpg");

        let result = FileInspector::new()
            .execute(&path.to_string_lossy())
            .await;
        assert!(result.is_ok());
    }
}
