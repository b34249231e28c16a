//! Configuration integration tests
//!
//! Loads configuration the way the binary does and checks that the
//! controller honours it.

#[cfg(test)]
mod tests {
    use crate::common::ScriptedWork;
    use imgbatch::{BatchConfig, BatchController, BatchError, BatchOutcome, Config, Priority};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// Values from a YAML file drive the controller
    #[tokio::test]
    async fn test_controller_from_file_config() {
        let file = write_config(
            r#"
batch:
  concurrency: 1
  max_retries: 0
  default_priority: low
"#,
        );
        let config = Config::from_file(file.path()).await.unwrap();
        let controller = BatchController::new(config.batch);
        assert_eq!(controller.concurrency(), 1);

        controller.add_to_queue(["a", "b"], None);
        controller.add_to_queue(["c"], Some(Priority::Normal));
        assert_eq!(controller.get_item("a").unwrap().priority, Priority::Low);
        assert_eq!(controller.get_item("a").unwrap().max_retries, 0);

        let work = ScriptedWork::new().failing(&["b"]);
        assert_eq!(controller.start(work.clone()).await, BatchOutcome::Drained);
        assert_eq!(work.started(), vec!["c", "a", "b"]);
        assert_eq!(work.peak(), 1);
        assert_eq!(controller.get_stats().failed, 1);
    }

    /// An empty file yields the defaults
    #[tokio::test]
    async fn test_empty_config_file_uses_defaults() {
        let file = write_config("{}\n");
        let config = Config::from_file(file.path()).await.unwrap();
        assert_eq!(config, Config::default());
    }

    /// Out-of-range concurrency loads fine and is clamped by the controller
    #[tokio::test]
    async fn test_out_of_range_concurrency_is_clamped() {
        let file = write_config("batch:\n  concurrency: 12\n");
        let config = Config::from_file(file.path()).await.unwrap();
        assert_eq!(config.batch.concurrency, 12);

        let controller = BatchController::new(config.batch);
        assert_eq!(controller.concurrency(), 6);
    }

    /// Malformed YAML and invalid values are configuration errors
    #[tokio::test]
    async fn test_invalid_config_files() {
        let file = write_config("batch: [not, a, map]\n");
        let result = Config::from_file(file.path()).await;
        assert!(matches!(result, Err(BatchError::Config(_))));

        let file = write_config("batch:\n  default_priority: urgent\n");
        assert!(Config::from_file(file.path()).await.is_err());

        let file = write_config("logging:\n  filter: \"\"\n");
        let error = Config::from_file(file.path()).await.unwrap_err();
        assert!(error.to_string().contains("Logging config error"));
    }

    /// Environment-style lookups override defaults
    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(|key| match key {
            "IMGBATCH_CONCURRENCY" => Some("5".to_string()),
            "IMGBATCH_ITEM_TIMEOUT_MS" => Some("250".to_string()),
            "IMGBATCH_EVENT_CAPACITY" => Some("32".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.batch.concurrency, 5);
        assert_eq!(config.batch.item_timeout_ms, Some(250));
        assert_eq!(config.batch.event_capacity, 32);
        assert_eq!(config.batch.max_retries, 2);

        let result = Config::from_lookup(|key| {
            (key == "IMGBATCH_EVENT_CAPACITY").then(|| "0".to_string())
        });
        assert!(matches!(result, Err(BatchError::Config(_))));
    }

    /// An oversized event buffer is rejected at load time
    #[test]
    fn test_oversized_event_capacity_is_rejected() {
        let result = Config::from_lookup(|key| {
            (key == "IMGBATCH_EVENT_CAPACITY").then(|| usize::MAX.to_string())
        });
        assert!(matches!(result, Err(BatchError::Config(_))));
    }

    /// A controller built from an unvalidated config clamps the event buffer
    #[tokio::test]
    async fn test_controller_clamps_event_capacity() {
        let controller = BatchController::new(BatchConfig::default().with_event_capacity(usize::MAX));
        let mut events = controller.subscribe();

        controller.add_to_queue(["a"], None);
        assert_eq!(controller.start(ScriptedWork::new()).await, BatchOutcome::Drained);
        assert!(events.try_recv().is_ok());
        assert_eq!(controller.get_stats().completed, 1);
    }
}
