//! Event stream tests
//!
//! Events are emitted under the controller lock, so a subscriber sees them in
//! the exact order the state changed.

#[cfg(test)]
mod tests {
    use crate::common::{ScriptedWork, controller_with};
    use imgbatch::{BatchEvent, BatchOutcome, Phase, Priority};
    use tokio::sync::broadcast::Receiver;

    fn drain(events: &mut Receiver<BatchEvent>) -> Vec<BatchEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    /// A single successful item produces the full lifecycle in order
    #[tokio::test]
    async fn test_success_event_sequence() {
        let controller = controller_with(1, 2);
        let mut events = controller.subscribe();
        controller.add_to_queue(["a"], Some(Priority::High));

        controller.start(ScriptedWork::new()).await;

        let seen = drain(&mut events);
        assert_eq!(seen.len(), 5, "{:?}", seen);
        assert_eq!(
            seen[0],
            BatchEvent::ItemQueued {
                item_id: "a".to_string(),
                priority: Priority::High
            }
        );
        assert_eq!(seen[1], BatchEvent::BatchStarted { concurrency: 1 });
        assert_eq!(
            seen[2],
            BatchEvent::ItemStarted {
                item_id: "a".to_string(),
                attempt: 1
            }
        );
        assert_eq!(
            seen[3],
            BatchEvent::ItemCompleted {
                item_id: "a".to_string()
            }
        );
        match &seen[4] {
            BatchEvent::BatchDrained { stats } => {
                assert_eq!(stats.completed, 1);
                assert_eq!(stats.total, 1);
            }
            other => panic!("expected BatchDrained, got {:?}", other),
        }
    }

    /// A transient failure emits a retry before the next attempt
    #[tokio::test]
    async fn test_retry_event_sequence() {
        let controller = controller_with(1, 2);
        let mut events = controller.subscribe();
        controller.add_to_queue(["a"], None);

        controller.start(ScriptedWork::new().flaky("a", 1)).await;

        let item_events: Vec<BatchEvent> = drain(&mut events)
            .into_iter()
            .filter(|event| event.item_id().is_some())
            .collect();
        assert_eq!(item_events.len(), 5, "{:?}", item_events);
        assert!(matches!(item_events[1], BatchEvent::ItemStarted { attempt: 1, .. }));
        assert!(matches!(
            &item_events[2],
            BatchEvent::ItemRetrying { retry_count: 1, error, .. } if error == "flaky attempt 1"
        ));
        assert!(matches!(item_events[3], BatchEvent::ItemStarted { attempt: 2, .. }));
        assert!(matches!(item_events[4], BatchEvent::ItemCompleted { .. }));
    }

    /// Replaying the event stream never shows more items in flight than allowed
    #[tokio::test]
    async fn test_event_stream_respects_limit() {
        let controller = controller_with(3, 1);
        let mut events = controller.subscribe();
        let ids: Vec<String> = (0..12).map(|i| format!("img-{}", i)).collect();
        controller.add_to_queue(ids, None);

        let work = ScriptedWork::new().with_delay(3).failing(&["img-4", "img-9"]);
        assert_eq!(controller.start(work).await, BatchOutcome::Drained);

        let mut in_flight: i64 = 0;
        let mut peak = 0;
        let mut completed = 0;
        for event in drain(&mut events) {
            match event {
                BatchEvent::ItemStarted { .. } => in_flight += 1,
                BatchEvent::ItemCompleted { .. } => {
                    in_flight -= 1;
                    completed += 1;
                }
                BatchEvent::ItemRetrying { .. } | BatchEvent::ItemFailed { .. } => in_flight -= 1,
                _ => {}
            }
            assert!((0..=3).contains(&in_flight), "in flight: {}", in_flight);
            peak = peak.max(in_flight);
        }
        assert_eq!(in_flight, 0);
        assert_eq!(peak, 3);
        assert_eq!(completed, 10);
    }

    /// Completed counts seen through the watch channel never go down
    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let controller = controller_with(2, 0);
        let mut progress = controller.watch_progress();
        let ids: Vec<String> = (0..8).map(|i| format!("page-{}", i)).collect();
        controller.add_to_queue(ids, None);

        let watcher = tokio::spawn(async move {
            let mut observed = Vec::new();
            while progress.changed().await.is_ok() {
                let snapshot = progress.borrow_and_update().clone();
                observed.push(snapshot.stats.progress);
                if snapshot.stats.total > 0 && snapshot.stats.completed == snapshot.stats.total {
                    break;
                }
            }
            observed
        });

        controller.start(ScriptedWork::new().with_delay(2)).await;
        let observed = watcher.await.unwrap();

        assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", observed);
        assert_eq!(observed.last().copied(), Some(100.0));
    }

    /// Control operations announce themselves
    #[tokio::test]
    async fn test_control_events() {
        let controller = controller_with(2, 2);
        let mut events = controller.subscribe();
        controller.add_to_queue(["a", "b"], None);

        assert_eq!(controller.set_concurrency(4), 4);
        assert_eq!(controller.set_concurrency(4), 4);
        controller.remove_from_queue("b");
        controller.clear();

        let seen = drain(&mut events);
        assert_eq!(
            seen[2..].to_vec(),
            vec![
                BatchEvent::ConcurrencyChanged { from: 2, to: 4 },
                BatchEvent::ItemRemoved {
                    item_id: "b".to_string(),
                    status: imgbatch::ItemStatus::Pending
                },
                BatchEvent::BatchCleared,
            ]
        );
    }

    /// The final published snapshot reflects a drained batch
    #[tokio::test]
    async fn test_final_snapshot() {
        let controller = controller_with(2, 2);
        controller.add_to_queue(["a", "b", "c"], None);

        let handle = controller.start(ScriptedWork::new());
        assert_eq!(handle.latest().phase, Phase::Running);
        assert_eq!(handle.clone().await, BatchOutcome::Drained);

        let snapshot = handle.latest();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.concurrency, 2);
        assert_eq!(snapshot.stats.completed, 3);
        assert_eq!(snapshot.stats, controller.get_stats());
    }
}
