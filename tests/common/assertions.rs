//! Custom test assertions
//!
//! Domain-specific invariant checks for controller state.

use imgbatch::{BatchController, ItemStatus};

/// Assertions for BatchController
pub trait ControllerAssertions {
    /// Assert counts partition the registry and match the snapshot
    fn assert_consistent(&self);

    /// Assert the item exists with the given status
    fn assert_status(&self, id: &str, status: ItemStatus);
}

impl ControllerAssertions for BatchController {
    fn assert_consistent(&self) {
        let stats = self.get_stats();
        assert_eq!(
            stats.pending + stats.processing + stats.completed + stats.failed,
            stats.total,
            "status counts do not sum to total: {:?}",
            stats
        );
        assert!(
            stats.processing <= self.concurrency(),
            "{} items processing with limit {}",
            stats.processing,
            self.concurrency()
        );

        let snapshot = self.snapshot();
        assert_eq!(snapshot.len(), stats.total);
        for id in &snapshot.failed {
            let item = self.get_item(id).expect("failed item is tracked");
            assert_eq!(item.retry_count, item.max_retries, "{} failed early", id);
        }
    }

    fn assert_status(&self, id: &str, status: ItemStatus) {
        let item = self
            .get_item(id)
            .unwrap_or_else(|| panic!("item {} is not tracked", id));
        assert_eq!(item.status, status, "unexpected status for {}", id);
    }
}

/// Assert two values are approximately equal (for floats)
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        assert_approx_eq!($left, $right, 1e-6_f64)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {
        let left_val: f64 = $left as f64;
        let right_val: f64 = $right as f64;
        let diff = (left_val - right_val).abs();
        assert!(
            diff < $epsilon,
            "assertion failed: `(left ~ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` (epsilon: `{:?}`)",
            left_val,
            right_val,
            diff,
            $epsilon
        );
    };
}
