//! Batch controller
//!
//! Public facade over the scheduler. All registry and slot mutations happen
//! under one `parking_lot::Mutex`; work is spawned onto the Tokio runtime only
//! after the lock is released, and each finished attempt re-enters the lock to
//! record its outcome and admit the next items.

use super::events::{BatchEvent, ProgressSnapshot};
use super::handle::BatchHandle;
use super::registry::RegistrySnapshot;
use super::retry::RetryPolicy;
use super::scheduler::{Admission, AttemptToken, Completion, Phase, Scheduler, clamp_concurrency};
use super::stats::BatchStats;
use super::types::{ItemId, Priority, WorkItem};
use super::work::{WorkFn, run_attempt};
use crate::config::{BatchConfig, MAX_EVENT_CAPACITY};
use crate::utils::error::WorkError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Controller for one batch of work items.
///
/// Cheap to clone; clones share the same queue. Each controller instance owns
/// its own state, so independent batches never interfere.
#[derive(Clone)]
pub struct BatchController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    events: broadcast::Sender<BatchEvent>,
    progress: watch::Sender<ProgressSnapshot>,
    item_timeout: Option<Duration>,
    default_priority: Priority,
}

struct State {
    scheduler: Scheduler,
    worker: Option<Worker>,
}

/// Work function plus the runtime its attempts are spawned on
#[derive(Clone)]
struct Worker {
    work: Arc<dyn WorkFn>,
    runtime: Handle,
}

/// Attempts admitted under the lock, to be spawned after it is released
struct Dispatch {
    worker: Option<Worker>,
    admissions: Vec<Admission>,
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl std::fmt::Debug for BatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BatchController")
            .field("phase", &state.scheduler.phase())
            .field("concurrency", &state.scheduler.concurrency())
            .field("in_flight", &state.scheduler.in_flight())
            .field("items", &state.scheduler.registry().len())
            .finish()
    }
}

impl BatchController {
    pub fn new(config: BatchConfig) -> Self {
        let concurrency = clamp_concurrency(config.concurrency);
        if concurrency != config.concurrency {
            warn!(
                requested = config.concurrency,
                concurrency, "Concurrency out of range, clamping"
            );
        }

        let event_capacity = config.event_capacity.clamp(1, MAX_EVENT_CAPACITY);
        if event_capacity != config.event_capacity {
            warn!(
                requested = config.event_capacity,
                event_capacity, "Event capacity out of range, clamping"
            );
        }

        let scheduler = Scheduler::new(concurrency, RetryPolicy::new(config.max_retries));
        let (events, _) = broadcast::channel(event_capacity);
        let (progress, _) = watch::channel(ProgressSnapshot {
            concurrency,
            ..ProgressSnapshot::default()
        });

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    scheduler,
                    worker: None,
                }),
                events,
                progress,
                item_timeout: config.item_timeout(),
                default_priority: config.default_priority,
            }),
        }
    }

    /// Queue items as `Pending`. Duplicate IDs are ignored.
    ///
    /// Uses the configured default priority when `priority` is `None`.
    /// Returns the number of newly inserted items.
    pub fn add_to_queue<I, S>(&self, ids: I, priority: Option<Priority>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        let priority = priority.unwrap_or(self.inner.default_priority);
        let (added, dispatch) = {
            let mut state = self.inner.state.lock();
            let added = state.scheduler.add(ids.into_iter().map(Into::into), priority);
            for item_id in &added {
                self.inner.emit(BatchEvent::ItemQueued {
                    item_id: item_id.clone(),
                    priority,
                });
            }
            debug!(count = added.len(), %priority, "Queued items");
            (added.len(), advance(&self.inner, &mut state))
        };
        spawn_attempts(&self.inner, dispatch);
        added
    }

    /// Start admitting items with `work`, returning immediately.
    ///
    /// Calling `start` on a running batch swaps the work function used for
    /// future admissions.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<W: WorkFn>(&self, work: W) -> BatchHandle {
        self.start_shared(Arc::new(work))
    }

    /// Like [`start`](Self::start) for an already shared work function
    pub fn start_shared(&self, work: Arc<dyn WorkFn>) -> BatchHandle {
        let worker = Worker {
            work,
            runtime: Handle::current(),
        };
        let (dispatch, handle) = {
            let mut state = self.inner.state.lock();
            let dispatch = run(&self.inner, &mut state, worker);
            (dispatch, self.handle(&state))
        };
        spawn_attempts(&self.inner, dispatch);
        handle
    }

    /// Stop admitting new items. In-flight work finishes normally.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if state.scheduler.pause() {
            info!(in_flight = state.scheduler.in_flight(), "Batch paused");
            self.inner.emit(BatchEvent::BatchPaused);
            self.inner.publish(&state);
        }
    }

    /// Reset every failed item to `Pending` with a fresh retry budget and
    /// restart admission with `work`.
    ///
    /// If the batch is paused the items stay pending until the next `start`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn retry_failed<W: WorkFn>(&self, work: W) -> BatchHandle {
        self.retry_failed_shared(Arc::new(work))
    }

    /// Like [`retry_failed`](Self::retry_failed) for an already shared work function
    pub fn retry_failed_shared(&self, work: Arc<dyn WorkFn>) -> BatchHandle {
        let worker = Worker {
            work,
            runtime: Handle::current(),
        };
        let (dispatch, handle) = {
            let mut state = self.inner.state.lock();
            let requeued = state.scheduler.retry_failed();
            self.inner.emit_requeued(&state, &requeued);
            info!(count = requeued.len(), "Requeued failed items");

            let dispatch = if state.scheduler.phase() == Phase::Paused {
                self.inner.publish(&state);
                Dispatch::none()
            } else {
                run(&self.inner, &mut state, worker)
            };
            (dispatch, self.handle(&state))
        };
        spawn_attempts(&self.inner, dispatch);
        handle
    }

    /// Reset a single failed item. Returns `false` if the item is unknown or
    /// not `Failed`.
    ///
    /// The item is admitted right away if the batch is running.
    pub fn retry_item(&self, id: &str) -> bool {
        let dispatch = {
            let mut state = self.inner.state.lock();
            if !state.scheduler.retry_item(id) {
                return false;
            }
            self.inner.emit_requeued(&state, &[id.to_string()]);
            debug!(item_id = %id, "Requeued failed item");
            advance(&self.inner, &mut state)
        };
        spawn_attempts(&self.inner, dispatch);
        true
    }

    /// Remove an item regardless of status.
    ///
    /// A processing item keeps running and holds its slot until it returns;
    /// its result is ignored.
    pub fn remove_from_queue(&self, id: &str) -> bool {
        let dispatch = {
            let mut state = self.inner.state.lock();
            let Some(item) = state.scheduler.remove(id) else {
                return false;
            };
            debug!(item_id = %id, status = %item.status, "Removed item");
            self.inner.emit(BatchEvent::ItemRemoved {
                item_id: item.id,
                status: item.status,
            });
            advance(&self.inner, &mut state)
        };
        spawn_attempts(&self.inner, dispatch);
        true
    }

    /// Drop every item and stop running.
    ///
    /// In-flight work is not cancelled, but its results are discarded.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.scheduler.registry().len();
        state.scheduler.reset();
        state.worker = None;
        info!(dropped, "Batch cleared");
        self.inner.emit(BatchEvent::BatchCleared);
        self.inner.publish(&state);
    }

    /// Change the concurrency limit, clamped to `[1, 6]`.
    ///
    /// Increases take effect at the next admission opportunity; decreases
    /// never cancel running items. Returns the effective limit.
    pub fn set_concurrency(&self, requested: usize) -> usize {
        let mut state = self.inner.state.lock();
        let previous = state.scheduler.set_concurrency(requested);
        let current = state.scheduler.concurrency();
        if current != requested {
            warn!(requested, concurrency = current, "Concurrency out of range, clamping");
        }
        if current != previous {
            debug!(from = previous, to = current, "Concurrency changed");
            self.inner.emit(BatchEvent::ConcurrencyChanged {
                from: previous,
                to: current,
            });
            self.inner.publish(&state);
        }
        current
    }

    pub fn concurrency(&self) -> usize {
        self.inner.state.lock().scheduler.concurrency()
    }

    /// Whether new items are currently being admitted
    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().scheduler.phase()
    }

    pub fn get_stats(&self) -> BatchStats {
        self.inner.state.lock().scheduler.stats()
    }

    pub fn get_item(&self, id: &str) -> Option<WorkItem> {
        self.inner.state.lock().scheduler.get(id).cloned()
    }

    /// Consistent point-in-time view of every tracking set
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.state.lock().scheduler.snapshot()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.inner.events.subscribe()
    }

    /// Watch the latest stats, phase and slot usage
    pub fn watch_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.progress.subscribe()
    }

    fn handle(&self, state: &State) -> BatchHandle {
        BatchHandle::new(self.inner.progress.subscribe(), state.scheduler.epoch())
    }
}

impl Inner {
    fn emit(&self, event: BatchEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    fn emit_requeued(&self, state: &State, ids: &[ItemId]) {
        for item_id in ids {
            if let Some(item) = state.scheduler.get(item_id) {
                self.emit(BatchEvent::ItemQueued {
                    item_id: item_id.clone(),
                    priority: item.priority,
                });
            }
        }
    }

    fn publish(&self, state: &State) {
        let scheduler = &state.scheduler;
        self.progress.send_replace(ProgressSnapshot {
            stats: scheduler.stats(),
            phase: scheduler.phase(),
            concurrency: scheduler.concurrency(),
            in_flight: scheduler.in_flight(),
            generation: scheduler.epoch(),
        });
    }

    fn report(&self, completion: Completion) {
        match completion {
            Completion::Completed { item_id } => {
                debug!(item_id = %item_id, "Item completed");
                self.emit(BatchEvent::ItemCompleted { item_id });
            }
            Completion::Retrying {
                item_id,
                retry_count,
                error,
            } => {
                debug!(item_id = %item_id, retry_count, error = %error, "Item failed, retrying");
                self.emit(BatchEvent::ItemRetrying {
                    item_id,
                    retry_count,
                    error: error.to_string(),
                });
            }
            Completion::Failed { item_id, error } => {
                warn!(item_id = %item_id, error = %error, "Item failed, retries exhausted");
                self.emit(BatchEvent::ItemFailed {
                    item_id,
                    error: error.to_string(),
                });
            }
            Completion::Discarded { item_id } => {
                debug!(item_id = %item_id, "Ignoring result of removed or cleared item");
            }
        }
    }
}

impl Dispatch {
    fn none() -> Self {
        Self {
            worker: None,
            admissions: Vec::new(),
        }
    }
}

/// Install `worker`, enter `Running` and admit
fn run(inner: &Inner, state: &mut State, worker: Worker) -> Dispatch {
    state.worker = Some(worker);
    if state.scheduler.resume() != Phase::Running {
        let concurrency = state.scheduler.concurrency();
        info!(
            concurrency,
            pending = state.scheduler.stats().pending,
            "Batch started"
        );
        inner.emit(BatchEvent::BatchStarted { concurrency });
    }
    advance(inner, state)
}

/// Admit what fits, detect draining and publish the new state
fn advance(inner: &Inner, state: &mut State) -> Dispatch {
    let admissions = state.scheduler.admit();
    for admission in &admissions {
        inner.emit(BatchEvent::ItemStarted {
            item_id: admission.token.item_id.clone(),
            attempt: admission.attempt,
        });
    }

    if state.scheduler.settle() {
        let stats = state.scheduler.stats();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Batch drained"
        );
        inner.emit(BatchEvent::BatchDrained { stats });
    }
    inner.publish(state);

    let worker = if admissions.is_empty() {
        None
    } else {
        state.worker.clone()
    };
    Dispatch { worker, admissions }
}

fn spawn_attempts(inner: &Arc<Inner>, dispatch: Dispatch) {
    // Admission only happens while running, and running always has a worker
    let Some(worker) = dispatch.worker else {
        return;
    };

    for admission in dispatch.admissions {
        let inner = Arc::clone(inner);
        let work = Arc::clone(&worker.work);
        worker.runtime.spawn(async move {
            let token = admission.token;
            let result = run_attempt(work, token.item_id.clone(), inner.item_timeout).await;
            on_attempt_finished(&inner, token, result);
        });
    }
}

fn on_attempt_finished(inner: &Arc<Inner>, token: AttemptToken, result: Result<(), WorkError>) {
    let dispatch = {
        let mut state = inner.state.lock();
        let completion = state.scheduler.complete(&token, result);
        inner.report(completion);
        advance(inner, &mut state)
    };
    spawn_attempts(inner, dispatch);
}
