//! Background build scheduler with a two-phase build/apply protocol.
//!
//! A `WorkScheduler` owns a fixed pool of worker threads that build
//! [`WorkItem`]s in priority order. Finished items wait in a completion queue
//! until the consumer thread calls [`WorkScheduler::drain`], which applies or
//! releases them on that thread.
//!
//! # Task lifecycle
//!
//! ```text
//!             submit                worker claims           build returns
//!   (none) ──────────▶ Pending ─────────────────▶ Processing ──────────▶ Done ──▶ apply
//!                        │                            │
//!                 cancel │ (removed, no callbacks)    │ submit again
//!                        ▼                            ▼
//!                                                 Reprocess ──▶ apply, then submit
//!
//!   cancel after claim: any state ──▶ Release ──▶ release
//! ```
//!
//! Task state is the only point of arbitration between the submitting thread
//! and a worker, and every contested transition is a compare-and-exchange.
//! Queues sit behind short `parking_lot` critical sections; no lock is held
//! while item callbacks run.
//!
//! # Threading contract
//!
//! `drain` must not be called concurrently with itself. `submit`, `cancel`,
//! `pause` and `resume` are expected on the same consumer thread, or
//! otherwise externally synchronized.

mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::config::SchedulerConfig;
use crate::core::item::ItemKey;
use crate::core::task::ScheduledTask;
use crate::core::{ItemRef, SchedulerError, TaskState};
use crate::infra::queue::OrderedQueue;

/// Snapshot of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Items with a live task (queued, building, or awaiting drain).
    pub pending: usize,
    /// Tasks waiting in the ready queue.
    pub queued: usize,
    /// Tasks held back while paused.
    pub parked: usize,
    /// Completions waiting for `drain`.
    pub completed: usize,
    /// Builds currently running.
    pub active_builds: u64,
    /// Fresh tasks created by `submit`.
    pub submitted: u64,
    /// Builds that returned `Ok`.
    pub built: u64,
    /// Builds that returned an error or panicked.
    pub failed_builds: u64,
    /// `apply` calls made by `drain`.
    pub applied: u64,
    /// `release` calls made by `drain`.
    pub released: u64,
    /// Tasks removed before a worker claimed them.
    pub canceled: u64,
    /// Submissions coalesced into an in-flight build.
    pub reprocessed: u64,
}

/// Lifetime counters (lock-free atomics).
#[derive(Debug, Default)]
struct SchedulerCounters {
    active_builds: AtomicU64,
    submitted: AtomicU64,
    built: AtomicU64,
    failed_builds: AtomicU64,
    applied: AtomicU64,
    released: AtomicU64,
    canceled: AtomicU64,
    reprocessed: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Ready queue plus the shutdown flag workers check while waiting on it.
#[derive(Debug, Default)]
struct ReadyState {
    queue: OrderedQueue,
    shutdown: bool,
}

/// Pause depth and the tasks held back while it is non-zero.
#[derive(Debug, Default)]
struct PauseState {
    depth: usize,
    parked: Vec<Arc<ScheduledTask>>,
}

/// State shared between the scheduler handle and its workers.
#[derive(Debug)]
struct Shared {
    name: String,
    /// One live task per item.
    pending: RwLock<HashMap<ItemKey, Arc<ScheduledTask>>>,
    /// Lock order: `pause` before `ready`.
    pause: Mutex<PauseState>,
    ready: Mutex<ReadyState>,
    ready_signal: Condvar,
    completed: Mutex<OrderedQueue>,
    sequence: AtomicU64,
    shutdown: AtomicBool,
    counters: SchedulerCounters,
}

impl Shared {
    fn new(name: String) -> Self {
        Self {
            name,
            pending: RwLock::new(HashMap::new()),
            pause: Mutex::new(PauseState::default()),
            ready: Mutex::new(ReadyState::default()),
            ready_signal: Condvar::new(),
            completed: Mutex::new(OrderedQueue::new()),
            sequence: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            counters: SchedulerCounters::default(),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn submit(&self, item: &ItemRef) {
        let key = ItemKey::of(item);
        let existing = self.pending.read().get(&key).cloned();

        if let Some(task) = existing {
            match task.state() {
                TaskState::Pending => {
                    trace!(scheduler = %self.name, sequence = task.sequence(), "already pending");
                    return;
                }
                // Already coalesced; drain resubmits it after applying.
                TaskState::Reprocess => {
                    trace!(scheduler = %self.name, sequence = task.sequence(), "already marked for reprocess");
                    return;
                }
                // Canceled: its release still has to reach drain, so leave the
                // completion queued and start a fresh task alongside it.
                TaskState::Release => {
                    trace!(scheduler = %self.name, sequence = task.sequence(), "replacing canceled task");
                }
                TaskState::Processing | TaskState::Done => {
                    if task.mark_for_reprocess() {
                        bump(&self.counters.reprocessed);
                        trace!(scheduler = %self.name, sequence = task.sequence(), "marked for reprocess");
                        return;
                    }
                    // Built and waiting for drain: the result is stale, so
                    // drop it and start over.
                    if task.state() == TaskState::Done && self.completed.lock().remove(&task) {
                        trace!(scheduler = %self.name, sequence = task.sequence(), "discarded stale completion");
                    }
                }
            }
        }

        // Register before scheduling so a worker never finishes a task the
        // map does not know about.
        let task = Arc::new(ScheduledTask::new(self.next_sequence(), Arc::clone(item)));
        self.pending.write().insert(key, Arc::clone(&task));
        bump(&self.counters.submitted);
        self.schedule(task);
    }

    fn schedule(&self, task: Arc<ScheduledTask>) {
        let mut pause = self.pause.lock();
        if pause.depth > 0 {
            trace!(scheduler = %self.name, sequence = task.sequence(), "adding to paused items");
            pause.parked.push(task);
            return;
        }
        trace!(
            scheduler = %self.name,
            sequence = task.sequence(),
            priority = task.priority(),
            "queued for build"
        );
        self.ready.lock().queue.push(task);
        self.ready_signal.notify_one();
    }

    /// Pull a task that no worker has claimed yet out of the ready queue or
    /// the paused list.
    fn unschedule(&self, task: &Arc<ScheduledTask>) -> bool {
        let mut pause = self.pause.lock();
        if pause.depth > 0 {
            match pause.parked.iter().position(|t| Arc::ptr_eq(t, task)) {
                Some(idx) => {
                    pause.parked.remove(idx);
                    true
                }
                None => false,
            }
        } else {
            self.ready.lock().queue.remove(task)
        }
    }

    /// Drop the pending-map entry for `task`, unless a fresh task for the
    /// same item has replaced it.
    fn forget(&self, task: &Arc<ScheduledTask>) {
        let key = ItemKey::of(task.item());
        let mut pending = self.pending.write();
        if pending.get(&key).is_some_and(|live| Arc::ptr_eq(live, task)) {
            pending.remove(&key);
        }
    }

    fn complete(&self, task: Arc<ScheduledTask>) {
        trace!(
            scheduler = %self.name,
            sequence = task.sequence(),
            state = ?task.state(),
            "build complete"
        );
        self.completed.lock().push(task);
    }
}

/// Priority-ordered, pausable background build scheduler.
///
/// See the [module documentation](self) for the task lifecycle.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = WorkScheduler::with_pool_size("trees", 2)?;
/// scheduler.submit(&tree)?;
///
/// // every frame
/// scheduler.drain(10)?;
/// ```
#[derive(Debug)]
pub struct WorkScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl WorkScheduler {
    /// Create a scheduler and spawn its worker threads.
    ///
    /// Workers are named `"{name}[worker-{i}]"`.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if the configuration is invalid
    /// - `SchedulerError::Spawn` if a worker thread cannot be started
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let shared = Arc::new(Shared::new(config.name.clone()));
        let mut workers = Vec::with_capacity(config.pool_size);
        for worker_id in 0..config.pool_size {
            match worker::spawn_worker(worker_id, Arc::clone(&shared), config.thread_stack_size) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Release the workers already started.
                    shared.shutdown.store(true, Ordering::Release);
                    shared.ready.lock().shutdown = true;
                    shared.ready_signal.notify_all();
                    return Err(SchedulerError::Spawn(e.to_string()));
                }
            }
        }

        info!(
            scheduler = %config.name,
            pool_size = config.pool_size,
            "WorkScheduler initialized"
        );

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_count: config.pool_size,
        })
    }

    /// Create a scheduler with default settings apart from name and pool size.
    ///
    /// # Errors
    ///
    /// Same as [`WorkScheduler::new`].
    pub fn with_pool_size(name: impl Into<String>, pool_size: usize) -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::new().with_name(name).with_pool_size(pool_size))
    }

    /// Scheduler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Request a build of `item`.
    ///
    /// - Not scheduled: a new task is queued (or parked while paused).
    /// - Queued but not started: no-op.
    /// - Building: the running build is marked stale; once it has been
    ///   applied the item is built again.
    /// - Built but not yet drained: the stale result is discarded and the
    ///   item is queued afresh.
    ///
    /// # Errors
    ///
    /// `SchedulerError::ShutDown` after [`shutdown`](Self::shutdown).
    pub fn submit(&self, item: &ItemRef) -> Result<(), SchedulerError> {
        if self.shared.is_shut_down() {
            return Err(SchedulerError::ShutDown);
        }
        self.shared.submit(item);
        Ok(())
    }

    /// Withdraw `item` from the scheduler.
    ///
    /// - Unknown (long since drained): `release` is queued and called during
    ///   a future `drain`.
    /// - Not yet claimed by a worker: removed; no callbacks fire.
    /// - Claimed: the build runs to completion, then `release` is called
    ///   instead of `apply`. `release` is never called twice.
    pub fn cancel(&self, item: &ItemRef) {
        let shared = &self.shared;
        let key = ItemKey::of(item);
        let existing = shared.pending.read().get(&key).cloned();

        let Some(task) = existing else {
            debug!(scheduler = %shared.name, "queueing for later release");
            let task = ScheduledTask::with_state(
                shared.next_sequence(),
                TaskState::Release,
                Arc::clone(item),
            );
            shared.completed.lock().push(Arc::new(task));
            return;
        };

        if shared.unschedule(&task) {
            shared.forget(&task);
            bump(&shared.counters.canceled);
            debug!(scheduler = %shared.name, sequence = task.sequence(), "canceled before build");
            return;
        }

        debug!(scheduler = %shared.name, sequence = task.sequence(), "marking for release");
        task.mark_for_release();
    }

    /// Stop handing queued tasks to workers. Builds already claimed keep
    /// running. Calls nest: each `pause` needs a matching `resume`.
    pub fn pause(&self) {
        let shared = &self.shared;
        let mut pause = shared.pause.lock();
        pause.depth += 1;
        if pause.depth > 1 {
            trace!(scheduler = %shared.name, depth = pause.depth, "already paused");
            return;
        }

        let mut ready = shared.ready.lock();
        pause.parked.extend(ready.queue.drain());
        debug!(scheduler = %shared.name, parked = pause.parked.len(), "paused");
    }

    /// Undo one [`pause`](Self::pause).
    ///
    /// When the last pause is lifted, parked tasks re-read their items'
    /// priorities and are queued in `(priority, sequence)` order.
    ///
    /// # Errors
    ///
    /// `SchedulerError::ResumeWithoutPause` if the scheduler is not paused.
    pub fn resume(&self) -> Result<(), SchedulerError> {
        let shared = &self.shared;
        let mut pause = shared.pause.lock();
        if pause.depth == 0 {
            return Err(SchedulerError::ResumeWithoutPause);
        }
        pause.depth -= 1;
        if pause.depth > 0 {
            trace!(scheduler = %shared.name, depth = pause.depth, "pauses remain");
            return Ok(());
        }

        let mut parked = std::mem::take(&mut pause.parked);
        for task in &parked {
            task.reset_priority();
        }
        parked.sort_by_key(|task| task.key());

        debug!(scheduler = %shared.name, resumed = parked.len(), "resumed");
        if parked.is_empty() {
            return Ok(());
        }
        let mut ready = shared.ready.lock();
        for task in parked {
            ready.queue.push(task);
        }
        drop(ready);
        shared.ready_signal.notify_all();
        Ok(())
    }

    /// Whether at least one `pause` is outstanding.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.pause.lock().depth > 0
    }

    /// Apply or release up to `max_items` completed tasks on this thread, in
    /// `(priority, sequence)` order.
    ///
    /// Returns how many completions are still waiting, so callers can tell
    /// when they are falling behind.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidCompletionState` if a completed task is found
    /// in a state that cannot complete. The completion queue is corrupted at
    /// that point and the scheduler should not be used further.
    pub fn drain(&self, max_items: usize) -> Result<usize, SchedulerError> {
        let shared = &self.shared;
        let (batch, remaining) = {
            let mut completed = shared.completed.lock();
            let batch: Vec<_> = std::iter::from_fn(|| completed.pop()).take(max_items).collect();
            (batch, completed.len())
        };

        let mut batch = batch.into_iter();
        while let Some(task) = batch.next() {
            shared.forget(&task);
            let state = task.state();
            trace!(scheduler = %shared.name, sequence = task.sequence(), ?state, "applying updates");
            match state {
                TaskState::Done => {
                    task.item().apply();
                    bump(&shared.counters.applied);
                }
                TaskState::Release => {
                    task.item().release();
                    bump(&shared.counters.released);
                }
                TaskState::Reprocess => {
                    task.item().apply();
                    bump(&shared.counters.applied);
                    if shared.is_shut_down() {
                        warn!(scheduler = %shared.name, sequence = task.sequence(), "shut down; dropping reprocess");
                    } else {
                        shared.submit(task.item());
                    }
                }
                TaskState::Pending | TaskState::Processing => {
                    // Hand the rest of the batch back so it is not lost.
                    let mut completed = shared.completed.lock();
                    for rest in batch {
                        completed.push(rest);
                    }
                    return Err(SchedulerError::InvalidCompletionState {
                        sequence: task.sequence(),
                        state,
                    });
                }
            }
        }
        Ok(remaining)
    }

    /// Number of items with a live task: queued, building, or awaiting drain.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.read().len()
    }

    /// Current scheduler statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let shared = &self.shared;
        let counters = &shared.counters;
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        // One guard at a time.
        let pending = shared.pending.read().len();
        let parked = shared.pause.lock().parked.len();
        let queued = shared.ready.lock().queue.len();
        let completed = shared.completed.lock().len();
        SchedulerStats {
            worker_count: self.worker_count,
            pending,
            queued,
            parked,
            completed,
            active_builds: load(&counters.active_builds),
            submitted: load(&counters.submitted),
            built: load(&counters.built),
            failed_builds: load(&counters.failed_builds),
            applied: load(&counters.applied),
            released: load(&counters.released),
            canceled: load(&counters.canceled),
            reprocessed: load(&counters.reprocessed),
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    /// Stop all workers. Idempotent; the scheduler cannot be restarted.
    ///
    /// Queued and paused tasks are discarded without callbacks. Builds in
    /// progress run to completion and their workers then exit; their
    /// completions, and any produced earlier, can still be drained. Worker
    /// threads are detached rather than joined so a hung build cannot block
    /// the caller.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        if shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(scheduler = %shared.name, "Shutting down scheduler");

        let discarded: Vec<_> = {
            let mut pause = shared.pause.lock();
            let mut ready = shared.ready.lock();
            ready.shutdown = true;
            let mut discarded: Vec<_> = ready.queue.drain().collect();
            discarded.append(&mut pause.parked);
            discarded
        };
        shared.ready_signal.notify_all();

        for task in &discarded {
            shared.forget(task);
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        info!(
            scheduler = %shared.name,
            worker_count = workers.len(),
            discarded = discarded.len(),
            "Scheduler shut down; workers detached"
        );
    }
}

impl Drop for WorkScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
