//! Scheduled task wrapper and its atomic lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use super::ItemRef;

/// Priority given to tasks whose result went stale mid-build so they drain
/// ahead of everything else.
pub const URGENT_PRIORITY: i32 = i32::MIN;

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Waiting in the ready queue (or the paused list).
    Pending = 0,
    /// Claimed by a worker; `build` is running.
    Processing = 1,
    /// Built; waiting for `apply` on the draining thread.
    Done = 2,
    /// Discarded; waiting for `release` on the draining thread.
    Release = 3,
    /// Rebuild requested mid-build; will be applied and then resubmitted.
    Reprocess = 4,
}

impl TaskState {
    const fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Pending,
            1 => Self::Processing,
            2 => Self::Done,
            3 => Self::Release,
            4 => Self::Reprocess,
            _ => unreachable!(),
        }
    }
}

/// Task state shared between the submitting thread and a worker.
///
/// Every transition that both sides race on goes through
/// [`transition`](Self::transition).
struct AtomicTaskState(AtomicU8);

impl AtomicTaskState {
    const fn new(state: TaskState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> TaskState {
        TaskState::from_tag(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Ordering key for ready and completion queues: priority, then sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TaskKey {
    priority: i32,
    sequence: u64,
}

/// Scheduler-owned wrapper around one submission of a work item.
pub(crate) struct ScheduledTask {
    sequence: u64,
    priority: AtomicI32,
    state: AtomicTaskState,
    item: ItemRef,
}

impl ScheduledTask {
    /// A fresh `Pending` task with the item's current priority.
    pub(crate) fn new(sequence: u64, item: ItemRef) -> Self {
        Self::with_state(sequence, TaskState::Pending, item)
    }

    pub(crate) fn with_state(sequence: u64, state: TaskState, item: ItemRef) -> Self {
        let priority = item.priority();
        Self {
            sequence,
            priority: AtomicI32::new(priority),
            state: AtomicTaskState::new(state),
            item,
        }
    }

    pub(crate) const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    pub(crate) fn key(&self) -> TaskKey {
        TaskKey {
            priority: self.priority(),
            sequence: self.sequence,
        }
    }

    pub(crate) const fn item(&self) -> &ItemRef {
        &self.item
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.load()
    }

    /// Re-read the item's priority. Only valid while the task sits in no
    /// ordered queue.
    pub(crate) fn reset_priority(&self) {
        self.priority.store(self.item.priority(), Ordering::Release);
    }

    pub(crate) fn boost(&self) {
        self.priority.store(URGENT_PRIORITY, Ordering::Release);
    }

    /// Worker claim: `Pending -> Processing`.
    pub(crate) fn mark_processing(&self) -> bool {
        self.state.transition(TaskState::Pending, TaskState::Processing)
    }

    /// Worker finish: `Processing -> Done`.
    pub(crate) fn mark_done(&self) -> bool {
        self.state.transition(TaskState::Processing, TaskState::Done)
    }

    /// Submitter: `Processing -> Reprocess`. Fails once the build finished.
    pub(crate) fn mark_for_reprocess(&self) -> bool {
        self.state.transition(TaskState::Processing, TaskState::Reprocess)
    }

    /// Submitter: force `Release` from any claimed state.
    pub(crate) fn mark_for_release(&self) {
        self.state.store(TaskState::Release);
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("sequence", &self.sequence)
            .field("priority", &self.priority())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
