//! In-memory task queue ordered by priority, FIFO within a priority.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::task::{ScheduledTask, TaskKey};

/// Ordered queue of scheduled tasks keyed by `(priority, sequence)`.
///
/// Unlike a binary heap this supports removing an arbitrary task in
/// O(log n), which cancellation and stale-result discarding both need.
/// A task's key is captured on insert; callers must not change a queued
/// task's priority.
#[derive(Debug, Default)]
pub(crate) struct OrderedQueue {
    tasks: BTreeMap<TaskKey, Arc<ScheduledTask>>,
}

impl OrderedQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, task: Arc<ScheduledTask>) {
        self.tasks.insert(task.key(), task);
    }

    /// Remove and return the most urgent task.
    pub(crate) fn pop(&mut self) -> Option<Arc<ScheduledTask>> {
        self.tasks.pop_first().map(|(_, task)| task)
    }

    /// Remove `task` if it is queued here. Returns whether it was.
    pub(crate) fn remove(&mut self, task: &Arc<ScheduledTask>) -> bool {
        let key = task.key();
        match self.tasks.get(&key) {
            Some(queued) if Arc::ptr_eq(queued, task) => {
                self.tasks.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Empty the queue, yielding tasks in order.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Arc<ScheduledTask>> {
        std::mem::take(&mut self.tasks).into_values()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}
