//! Single-slot handoff and change tracking for work items.
//!
//! A [`Handoff`] is the mailbox a work item's `build` publishes into and its
//! `apply` takes from. It holds at most one value: publishing again before
//! the applier has taken the previous result replaces it, since only the
//! latest build matters.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

/// One-item mailbox safely published by a builder thread and consumed at
/// most once by the applier thread.
#[derive(Debug)]
pub struct Handoff<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Handoff<T> {
    /// Create an empty handoff slot.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Publish a value, replacing any value not yet taken.
    ///
    /// Returns the displaced value, if any. Intended for one publisher at a
    /// time, which the scheduler guarantees for a single work item.
    pub fn publish(&self, mut value: T) -> Option<T> {
        let mut displaced = None;
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return displaced,
                Err(TrySendError::Full(rejected)) => {
                    value = rejected;
                    if let Ok(stale) = self.rx.try_recv() {
                        displaced = Some(stale);
                    }
                }
                // Both ends live in `self`, so the channel never disconnects.
                Err(TrySendError::Disconnected(_)) => return displaced,
            }
        }
    }

    /// Take the published value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Whether a value is waiting to be taken.
    #[must_use]
    pub fn has_value(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts changes made to an item's inputs since its last build.
///
/// Starts dirty so the first build always runs.
#[derive(Debug)]
pub struct ChangeTracker {
    changes: AtomicU64,
}

impl ChangeTracker {
    /// Create a tracker with one outstanding change.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            changes: AtomicU64::new(1),
        }
    }

    /// Record that the item's inputs changed.
    pub fn mark_changed(&self) {
        self.changes.fetch_add(1, Ordering::AcqRel);
    }

    /// Read and clear the change count. A build that sees zero can skip.
    pub fn take_changes(&self) -> u64 {
        self.changes.swap(0, Ordering::AcqRel)
    }

    /// Whether any change is outstanding.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.changes.load(Ordering::Acquire) > 0
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}
