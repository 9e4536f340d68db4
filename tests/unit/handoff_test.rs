//! Tests for handing build results to the applier through the scheduler

use build_scheduler::core::{AppResult, ItemRef, WorkItem, WorkScheduler};
use build_scheduler::infra::{ChangeTracker, Handoff};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stand-in for a tree whose levels of detail are rebuilt off-thread.
struct LodItem {
    changes: ChangeTracker,
    input: Mutex<u32>,
    next: Handoff<Vec<u32>>,
    attached: Mutex<Vec<u32>>,
}

impl LodItem {
    fn new(input: u32) -> Self {
        Self {
            changes: ChangeTracker::new(),
            input: Mutex::new(input),
            next: Handoff::new(),
            attached: Mutex::new(Vec::new()),
        }
    }
}

impl WorkItem for LodItem {
    fn priority(&self) -> i32 {
        0
    }

    fn build(&self) -> AppResult<()> {
        if self.changes.take_changes() == 0 {
            return Ok(());
        }
        let input = *self.input.lock();
        self.next.publish((0..3).map(|lod| input >> lod).collect());
        Ok(())
    }

    fn apply(&self) {
        if let Some(levels) = self.next.take() {
            *self.attached.lock() = levels;
        }
    }

    fn release(&self) {
        self.attached.lock().clear();
    }
}

fn settle(scheduler: &WorkScheduler) {
    let start = Instant::now();
    loop {
        scheduler.drain(usize::MAX).unwrap();
        if scheduler.pending_count() == 0 {
            return;
        }
        assert!(start.elapsed() < Duration::from_secs(5), "scheduler did not settle");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_build_result_reaches_apply() {
    let scheduler = WorkScheduler::with_pool_size("lods", 1).unwrap();
    let tree = Arc::new(LodItem::new(64));
    let item: ItemRef = Arc::clone(&tree) as ItemRef;

    scheduler.submit(&item).unwrap();
    settle(&scheduler);
    assert_eq!(*tree.attached.lock(), vec![64, 32, 16]);
}

#[test]
fn test_unchanged_item_keeps_previous_result() {
    let scheduler = WorkScheduler::with_pool_size("lods-unchanged", 1).unwrap();
    let tree = Arc::new(LodItem::new(8));
    let item: ItemRef = Arc::clone(&tree) as ItemRef;

    scheduler.submit(&item).unwrap();
    settle(&scheduler);

    // Rebuild without changes: apply finds nothing new.
    scheduler.submit(&item).unwrap();
    settle(&scheduler);
    assert_eq!(*tree.attached.lock(), vec![8, 4, 2]);

    *tree.input.lock() = 40;
    tree.changes.mark_changed();
    scheduler.submit(&item).unwrap();
    settle(&scheduler);
    assert_eq!(*tree.attached.lock(), vec![40, 20, 10]);
}

#[test]
fn test_release_clears_attached_levels() {
    let scheduler = WorkScheduler::with_pool_size("lods-release", 1).unwrap();
    let tree = Arc::new(LodItem::new(4));
    let item: ItemRef = Arc::clone(&tree) as ItemRef;

    scheduler.submit(&item).unwrap();
    settle(&scheduler);
    scheduler.cancel(&item);
    scheduler.drain(1).unwrap();

    assert!(tree.attached.lock().is_empty());
}
