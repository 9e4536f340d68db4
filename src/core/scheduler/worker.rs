//! Worker threads: claim tasks from the ready queue and run their builds.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, trace};

use super::{bump, Shared};
use crate::core::task::ScheduledTask;
use crate::core::TaskState;

/// Spawn a worker thread named after its scheduler.
pub(super) fn spawn_worker(
    worker_id: usize,
    shared: Arc<Shared>,
    stack_size: Option<usize>,
) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("{}[worker-{worker_id}]", shared.name));
    if let Some(bytes) = stack_size {
        builder = builder.stack_size(bytes);
    }
    builder.spawn(move || {
        debug!(scheduler = %shared.name, worker_id, "Worker thread started");
        while let Some(task) = next_task(&shared) {
            run_task(&shared, worker_id, task);
        }
        debug!(scheduler = %shared.name, worker_id, "Worker thread exiting");
    })
}

/// Block until a task is ready, or return `None` once shut down.
fn next_task(shared: &Shared) -> Option<Arc<ScheduledTask>> {
    let mut ready = shared.ready.lock();
    loop {
        if ready.shutdown {
            return None;
        }
        if let Some(task) = ready.queue.pop() {
            return Some(task);
        }
        shared.ready_signal.wait(&mut ready);
    }
}

fn run_task(shared: &Shared, worker_id: usize, task: Arc<ScheduledTask>) {
    if !task.mark_processing() {
        // Marked for reprocess or release between being dequeued and
        // claimed. Skip the build and let drain sort it out.
        if task.state() == TaskState::Reprocess {
            task.boost();
        }
        trace!(
            scheduler = %shared.name,
            worker_id,
            sequence = task.sequence(),
            "claimed after state change; skipping build"
        );
        shared.complete(task);
        return;
    }

    let counters = &shared.counters;
    counters.active_builds.fetch_add(1, Ordering::Relaxed);
    trace!(
        scheduler = %shared.name,
        worker_id,
        sequence = task.sequence(),
        priority = task.priority(),
        "Worker building task"
    );

    match panic::catch_unwind(AssertUnwindSafe(|| task.item().build())) {
        Ok(Ok(())) => bump(&counters.built),
        Ok(Err(e)) => {
            bump(&counters.failed_builds);
            error!(
                scheduler = %shared.name,
                worker_id,
                sequence = task.sequence(),
                error = %e,
                "Build failed"
            );
        }
        Err(payload) => {
            bump(&counters.failed_builds);
            error!(
                scheduler = %shared.name,
                worker_id,
                sequence = task.sequence(),
                panic = %panic_message(payload.as_ref()),
                "Build panicked"
            );
        }
    }
    counters.active_builds.fetch_sub(1, Ordering::Relaxed);

    // Done, Release or Reprocess: drain decides what happens next either way.
    if !task.mark_done() && task.state() == TaskState::Reprocess {
        task.boost();
    }
    shared.complete(task);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}
