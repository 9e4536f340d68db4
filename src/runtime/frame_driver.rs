//! Drives a scheduler from a host frame loop.
//!
//! Hosts with an enable/disable lifecycle (an editor panel, an app state)
//! map their hooks onto a `FrameDriver`:
//!
//! | host hook | driver call | scheduler effect                    |
//! |-----------|-------------|-------------------------------------|
//! | enable    | `enable`    | resume, if paused                   |
//! | tick      | `update`    | drain up to the per-tick budget      |
//! | disable   | `disable`   | pause                               |
//! | cleanup   | `cleanup`   | shut down for good                  |

use std::sync::Arc;

use tracing::debug;

use crate::config::SchedulerConfig;
use crate::core::{SchedulerError, WorkScheduler};

/// Host-loop adapter owning a shared scheduler and a per-tick drain budget.
#[derive(Debug)]
pub struct FrameDriver {
    scheduler: Arc<WorkScheduler>,
    max_updates_per_tick: usize,
}

impl FrameDriver {
    /// Wrap an existing scheduler.
    #[must_use]
    pub const fn new(scheduler: Arc<WorkScheduler>, max_updates_per_tick: usize) -> Self {
        Self {
            scheduler,
            max_updates_per_tick,
        }
    }

    /// Create a scheduler from `config` and wrap it.
    ///
    /// # Errors
    ///
    /// Same as [`WorkScheduler::new`].
    pub fn from_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let max_updates = config.max_updates_per_tick;
        let scheduler = WorkScheduler::new(config)?;
        Ok(Self::new(Arc::new(scheduler), max_updates))
    }

    /// Shared scheduler handle to pass to collaborators.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<WorkScheduler> {
        &self.scheduler
    }

    /// Completions applied per [`update`](Self::update).
    #[must_use]
    pub const fn max_updates_per_tick(&self) -> usize {
        self.max_updates_per_tick
    }

    /// Host became active. The first enable finds the scheduler running, so
    /// this only resumes when a previous `disable` paused it.
    ///
    /// # Errors
    ///
    /// Propagates [`WorkScheduler::resume`] errors.
    pub fn enable(&self) -> Result<(), SchedulerError> {
        if self.scheduler.is_paused() {
            self.scheduler.resume()?;
            debug!(scheduler = %self.scheduler.name(), "frame driver enabled");
        }
        Ok(())
    }

    /// Host went inactive: stop starting new builds.
    pub fn disable(&self) {
        self.scheduler.pause();
        debug!(scheduler = %self.scheduler.name(), "frame driver disabled");
    }

    /// Per-tick hook: apply finished builds on the calling thread.
    ///
    /// Returns the completions left for later ticks.
    ///
    /// # Errors
    ///
    /// Propagates [`WorkScheduler::drain`] errors.
    pub fn update(&self) -> Result<usize, SchedulerError> {
        let backlog = self.scheduler.drain(self.max_updates_per_tick)?;
        if backlog > 0 {
            debug!(scheduler = %self.scheduler.name(), backlog, "completion backlog");
        }
        Ok(backlog)
    }

    /// Host is going away: shut the scheduler down. It cannot be restarted.
    pub fn cleanup(&self) {
        self.scheduler.shutdown();
        debug!(scheduler = %self.scheduler.name(), "frame driver cleaned up");
    }
}
