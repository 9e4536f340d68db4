//! Core scheduling abstractions and the build/apply state machine.

pub mod error;
pub mod item;
pub mod scheduler;
pub mod task;

pub use error::{AppResult, SchedulerError};
pub use item::{ItemRef, WorkItem};
pub use scheduler::{SchedulerStats, WorkScheduler};
pub use task::{TaskState, URGENT_PRIORITY};
