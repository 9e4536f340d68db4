//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::TaskState;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler has been shut down and accepts no more work.
    #[error("scheduler has been shut down")]
    ShutDown,
    /// `resume` was called more times than `pause`.
    #[error("resumed without pause")]
    ResumeWithoutPause,
    /// A completed task was drained in a state that can never complete.
    ///
    /// This means the completion queue is corrupted and is not recoverable.
    #[error("task {sequence} is completed but in invalid state {state:?}")]
    InvalidCompletionState {
        /// Sequence number of the offending task.
        sequence: u64,
        /// State observed while draining.
        state: TaskState,
    },
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
