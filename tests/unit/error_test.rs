//! Tests for error types

use build_scheduler::core::{SchedulerError, TaskState};

#[test]
fn test_shut_down_error() {
    let err = SchedulerError::ShutDown;
    assert_eq!(format!("{}", err), "scheduler has been shut down");
}

#[test]
fn test_resume_without_pause_error() {
    let err = SchedulerError::ResumeWithoutPause;
    assert_eq!(format!("{}", err), "resumed without pause");
}

#[test]
fn test_invalid_completion_state_error() {
    let err = SchedulerError::InvalidCompletionState {
        sequence: 42,
        state: TaskState::Processing,
    };
    assert_eq!(
        format!("{}", err),
        "task 42 is completed but in invalid state Processing"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("pool_size must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: pool_size must be greater than 0"
    );
}
