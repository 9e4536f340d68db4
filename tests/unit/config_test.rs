//! Tests for configuration validation

use build_scheduler::config::SchedulerConfig;

fn valid() -> SchedulerConfig {
    SchedulerConfig {
        name: "trees".to_string(),
        pool_size: 2,
        max_updates_per_tick: 10,
        thread_stack_size: None,
    }
}

#[test]
fn test_scheduler_config_validation() {
    assert!(valid().validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_pool_size() {
    let invalid = SchedulerConfig {
        pool_size: 0,
        ..valid()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_max_updates() {
    let invalid = SchedulerConfig {
        max_updates_per_tick: 0,
        ..valid()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_name() {
    let invalid = SchedulerConfig {
        name: "  ".to_string(),
        ..valid()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_stack_size() {
    let invalid = valid().with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "name": "forest",
        "pool_size": 3,
        "max_updates_per_tick": 4,
        "thread_stack_size": 2097152
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.name, "forest");
    assert_eq!(config.pool_size, 3);
    assert_eq!(config.max_updates_per_tick, 4);
    assert_eq!(config.thread_stack_size, Some(2_097_152));
}

#[test]
fn test_scheduler_config_from_json_fills_defaults() {
    let config = SchedulerConfig::from_json_str(r#"{ "pool_size": 1 }"#).unwrap();
    assert_eq!(config.pool_size, 1);
    assert_eq!(config.name, SchedulerConfig::default().name);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "pool_size": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}
