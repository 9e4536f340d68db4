//! Scheduler configuration structures.

use std::env;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`SchedulerConfig::name`].
pub const ENV_NAME: &str = "BUILD_SCHEDULER_NAME";
/// Environment variable overriding [`SchedulerConfig::pool_size`].
pub const ENV_POOL_SIZE: &str = "BUILD_SCHEDULER_POOL_SIZE";
/// Environment variable overriding [`SchedulerConfig::max_updates_per_tick`].
pub const ENV_MAX_UPDATES: &str = "BUILD_SCHEDULER_MAX_UPDATES";
/// Environment variable overriding [`SchedulerConfig::thread_stack_size`].
pub const ENV_STACK_SIZE: &str = "BUILD_SCHEDULER_STACK_SIZE";

/// Configuration for one [`WorkScheduler`](crate::core::WorkScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name used as the worker thread prefix and in log fields.
    pub name: String,
    /// Number of worker threads.
    pub pool_size: usize,
    /// Completions applied per host tick by a
    /// [`FrameDriver`](crate::runtime::FrameDriver).
    pub max_updates_per_tick: usize,
    /// Worker stack size in bytes; the platform default when unset.
    pub thread_stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "builder".into(),
            // Leave a core for the render thread.
            pool_size: num_cpus::get().saturating_sub(1).max(1),
            max_updates_per_tick: 10,
            thread_stack_size: None,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scheduler name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub const fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the per-tick drain budget.
    #[must_use]
    pub const fn with_max_updates_per_tick(mut self, max_updates: usize) -> Self {
        self.max_updates_per_tick = max_updates;
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".into());
        }
        if self.max_updates_per_tick == 0 {
            return Err("max_updates_per_tick must be greater than 0".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `BUILD_SCHEDULER_*` environment variables,
    /// loading a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable does not parse or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Ok(name) = env::var(ENV_NAME) {
            cfg.name = name;
        }
        if let Some(pool_size) = parse_env(ENV_POOL_SIZE)? {
            cfg.pool_size = pool_size;
        }
        if let Some(max_updates) = parse_env(ENV_MAX_UPDATES)? {
            cfg.max_updates_per_tick = max_updates;
        }
        if let Some(stack_size) = parse_env(ENV_STACK_SIZE)? {
            cfg.thread_stack_size = Some(stack_size);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_env(key: &str) -> Result<Option<usize>, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}={raw:?}: {e}")),
        Err(_) => Ok(None),
    }
}
