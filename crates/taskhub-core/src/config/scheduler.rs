//! Scheduler loop configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Tunable parameters of the scheduler loop and task executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the scheduler loop runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick period of the scheduler loop in milliseconds.
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// Maximum number of simultaneously running tasks.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,
    /// Maximum number of manual re-queues allowed for a failed task.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Maximum wall-clock duration of a single task execution in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_ms: default_interval(),
            max_concurrent_tasks: default_max_concurrent(),
            retry_attempts: default_retry_attempts(),
            timeout_ms: default_timeout(),
        }
    }
}

impl SchedulerConfig {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> AppResult<()> {
        if self.interval_ms == 0 {
            return Err(AppError::configuration("interval_ms must be greater than 0"));
        }
        if self.max_concurrent_tasks < 1 {
            return Err(AppError::configuration(
                "max_concurrent_tasks must be at least 1",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::configuration("timeout_ms must be greater than 0"));
        }
        Ok(())
    }

    /// Produce a new config with the supplied fields merged in.
    ///
    /// The receiver is never modified; an invalid result is rejected.
    pub fn merged(&self, update: &SchedulerConfigUpdate) -> AppResult<Self> {
        let merged = Self {
            enabled: update.enabled.unwrap_or(self.enabled),
            interval_ms: update.interval_ms.unwrap_or(self.interval_ms),
            max_concurrent_tasks: update
                .max_concurrent_tasks
                .unwrap_or(self.max_concurrent_tasks),
            retry_attempts: update.retry_attempts.unwrap_or(self.retry_attempts),
            timeout_ms: update.timeout_ms.unwrap_or(self.timeout_ms),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// A partial scheduler config; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfigUpdate {
    /// New `enabled` flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New tick period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    /// New concurrency cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_tasks: Option<usize>,
    /// New retry allowance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    /// New per-task timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SchedulerConfigUpdate {
    /// An update that only toggles the `enabled` flag.
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    5_000
}

fn default_max_concurrent() -> usize {
    3
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_timeout() -> u64 {
    300_000
}
