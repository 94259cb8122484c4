//! Config manager — owns the live scheduler config and persists changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing;

use taskhub_core::config::SchedulerConfigUpdate;
use taskhub_core::config::scheduler::SchedulerConfig;
use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::traits::SettingsStore;

/// Settings key the scheduler config is persisted under.
pub const CONFIG_KEY: &str = "scheduler_config";

/// The outcome of a successful config update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    /// Config before the update.
    pub previous: SchedulerConfig,
    /// Config after the update.
    pub current: SchedulerConfig,
}

impl ConfigChange {
    /// Whether the loop timer must be re-armed for the change to apply.
    pub fn requires_restart(&self) -> bool {
        self.previous.enabled != self.current.enabled
            || self.previous.interval_ms != self.current.interval_ms
    }

    /// Whether nothing changed.
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }
}

/// Holds the current [`SchedulerConfig`] and writes updates through to a
/// [`SettingsStore`].
#[derive(Debug)]
pub struct ConfigManager {
    current: watch::Sender<SchedulerConfig>,
    store: Arc<dyn SettingsStore>,
    update_lock: Mutex<()>,
}

impl ConfigManager {
    /// Create a manager starting from `initial`, without reading the store.
    pub fn new(initial: SchedulerConfig, store: Arc<dyn SettingsStore>) -> Self {
        let (current, _) = watch::channel(initial);
        Self {
            current,
            store,
            update_lock: Mutex::new(()),
        }
    }

    /// Create a manager from the persisted config, falling back to
    /// `defaults` when nothing usable has been stored.
    ///
    /// Fails only if the store itself cannot be read.
    pub async fn load(defaults: SchedulerConfig, store: Arc<dyn SettingsStore>) -> AppResult<Self> {
        let initial = match store.get(CONFIG_KEY).await? {
            Some(raw) => match parse_persisted(&raw) {
                Ok(config) => {
                    tracing::info!("Loaded persisted scheduler config: {:?}", config);
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring persisted scheduler config ({}); using defaults",
                        e
                    );
                    defaults
                }
            },
            None => {
                tracing::debug!("No persisted scheduler config; using defaults");
                defaults
            }
        };

        Ok(Self::new(initial, store))
    }

    /// A copy of the current config.
    pub fn get_config(&self) -> SchedulerConfig {
        *self.current.borrow()
    }

    /// Receiver that observes every applied config.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerConfig> {
        self.current.subscribe()
    }

    /// Validate, persist, then publish an update.
    ///
    /// On any error the current config is left untouched.
    pub async fn update_config(&self, update: SchedulerConfigUpdate) -> AppResult<ConfigChange> {
        let _guard = self.update_lock.lock().await;

        let previous = self.get_config();
        let current = previous.merged(&update)?;

        let encoded = serde_json::to_string(&current)?;
        self.store.set(CONFIG_KEY, &encoded).await.map_err(|e| {
            let message = format!("Failed to persist scheduler config: {}", e.message);
            AppError::with_source(ErrorKind::Storage, message, e)
        })?;

        self.current.send_replace(current);

        let change = ConfigChange { previous, current };
        if change.is_noop() {
            tracing::debug!("Scheduler config update changed nothing");
        } else {
            tracing::info!(
                "Scheduler config updated: enabled={}, interval={}ms, max_concurrent={}, retry_attempts={}, timeout={}ms",
                current.enabled,
                current.interval_ms,
                current.max_concurrent_tasks,
                current.retry_attempts,
                current.timeout_ms
            );
        }
        Ok(change)
    }
}

fn parse_persisted(raw: &str) -> AppResult<SchedulerConfig> {
    let config: SchedulerConfig = serde_json::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
