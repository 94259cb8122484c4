//! Task engine — the public facade over the store, scheduler loop and
//! config manager.
//!
//! Construct one engine per process and share it by `Arc`.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing;

use taskhub_core::config::SchedulerConfigUpdate;
use taskhub_core::config::scheduler::SchedulerConfig;
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::SettingsStore;
use taskhub_core::types::TaskId;
use taskhub_entity::task::{Task, TaskFilter, TaskKind, TaskPayload, TaskPriority, TaskStatus};

use crate::config_manager::{ConfigChange, ConfigManager};
use crate::executor::{HandlerRegistry, TaskExecutor};
use crate::retry;
use crate::scheduler::{LoopState, SchedulerLoop};
use crate::stats::TaskStats;
use crate::store::TaskStore;

/// In-process task scheduling engine
#[derive(Debug)]
pub struct TaskEngine {
    /// Task records
    store: Arc<TaskStore>,
    /// Handler dispatch
    executor: Arc<TaskExecutor>,
    /// Live configuration
    config: Arc<ConfigManager>,
    /// Periodic admission
    scheduler: Arc<SchedulerLoop>,
    /// Serializes start/stop/restart decisions
    lifecycle: Mutex<()>,
    /// Serializes retry checks with their insert
    retry_lock: Mutex<()>,
}

impl TaskEngine {
    /// Create a stopped engine from a handler registry and a config manager
    pub fn new(registry: HandlerRegistry, config: ConfigManager) -> Self {
        let store = Arc::new(TaskStore::new());
        let executor = Arc::new(TaskExecutor::new(Arc::new(registry), Arc::clone(&store)));
        let config = Arc::new(config);
        let scheduler = SchedulerLoop::new(
            Arc::clone(&store),
            Arc::clone(&executor),
            Arc::clone(&config),
        );

        tracing::info!(
            "Task engine created with handlers for {:?}",
            executor
                .registry()
                .registered_kinds()
                .iter()
                .map(TaskKind::as_str)
                .collect::<Vec<_>>()
        );

        Self {
            store,
            executor,
            config,
            scheduler,
            lifecycle: Mutex::new(()),
            retry_lock: Mutex::new(()),
        }
    }

    /// Create a stopped engine whose config is restored from `settings`,
    /// falling back to `defaults`
    pub async fn load(
        registry: HandlerRegistry,
        defaults: SchedulerConfig,
        settings: Arc<dyn SettingsStore>,
    ) -> AppResult<Self> {
        let config = ConfigManager::load(defaults, settings).await?;
        Ok(Self::new(registry, config))
    }

    // ── Tasks ───────────────────────────────────────────────────────

    /// Enqueue a typed task
    pub async fn add_task(&self, priority: TaskPriority, payload: TaskPayload) -> TaskId {
        self.store.add_task(priority, payload).await
    }

    /// Enqueue a task from a kind tag and untyped JSON payload
    pub async fn add_task_json(
        &self,
        kind: &str,
        priority: TaskPriority,
        payload: Value,
    ) -> AppResult<TaskId> {
        self.store.add_task_json(kind, priority, payload).await
    }

    /// Fetch a task snapshot
    pub async fn get_task(&self, id: TaskId) -> AppResult<Task> {
        self.store.get(id).await
    }

    /// Snapshot of matching tasks, newest first
    pub async fn list_tasks(&self, filter: TaskFilter) -> Vec<Task> {
        self.store.list(filter).await
    }

    /// Snapshot of tasks with one status, newest first
    pub async fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.store.by_status(status).await
    }

    /// Remove completed and failed records
    pub async fn clear_completed_tasks(&self) -> usize {
        self.store.clear_completed().await
    }

    /// Point-in-time statistics
    pub async fn get_stats(&self) -> TaskStats {
        self.store.stats().await
    }

    /// Re-queue a failed task as a new record. Returns the new id.
    pub async fn retry_task(&self, id: TaskId) -> AppResult<TaskId> {
        let _guard = self.retry_lock.lock().await;

        let source = self.store.get(id).await?;
        if let Some(existing) = self.store.find_retry_of(id).await {
            return Err(AppError::validation(format!(
                "Task {id} was already re-queued as {existing}"
            )));
        }

        let retry = retry::plan_retry(&source, self.config.get_config().retry_attempts)?;
        let attempt = retry.meta.attempt;
        let new_id = self.store.insert(retry).await;

        tracing::info!(
            "Re-queued failed task {} as {} (attempt {})",
            id,
            new_id,
            attempt
        );
        Ok(new_id)
    }

    /// Wait until a task reaches a terminal state and return it.
    ///
    /// Waits indefinitely for a task that is never admitted, e.g. while
    /// the loop is stopped and nobody calls [`tick`](Self::tick).
    pub async fn wait_for(&self, id: TaskId) -> AppResult<Task> {
        let mut changes = self.store.subscribe();
        loop {
            let task = self.store.get(id).await?;
            if task.is_terminal() {
                return Ok(task);
            }
            changes
                .changed()
                .await
                .map_err(|_| AppError::internal("Task store closed"))?;
        }
    }

    // ── Config ──────────────────────────────────────────────────────

    /// A copy of the current config
    pub fn get_config(&self) -> SchedulerConfig {
        self.config.get_config()
    }

    /// Apply a partial config update and re-arm the loop if needed.
    ///
    /// Disabling stops the loop. Enabling, or changing the interval of a
    /// running loop, (re)starts it.
    pub async fn update_config(&self, update: SchedulerConfigUpdate) -> AppResult<ConfigChange> {
        let _guard = self.lifecycle.lock().await;
        let change = self.config.update_config(update).await?;

        if change.requires_restart() {
            if !change.current.enabled {
                self.scheduler.stop().await;
            } else if !change.previous.enabled
                || self.scheduler.state().await == LoopState::Running
            {
                self.scheduler.restart().await;
            }
        }
        Ok(change)
    }

    /// Observe applied config changes
    pub fn subscribe_config(&self) -> watch::Receiver<SchedulerConfig> {
        self.config.subscribe()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Arm the scheduler loop if the config is enabled
    pub async fn start(&self) -> LoopState {
        let _guard = self.lifecycle.lock().await;
        self.scheduler.start().await
    }

    /// Disarm the scheduler loop; running tasks continue
    pub async fn stop(&self) -> LoopState {
        let _guard = self.lifecycle.lock().await;
        self.scheduler.stop().await
    }

    /// Whether the scheduler loop is armed
    pub async fn is_running(&self) -> bool {
        self.scheduler.state().await == LoopState::Running
    }

    /// Run one admission pass now. Returns the number of tasks admitted.
    pub async fn tick(&self) -> usize {
        self.scheduler.tick().await
    }

    /// Stop the loop and wait for in-flight tasks to finish
    pub async fn shutdown(&self) -> usize {
        self.stop().await;
        let drained = self.scheduler.drain().await;
        tracing::info!(
            "Task engine shut down ({} in-flight task(s) drained)",
            drained
        );
        drained
    }

    /// Kinds with a registered handler
    pub fn registered_kinds(&self) -> Vec<TaskKind> {
        self.executor.registry().registered_kinds()
    }
}
