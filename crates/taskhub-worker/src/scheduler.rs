//! Scheduler loop — periodically admits pending tasks and hands them to
//! the executor.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing;

use taskhub_core::types::TaskId;

use crate::config_manager::ConfigManager;
use crate::executor::TaskExecutor;
use crate::store::TaskStore;
use crate::ticker::Ticker;

/// Whether the loop's timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    /// No timer; nothing is admitted.
    Stopped,
    /// The timer is armed and ticks admit work.
    Running,
}

/// Join handles of executions that have been spawned and not yet reaped.
#[derive(Debug, Default)]
struct InFlight {
    handles: Mutex<HashMap<TaskId, JoinHandle<()>>>,
}

impl InFlight {
    async fn insert(&self, id: TaskId, handle: JoinHandle<()>) {
        self.handles.lock().await.insert(id, handle);
    }

    /// Drop handles whose executions have finished.
    async fn reap(&self) -> usize {
        let mut handles = self.handles.lock().await;
        let before = handles.len();
        handles.retain(|_, handle| !handle.is_finished());
        before - handles.len()
    }

    async fn take(&self, id: TaskId) -> Option<JoinHandle<()>> {
        self.handles.lock().await.remove(&id)
    }

    async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Wait for every tracked execution to finish.
    async fn drain(&self) -> usize {
        let handles: Vec<(TaskId, JoinHandle<()>)> =
            self.handles.lock().await.drain().collect();
        let count = handles.len();
        for (id, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!("Execution of task {} ended abnormally: {}", id, e);
            }
        }
        count
    }
}

/// Periodic admission loop.
#[derive(Debug)]
pub struct SchedulerLoop {
    /// Task records
    store: Arc<TaskStore>,
    /// Runs admitted tasks
    executor: Arc<TaskExecutor>,
    /// Live configuration, re-read every tick
    config: Arc<ConfigManager>,
    /// The armed timer, if running
    ticker: Mutex<Option<Ticker>>,
    /// Serializes admission between timed and manual ticks
    admission: Mutex<()>,
    /// Spawned executions
    in_flight: InFlight,
}

impl SchedulerLoop {
    /// Create a stopped scheduler loop
    pub fn new(
        store: Arc<TaskStore>,
        executor: Arc<TaskExecutor>,
        config: Arc<ConfigManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            executor,
            config,
            ticker: Mutex::new(None),
            admission: Mutex::new(()),
            in_flight: InFlight::default(),
        })
    }

    /// Current state of the timer
    pub async fn state(&self) -> LoopState {
        if self.ticker.lock().await.is_some() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Arm the timer if the config is enabled. Starting a running loop is a no-op.
    pub async fn start(self: &Arc<Self>) -> LoopState {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            return LoopState::Running;
        }

        let config = self.config.get_config();
        if !config.enabled {
            tracing::info!("Scheduler loop not started: scheduler is disabled");
            return LoopState::Stopped;
        }

        let period = Duration::from_millis(config.interval_ms);
        let weak: Weak<Self> = Arc::downgrade(self);
        *ticker = Some(Ticker::spawn(period, move || {
            let weak = weak.clone();
            async move {
                if let Some(this) = weak.upgrade() {
                    this.tick().await;
                }
            }
        }));

        tracing::info!(
            "Scheduler loop started: interval={}ms, max_concurrent={}, timeout={}ms",
            config.interval_ms,
            config.max_concurrent_tasks,
            config.timeout_ms
        );
        LoopState::Running
    }

    /// Disarm the timer. In-flight executions keep running.
    ///
    /// Once this returns no further tick will fire.
    pub async fn stop(&self) -> LoopState {
        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.stop().await;
            tracing::info!(
                "Scheduler loop stopped ({} executions still in flight)",
                self.in_flight.len().await
            );
        }
        LoopState::Stopped
    }

    /// Tear down and re-arm the timer with the current config.
    pub async fn restart(self: &Arc<Self>) -> LoopState {
        self.stop().await;
        self.start().await
    }

    /// Run one admission pass. Returns the number of tasks admitted.
    ///
    /// Admitted tasks are spawned and not awaited.
    pub async fn tick(&self) -> usize {
        let _guard = self.admission.lock().await;

        let reaped = self.in_flight.reap().await;
        if reaped > 0 {
            tracing::trace!("Reaped {} finished executions", reaped);
        }

        let config = self.config.get_config();
        let admitted = self.store.admit(config.max_concurrent_tasks).await;
        if admitted.is_empty() {
            tracing::trace!("Tick: nothing admitted");
            return 0;
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let count = admitted.len();
        for task in admitted {
            tracing::debug!(
                "Admitted task: id={}, kind='{}', priority={}",
                task.id,
                task.kind,
                task.priority
            );
            let id = task.id;
            let executor = Arc::clone(&self.executor);
            let handle = tokio::spawn(async move {
                executor.execute(task, timeout).await;
            });
            self.in_flight.insert(id, handle).await;
        }

        tracing::debug!("Tick: admitted {} task(s)", count);
        count
    }

    /// Wait for the execution of one task, if it is in flight.
    ///
    /// Returns `false` if no execution is tracked for `id` (not yet
    /// admitted, or already reaped).
    pub async fn join(&self, id: TaskId) -> bool {
        match self.in_flight.take(id).await {
            Some(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!("Execution of task {} ended abnormally: {}", id, e);
                }
                true
            }
            None => false,
        }
    }

    /// Number of spawned executions not yet reaped.
    pub async fn in_flight(&self) -> usize {
        self.in_flight.reap().await;
        self.in_flight.len().await
    }

    /// Wait for every in-flight execution. Returns how many were awaited.
    pub async fn drain(&self) -> usize {
        self.in_flight.drain().await
    }
}
