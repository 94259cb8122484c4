//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use taskhub_core::config::scheduler::SchedulerConfig;
use taskhub_core::types::TaskId;
use taskhub_entity::task::{Task, TaskKind};
use taskhub_worker::{
    ConfigManager, HandlerError, HandlerRegistry, MemorySettingsStore, TaskEngine, TaskHandler,
};

/// A config with a short interval and the given concurrency cap
pub fn config(max_concurrent_tasks: usize) -> SchedulerConfig {
    SchedulerConfig {
        interval_ms: 100,
        max_concurrent_tasks,
        timeout_ms: 5_000,
        ..Default::default()
    }
}

/// An engine with an in-memory settings store
pub fn engine(config: SchedulerConfig, registry: HandlerRegistry) -> TaskEngine {
    TaskEngine::new(
        registry,
        ConfigManager::new(config, Arc::new(MemorySettingsStore::new())),
    )
}

/// Records the order in which tasks start executing
#[derive(Debug)]
pub struct Recorder {
    pub kind: TaskKind,
    pub work: Duration,
    pub log: Arc<Mutex<Vec<TaskId>>>,
}

impl Recorder {
    pub fn new(kind: TaskKind, work: Duration) -> (Arc<Self>, Arc<Mutex<Vec<TaskId>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::new(Self {
            kind,
            work,
            log: Arc::clone(&log),
        });
        (recorder, log)
    }
}

#[async_trait]
impl TaskHandler for Recorder {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
        self.log.lock().unwrap().push(task.id);
        tokio::time::sleep(self.work).await;
        Ok(json!({ "ok": true }))
    }
}

/// Tracks how many executions overlap
#[derive(Debug, Default)]
pub struct Gauge {
    pub work: Duration,
    pub current: AtomicUsize,
    pub peak: AtomicUsize,
}

impl Gauge {
    pub fn new(work: Duration) -> Arc<Self> {
        Arc::new(Self {
            work,
            ..Default::default()
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for Gauge {
    fn kind(&self) -> TaskKind {
        TaskKind::Analytics
    }

    async fn execute(&self, _task: &Task) -> Result<Value, HandlerError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.work).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({}))
    }
}

/// Always returns an error
#[derive(Debug)]
pub struct Failing(pub TaskKind);

#[async_trait]
impl TaskHandler for Failing {
    fn kind(&self) -> TaskKind {
        self.0
    }

    async fn execute(&self, _task: &Task) -> Result<Value, HandlerError> {
        Err(HandlerError::failed("upstream rejected the request"))
    }
}

/// Always panics
#[derive(Debug)]
pub struct Panicking(pub TaskKind);

#[async_trait]
impl TaskHandler for Panicking {
    fn kind(&self) -> TaskKind {
        self.0
    }

    async fn execute(&self, _task: &Task) -> Result<Value, HandlerError> {
        panic!("handler blew up");
    }
}
