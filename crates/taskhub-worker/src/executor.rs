//! Task executor — dispatches tasks to registered handlers.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use taskhub_entity::task::{Task, TaskKind, TaskStatus};

use crate::store::TaskStore;

/// Trait for task handler implementations
#[async_trait]
pub trait TaskHandler: Send + Sync + std::fmt::Debug {
    /// Get the task kind this handler processes
    fn kind(&self) -> TaskKind;

    /// Execute the task and return its result
    async fn execute(&self, task: &Task) -> Result<Value, HandlerError>;
}

/// Error returned by a handler
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The work itself failed
    #[error("{0}")]
    Failed(String),

    /// The payload was acceptable to the schema but not to the handler
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Why an execution did not produce a result.
///
/// The `Display` form is what ends up in `Task::error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionFailure {
    /// No handler is registered for the task's kind.
    #[error("No handler registered for task kind '{0}'")]
    MissingHandler(TaskKind),

    /// The handler returned an error.
    #[error("{0}")]
    Handler(String),

    /// The handler did not finish within the configured timeout.
    #[error("timeout")]
    Timeout,

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The handler's task was cancelled before finishing.
    #[error("handler cancelled")]
    Cancelled,
}

/// Registry of handlers keyed by task kind
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskKind, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler; a later registration for the same kind replaces
    /// the earlier one
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind, handler).is_some() {
            tracing::warn!("Replaced task handler for kind '{}'", kind);
        } else {
            tracing::info!("Registered task handler for kind '{}'", kind);
        }
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Look up the handler for a kind
    pub fn get(&self, kind: TaskKind) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Check if a handler is registered for a kind
    pub fn has_handler(&self, kind: TaskKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, in declaration order
    pub fn registered_kinds(&self) -> Vec<TaskKind> {
        let mut kinds: Vec<TaskKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Runs admitted tasks and records their outcome on the store
#[derive(Debug)]
pub struct TaskExecutor {
    /// Registered task handlers
    registry: Arc<HandlerRegistry>,
    /// Store the outcome is written to
    store: Arc<TaskStore>,
}

impl TaskExecutor {
    /// Create a new task executor
    pub fn new(registry: Arc<HandlerRegistry>, store: Arc<TaskStore>) -> Self {
        Self { registry, store }
    }

    /// The handler registry
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Run a task's handler, racing it against `timeout`.
    ///
    /// The handler runs on its own tokio task so a panic is contained. On
    /// timeout that task is aborted, which only takes effect at its next
    /// `.await`; blocking work inside a handler keeps running.
    pub async fn run(&self, task: &Task, timeout: Duration) -> Result<Value, ExecutionFailure> {
        let handler = self
            .registry
            .get(task.kind)
            .ok_or(ExecutionFailure::MissingHandler(task.kind))?;

        let owned = task.clone();
        let mut join = tokio::spawn(async move { handler.execute(&owned).await });

        match tokio::time::timeout(timeout, &mut join).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(ExecutionFailure::Handler(err.to_string())),
            Ok(Err(join_err)) if join_err.is_panic() => Err(ExecutionFailure::Panicked(
                panic_message(join_err.into_panic()),
            )),
            Ok(Err(_)) => Err(ExecutionFailure::Cancelled),
            Err(_) => {
                join.abort();
                Err(ExecutionFailure::Timeout)
            }
        }
    }

    /// Execute an admitted task and record the outcome.
    ///
    /// Never fails: every outcome ends up on the task record. Returns the
    /// final status, or `None` if the record vanished before it could be
    /// updated.
    pub async fn execute(&self, task: Task, timeout: Duration) -> Option<TaskStatus> {
        tracing::info!(
            "Executing task: id={}, kind='{}', priority={}, attempt={}",
            task.id,
            task.kind,
            task.priority,
            task.meta.attempt
        );

        let recorded = match self.run(&task, timeout).await {
            Ok(result) => {
                tracing::info!("Task {} completed successfully", task.id);
                self.store.complete(task.id, result).await
            }
            Err(failure) => {
                match &failure {
                    ExecutionFailure::Timeout => tracing::warn!(
                        "Task {} timed out after {}ms",
                        task.id,
                        timeout.as_millis()
                    ),
                    ExecutionFailure::MissingHandler(_) => {
                        tracing::error!("Task {} failed permanently: {}", task.id, failure)
                    }
                    _ => tracing::warn!("Task {} failed: {}", task.id, failure),
                }
                self.store.fail(task.id, &failure.to_string()).await
            }
        };

        match recorded {
            Ok(task) => Some(task.status),
            Err(e) => {
                tracing::error!("Failed to record outcome of task {}: {}", task.id, e);
                None
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskhub_entity::task::{TaskPayload, TaskPriority};

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl TaskHandler for Echo {
        fn kind(&self) -> TaskKind {
            TaskKind::Analytics
        }

        async fn execute(&self, task: &Task) -> Result<Value, HandlerError> {
            Ok(json!({ "task": task.id.to_string() }))
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl TaskHandler for Failing {
        fn kind(&self) -> TaskKind {
            TaskKind::Orders
        }

        async fn execute(&self, _task: &Task) -> Result<Value, HandlerError> {
            Err(HandlerError::failed("marketplace returned 503"))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait]
    impl TaskHandler for Panicking {
        fn kind(&self) -> TaskKind {
            TaskKind::Reviews
        }

        async fn execute(&self, _task: &Task) -> Result<Value, HandlerError> {
            panic!("review parser exploded");
        }
    }

    #[derive(Debug)]
    struct Slow;

    #[async_trait]
    impl TaskHandler for Slow {
        fn kind(&self) -> TaskKind {
            TaskKind::ProductSync
        }

        async fn execute(&self, _task: &Task) -> Result<Value, HandlerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({}))
        }
    }

    async fn setup() -> (TaskExecutor, Arc<TaskStore>) {
        let registry = HandlerRegistry::new()
            .with(Arc::new(Echo))
            .with(Arc::new(Failing))
            .with(Arc::new(Panicking))
            .with(Arc::new(Slow));
        let store = Arc::new(TaskStore::new());
        (TaskExecutor::new(Arc::new(registry), Arc::clone(&store)), store)
    }

    async fn admit_one(store: &TaskStore, kind: TaskKind) -> Task {
        store
            .add_task(TaskPriority::Medium, TaskPayload::empty(kind))
            .await;
        store.admit(1).await.remove(0)
    }

    #[tokio::test]
    async fn test_success_records_result() {
        let (executor, store) = setup().await;
        let task = admit_one(&store, TaskKind::Analytics).await;

        let status = executor.execute(task.clone(), Duration::from_secs(5)).await;
        assert_eq!(status, Some(TaskStatus::Completed));

        let stored = store.get(task.id).await.unwrap();
        assert_eq!(stored.result, Some(json!({ "task": task.id.to_string() })));
        assert!(stored.completed_at.unwrap() > stored.started_at.unwrap());
    }

    #[tokio::test]
    async fn test_handler_error_is_captured() {
        let (executor, store) = setup().await;
        let task = admit_one(&store, TaskKind::Orders).await;

        executor.execute(task.clone(), Duration::from_secs(5)).await;

        let stored = store.get(task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("marketplace returned 503"));
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let (executor, store) = setup().await;
        let task = admit_one(&store, TaskKind::Reviews).await;

        executor.execute(task.clone(), Duration::from_secs(5)).await;

        let stored = store.get(task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(
            stored.error.as_deref(),
            Some("handler panicked: review parser exploded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_failed() {
        let (executor, store) = setup().await;
        let task = admit_one(&store, TaskKind::ProductSync).await;

        executor.execute(task.clone(), Duration::from_millis(50)).await;

        let stored = store.get(task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_missing_handler_fails_task() {
        let (executor, store) = setup().await;
        let task = admit_one(&store, TaskKind::Advertising).await;

        let failure = executor
            .run(&task, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(failure, ExecutionFailure::MissingHandler(TaskKind::Advertising));

        executor.execute(task.clone(), Duration::from_secs(1)).await;
        let stored = store.get(task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert!(stored.error.unwrap().contains("advertising"));
    }

    #[test]
    fn test_registry_kinds() {
        let registry = HandlerRegistry::new().with(Arc::new(Failing)).with(Arc::new(Echo));
        assert_eq!(
            registry.registered_kinds(),
            vec![TaskKind::Analytics, TaskKind::Orders]
        );
        assert!(registry.has_handler(TaskKind::Orders));
        assert!(!registry.has_handler(TaskKind::Reviews));
    }
}
