//! Integration tests for failure containment, timeouts and manual retry.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use taskhub_core::error::ErrorKind;
use taskhub_core::types::TaskId;
use taskhub_entity::task::{TaskKind, TaskPayload, TaskPriority, TaskStatus};
use taskhub_worker::HandlerRegistry;
use taskhub_worker::jobs::{AnalyticsHandler, ProductSyncHandler};

fn registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with(Arc::new(AnalyticsHandler::new(Duration::from_millis(10))))
        .with(Arc::new(ProductSyncHandler::new(Duration::from_secs(60))))
        .with(Arc::new(helpers::Failing(TaskKind::Orders)))
        .with(Arc::new(helpers::Panicking(TaskKind::Reviews)))
}

#[tokio::test(start_paused = true)]
async fn test_failing_handler_does_not_block_others() {
    let engine = helpers::engine(helpers::config(1), registry());

    let failing = engine
        .add_task(TaskPriority::Critical, TaskPayload::empty(TaskKind::Orders))
        .await;
    let healthy = engine
        .add_task(TaskPriority::Low, TaskPayload::empty(TaskKind::Analytics))
        .await;

    engine.tick().await;
    let failed = engine.wait_for(failing).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(!failed.error.unwrap_or_default().is_empty());
    assert!(failed.result.is_none());

    engine.tick().await;
    assert_eq!(engine.wait_for(healthy).await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_is_contained() {
    let engine = helpers::engine(helpers::config(2), registry());

    let panics = engine
        .add_task(TaskPriority::High, TaskPayload::empty(TaskKind::Reviews))
        .await;
    let healthy = engine
        .add_task(TaskPriority::High, TaskPayload::empty(TaskKind::Analytics))
        .await;

    assert_eq!(engine.tick().await, 2);

    let failed = engine.wait_for(panics).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("handler panicked: handler blew up"));
    assert_eq!(engine.wait_for(healthy).await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_missing_handler_fails_task() {
    let engine = helpers::engine(helpers::config(1), registry());
    let id = engine
        .add_task(TaskPriority::Medium, TaskPayload::empty(TaskKind::Advertising))
        .await;

    engine.tick().await;
    let task = engine.wait_for(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(
        task.error.as_deref(),
        Some("No handler registered for task kind 'advertising'")
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_records_timeout_error() {
    let mut config = helpers::config(1);
    config.timeout_ms = 200;
    let engine = helpers::engine(config, registry());

    let id = engine
        .add_task(TaskPriority::Medium, TaskPayload::empty(TaskKind::ProductSync))
        .await;
    engine.tick().await;

    let task = engine.wait_for(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("timeout"));
    assert!(task.completed_at.unwrap() > task.started_at.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_retry_creates_new_attempt() {
    let engine = helpers::engine(helpers::config(1), registry());
    let original = engine
        .add_task(TaskPriority::High, TaskPayload::empty(TaskKind::Orders))
        .await;
    engine.tick().await;
    engine.wait_for(original).await.unwrap();

    let retry = engine.retry_task(original).await.unwrap();
    assert_ne!(retry, original);

    let task = engine.get_task(retry).await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.kind, TaskKind::Orders);
    assert_eq!(task.priority, TaskPriority::High);
    assert_eq!(task.meta.attempt, 2);
    assert_eq!(task.meta.retry_of, Some(original));

    // the failed record itself is untouched
    assert_eq!(engine.get_task(original).await.unwrap().status, TaskStatus::Failed);

    let err = engine.retry_task(original).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn test_retry_respects_retry_attempts() {
    let mut config = helpers::config(1);
    config.retry_attempts = 1;
    let engine = helpers::engine(config, registry());

    let first = engine
        .add_task(TaskPriority::Medium, TaskPayload::empty(TaskKind::Orders))
        .await;
    engine.tick().await;
    engine.wait_for(first).await.unwrap();

    let second = engine.retry_task(first).await.unwrap();
    engine.tick().await;
    assert_eq!(engine.wait_for(second).await.unwrap().status, TaskStatus::Failed);

    let err = engine.retry_task(second).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_retry_rejects_unfinished_and_unknown_tasks() {
    let engine = helpers::engine(helpers::config(1), registry());
    let pending = engine
        .add_task(TaskPriority::Medium, TaskPayload::empty(TaskKind::Orders))
        .await;

    let err = engine.retry_task(pending).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = engine.retry_task(TaskId::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
