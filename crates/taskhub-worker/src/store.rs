//! In-memory task store.
//!
//! Every mutation happens under a single write lock. Admission (counting
//! running tasks and promoting pending ones) runs inside one critical
//! section, so it can never interleave with an executor recording a
//! completion.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{RwLock, watch};
use tracing;

use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::types::TaskId;
use taskhub_entity::task::{
    Task, TaskFilter, TaskKind, TaskPayload, TaskPriority, TaskStatus,
};

use crate::stats::TaskStats;

/// A stored task plus its insertion sequence number.
///
/// The sequence breaks ties between tasks created within the same clock
/// tick, which keeps admission FIFO within a priority tier.
#[derive(Debug)]
struct Entry {
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<TaskId, Entry>,
    next_seq: u64,
}

/// In-memory collection of task records.
#[derive(Debug)]
pub struct TaskStore {
    inner: RwLock<Inner>,
    /// Bumped after every mutation so waiters can observe changes.
    changes: watch::Sender<u64>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: RwLock::new(Inner::default()),
            changes,
        }
    }

    /// Enqueue a typed task. The kind is taken from the payload.
    pub async fn add_task(&self, priority: TaskPriority, payload: TaskPayload) -> TaskId {
        self.insert(Task::new(priority, payload)).await
    }

    /// Enqueue a task from an untyped kind tag and JSON payload.
    ///
    /// Fails with a validation error if the kind is unknown or the payload
    /// does not fit the kind's schema.
    pub async fn add_task_json(
        &self,
        kind: &str,
        priority: TaskPriority,
        payload: Value,
    ) -> AppResult<TaskId> {
        let kind: TaskKind = kind.parse()?;
        let payload = TaskPayload::decode(kind, payload)?;
        Ok(self.add_task(priority, payload).await)
    }

    /// Insert a prepared pending task record.
    pub async fn insert(&self, task: Task) -> TaskId {
        let id = task.id;
        {
            let mut inner = self.inner.write().await;
            let seq = inner.next_seq;
            inner.next_seq += 1;

            tracing::debug!(
                "Enqueued task: id={}, kind='{}', priority={}, attempt={}",
                id,
                task.kind,
                task.priority,
                task.meta.attempt
            );
            inner.tasks.insert(id, Entry { seq, task });
        }
        self.notify();
        id
    }

    /// Fetch a snapshot of one task.
    pub async fn get(&self, id: TaskId) -> AppResult<Task> {
        self.inner
            .read()
            .await
            .tasks
            .get(&id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| AppError::not_found(format!("Task {id} not found")))
    }

    /// Snapshot of matching tasks, newest first.
    pub async fn list(&self, filter: TaskFilter) -> Vec<Task> {
        let inner = self.inner.read().await;
        let mut entries: Vec<&Entry> = inner
            .tasks
            .values()
            .filter(|entry| filter.matches(&entry.task))
            .collect();
        entries.sort_by_key(|entry| Reverse((entry.task.created_at, entry.seq)));
        entries.into_iter().map(|entry| entry.task.clone()).collect()
    }

    /// Snapshot of tasks with one status, newest first.
    pub async fn by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.list(TaskFilter::status(status)).await
    }

    /// The record that re-attempts `id`, if one was enqueued.
    pub async fn find_retry_of(&self, id: TaskId) -> Option<TaskId> {
        self.inner
            .read()
            .await
            .tasks
            .values()
            .find(|entry| entry.task.meta.retry_of == Some(id))
            .map(|entry| entry.task.id)
    }

    /// Remove every completed or failed record. Returns how many were removed.
    pub async fn clear_completed(&self) -> usize {
        let removed = {
            let mut inner = self.inner.write().await;
            let before = inner.tasks.len();
            inner.tasks.retain(|_, entry| !entry.task.is_terminal());
            before - inner.tasks.len()
        };

        if removed > 0 {
            tracing::info!("Cleared {} finished tasks", removed);
            self.notify();
        }
        removed
    }

    /// Number of tasks currently running.
    pub async fn running_count(&self) -> usize {
        self.inner
            .read()
            .await
            .tasks
            .values()
            .filter(|entry| entry.task.status == TaskStatus::Running)
            .count()
    }

    /// Point-in-time counts and success rate.
    pub async fn stats(&self) -> TaskStats {
        let inner = self.inner.read().await;
        TaskStats::from_tasks(inner.tasks.values().map(|entry| &entry.task))
    }

    /// Promote pending tasks to running, never exceeding `max_running`.
    ///
    /// Candidates are ordered by priority (highest first), then creation
    /// time, then insertion order. Returns snapshots of the admitted tasks.
    pub async fn admit(&self, max_running: usize) -> Vec<Task> {
        let admitted = {
            let mut inner = self.inner.write().await;

            let running = inner
                .tasks
                .values()
                .filter(|entry| entry.task.status == TaskStatus::Running)
                .count();
            let capacity = max_running.saturating_sub(running);
            if capacity == 0 {
                tracing::trace!(
                    "No admission capacity: running={}, max={}",
                    running,
                    max_running
                );
                return Vec::new();
            }

            let mut pending: Vec<(Reverse<TaskPriority>, chrono::DateTime<Utc>, u64, TaskId)> =
                inner
                    .tasks
                    .values()
                    .filter(|entry| entry.task.status == TaskStatus::Pending)
                    .map(|entry| {
                        (
                            Reverse(entry.task.priority),
                            entry.task.created_at,
                            entry.seq,
                            entry.task.id,
                        )
                    })
                    .collect();
            pending.sort_unstable();

            let now = Utc::now();
            let mut admitted = Vec::with_capacity(capacity.min(pending.len()));
            for (_, _, _, id) in pending.into_iter().take(capacity) {
                if let Some(entry) = inner.tasks.get_mut(&id) {
                    match entry.task.mark_running(now) {
                        Ok(()) => admitted.push(entry.task.clone()),
                        Err(e) => tracing::error!("Failed to admit task {}: {}", id, e),
                    }
                }
            }
            admitted
        };

        if !admitted.is_empty() {
            self.notify();
        }
        admitted
    }

    /// Record a successful finish.
    pub async fn complete(&self, id: TaskId, result: Value) -> AppResult<Task> {
        self.finish(id, |task| task.mark_completed(result, Utc::now()))
            .await
    }

    /// Record a failed finish.
    pub async fn fail(&self, id: TaskId, error: &str) -> AppResult<Task> {
        self.finish(id, |task| task.mark_failed(error, Utc::now()))
            .await
    }

    /// Subscribe to store change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    async fn finish(
        &self,
        id: TaskId,
        apply: impl FnOnce(&mut Task) -> AppResult<()>,
    ) -> AppResult<Task> {
        let task = {
            let mut inner = self.inner.write().await;
            let entry = inner
                .tasks
                .get_mut(&id)
                .ok_or_else(|| AppError::not_found(format!("Task {id} not found")))?;
            apply(&mut entry.task)?;
            entry.task.clone()
        };
        self.notify();
        Ok(task)
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use taskhub_core::error::ErrorKind;

    fn payload(kind: TaskKind) -> TaskPayload {
        TaskPayload::empty(kind)
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = TaskStore::new();
        let id = store
            .add_task(TaskPriority::High, payload(TaskKind::Analytics))
            .await;

        let task = store.get(id).await.unwrap();
        assert_eq!(task.id, id);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.kind, TaskKind::Analytics);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = TaskStore::new();
        let err = store.get(TaskId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_add_task_json_validates_kind() {
        let store = TaskStore::new();
        let err = store
            .add_task_json("inventory", TaskPriority::Low, json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(store.list(TaskFilter::all()).await.is_empty());

        let id = store
            .add_task_json("reviews", TaskPriority::Low, json!({ "since_days": 7 }))
            .await
            .unwrap();
        assert_eq!(store.get(id).await.unwrap().kind, TaskKind::Reviews);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = TaskStore::new();
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            ids.insert(
                store
                    .add_task(TaskPriority::Low, payload(TaskKind::Orders))
                    .await,
            );
        }
        assert_eq!(ids.len(), 10_000);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let store = TaskStore::new();
        let first = store
            .add_task(TaskPriority::Low, payload(TaskKind::Orders))
            .await;
        let second = store
            .add_task(TaskPriority::Low, payload(TaskKind::Reviews))
            .await;
        let third = store
            .add_task(TaskPriority::Low, payload(TaskKind::Orders))
            .await;

        let all: Vec<TaskId> = store
            .list(TaskFilter::all())
            .await
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(all, vec![third, second, first]);

        let orders: Vec<TaskId> = store
            .list(TaskFilter::kind(TaskKind::Orders))
            .await
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(orders, vec![third, first]);
    }

    #[tokio::test]
    async fn test_admit_orders_by_priority_then_age() {
        let store = TaskStore::new();
        let low = store
            .add_task(TaskPriority::Low, payload(TaskKind::Orders))
            .await;
        let medium_a = store
            .add_task(TaskPriority::Medium, payload(TaskKind::Orders))
            .await;
        let critical = store
            .add_task(TaskPriority::Critical, payload(TaskKind::Orders))
            .await;
        let medium_b = store
            .add_task(TaskPriority::Medium, payload(TaskKind::Orders))
            .await;

        let order: Vec<TaskId> = store.admit(4).await.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![critical, medium_a, medium_b, low]);
    }

    #[tokio::test]
    async fn test_admit_respects_capacity() {
        let store = TaskStore::new();
        for _ in 0..5 {
            store
                .add_task(TaskPriority::Medium, payload(TaskKind::Analytics))
                .await;
        }

        assert_eq!(store.admit(2).await.len(), 2);
        assert_eq!(store.running_count().await, 2);

        // Already at the cap: nothing more is admitted.
        assert!(store.admit(2).await.is_empty());

        // Raising the cap admits only the difference.
        assert_eq!(store.admit(3).await.len(), 1);
        assert_eq!(store.running_count().await, 3);
    }

    #[tokio::test]
    async fn test_admitted_task_has_started_at() {
        let store = TaskStore::new();
        let id = store
            .add_task(TaskPriority::Medium, payload(TaskKind::Analytics))
            .await;
        let admitted = store.admit(1).await;

        assert_eq!(admitted[0].id, id);
        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.started_at.unwrap() > task.created_at);
    }

    #[tokio::test]
    async fn test_complete_and_fail_require_running() {
        let store = TaskStore::new();
        let id = store
            .add_task(TaskPriority::Medium, payload(TaskKind::Analytics))
            .await;

        assert!(store.complete(id, json!({})).await.is_err());

        store.admit(1).await;
        let task = store.fail(id, "marketplace unavailable").await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("marketplace unavailable"));

        // Terminal records never change again.
        assert!(store.complete(id, json!({})).await.is_err());
        assert_eq!(store.get(id).await.unwrap().status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_clear_completed_is_selective_and_idempotent() {
        let store = TaskStore::new();
        let done = store
            .add_task(TaskPriority::Critical, payload(TaskKind::Orders))
            .await;
        let failed = store
            .add_task(TaskPriority::High, payload(TaskKind::Orders))
            .await;
        let running = store
            .add_task(TaskPriority::Medium, payload(TaskKind::Orders))
            .await;
        store.admit(3).await;
        let pending = store
            .add_task(TaskPriority::Low, payload(TaskKind::Orders))
            .await;

        store.complete(done, json!({"ok": true})).await.unwrap();
        store.fail(failed, "nope").await.unwrap();

        let running_before = store.get(running).await.unwrap();
        let pending_before = store.get(pending).await.unwrap();

        assert_eq!(store.clear_completed().await, 2);
        assert_eq!(store.clear_completed().await, 0);

        assert!(store.get(done).await.is_err());
        assert!(store.get(failed).await.is_err());
        assert_eq!(store.get(running).await.unwrap(), running_before);
        assert_eq!(store.get(pending).await.unwrap(), pending_before);
    }

    #[tokio::test]
    async fn test_subscribe_sees_mutations() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();
        store
            .add_task(TaskPriority::Low, payload(TaskKind::Orders))
            .await;
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        store.admit(1).await;
        assert!(rx.has_changed().unwrap());
    }
}
