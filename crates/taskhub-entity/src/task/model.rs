//! Task entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::types::TaskId;

use super::kind::TaskKind;
use super::payload::TaskPayload;
use super::status::{TaskPriority, TaskStatus};

/// Attempt bookkeeping carried alongside the payload.
///
/// A re-queued task is a brand new record; `retry_of` links it back to
/// the failed record it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    /// 1-based attempt number.
    pub attempt: u32,
    /// The failed task this record re-attempts.
    pub retry_of: Option<TaskId>,
}

impl Default for TaskMeta {
    fn default() -> Self {
        Self {
            attempt: 1,
            retry_of: None,
        }
    }
}

/// A unit of schedulable background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Which handler processes this task.
    pub kind: TaskKind,
    /// Admission priority.
    pub priority: TaskPriority,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Kind-specific input.
    pub payload: TaskPayload,
    /// Attempt bookkeeping.
    #[serde(default)]
    pub meta: TaskMeta,
    /// Handler output, present only when completed.
    pub result: Option<Value>,
    /// Failure reason, present only when failed.
    pub error: Option<String>,
    /// When the task was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the task was admitted.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task finished.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task stamped with the current time.
    pub fn new(priority: TaskPriority, payload: TaskPayload) -> Self {
        Self::with_meta(priority, payload, TaskMeta::default())
    }

    /// Create a pending task with explicit attempt metadata.
    pub fn with_meta(priority: TaskPriority, payload: TaskPayload, meta: TaskMeta) -> Self {
        Self {
            id: TaskId::new(),
            kind: payload.kind(),
            priority,
            status: TaskStatus::Pending,
            payload,
            meta,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock execution time, once the task has finished.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// `pending -> running`.
    pub fn mark_running(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(TaskStatus::Running)?;
        self.started_at = Some(after(self.created_at, now));
        Ok(())
    }

    /// `running -> completed`.
    pub fn mark_completed(&mut self, result: Value, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(self.finish_stamp(now));
        Ok(())
    }

    /// `running -> failed`.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(self.finish_stamp(now));
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::validation(format!(
                "Task {} cannot move from '{}' to '{}'",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    fn finish_stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        after(self.started_at.unwrap_or(self.created_at), now)
    }
}

/// Keep lifecycle timestamps strictly increasing even if the wall clock
/// steps backwards or two stamps land on the same tick.
fn after(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
