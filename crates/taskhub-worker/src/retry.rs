//! Manual re-queue of failed tasks.

use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_entity::task::{Task, TaskMeta, TaskStatus};

/// Build the record that re-attempts `failed`.
///
/// The new record keeps the kind, priority and payload, carries
/// `attempt + 1` and links back through `retry_of`. A task may be
/// re-queued at most `retry_attempts` times in total.
pub fn plan_retry(failed: &Task, retry_attempts: u32) -> AppResult<Task> {
    if failed.status != TaskStatus::Failed {
        return Err(AppError::validation(format!(
            "Task {} is {}; only failed tasks can be retried",
            failed.id, failed.status
        )));
    }

    if failed.meta.attempt > retry_attempts {
        return Err(AppError::validation(format!(
            "Task {} has used all {} retry attempt(s)",
            failed.id, retry_attempts
        )));
    }

    let meta = TaskMeta {
        attempt: failed.meta.attempt + 1,
        retry_of: Some(failed.id),
    };
    Ok(Task::with_meta(failed.priority, failed.payload.clone(), meta))
}
