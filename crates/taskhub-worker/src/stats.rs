//! Point-in-time task statistics.

use serde::{Deserialize, Serialize};

use taskhub_entity::task::{Task, TaskStatus};

/// Counts by status plus the success rate of finished tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Every task in the store.
    pub total: usize,
    /// Tasks waiting for admission.
    pub pending: usize,
    /// Tasks currently executing.
    pub running: usize,
    /// Tasks that finished successfully.
    pub completed: usize,
    /// Tasks that failed or timed out.
    pub failed: usize,
    /// `completed / (completed + failed)`, or `0.0` when nothing has finished.
    pub success_rate: f64,
}

impl TaskStats {
    /// Tally a set of tasks.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut stats = Self::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats.success_rate = success_rate(stats.completed, stats.failed);
        stats
    }

    /// Tasks in a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}

fn success_rate(completed: usize, failed: usize) -> f64 {
    let finished = completed + failed;
    if finished == 0 {
        0.0
    } else {
        completed as f64 / finished as f64
    }
}
