//! Filter used when listing tasks.

use serde::{Deserialize, Serialize};

use super::kind::TaskKind;
use super::model::Task;
use super::status::TaskStatus;

/// Optional status/kind restriction for task listings.
///
/// An empty filter matches every task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Only tasks with this status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Only tasks of this kind.
    #[serde(default)]
    pub kind: Option<TaskKind>,
}

impl TaskFilter {
    /// Match every task.
    pub fn all() -> Self {
        Self::default()
    }

    /// Shorthand for a status-only filter.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            kind: None,
        }
    }

    /// Shorthand for a kind-only filter.
    pub fn kind(kind: TaskKind) -> Self {
        Self {
            status: None,
            kind: Some(kind),
        }
    }

    /// Whether `task` passes this filter.
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| s == task.status) && self.kind.is_none_or(|k| k == task.kind)
    }
}
