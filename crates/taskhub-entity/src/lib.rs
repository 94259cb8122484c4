//! Domain entity models for TaskHub.

pub mod task;

pub use task::{Task, TaskFilter, TaskKind, TaskMeta, TaskPayload, TaskPriority, TaskStatus};
