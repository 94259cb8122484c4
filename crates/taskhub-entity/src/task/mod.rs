//! Background task domain entities.

pub mod filter;
pub mod kind;
pub mod model;
pub mod payload;
pub mod status;

pub use filter::TaskFilter;
pub use kind::TaskKind;
pub use model::{Task, TaskMeta};
pub use payload::TaskPayload;
pub use status::{TaskPriority, TaskStatus};
