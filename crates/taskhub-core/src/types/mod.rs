//! Shared value types.

pub mod id;

pub use id::TaskId;
