//! In-process task scheduling engine for TaskHub.
//!
//! This crate provides:
//! - An in-memory task store with atomic admission
//! - A periodic scheduler loop that admits pending tasks under a concurrency cap
//! - A task executor that dispatches tasks to registered handlers with a timeout
//! - A config manager backed by a pluggable settings store
//! - Point-in-time statistics and manual retry of failed tasks
//! - Built-in handler implementations used by the bundled binaries
//!
//! Task records live in memory only and are lost when the process exits;
//! only the scheduler configuration is persisted.

pub mod config_manager;
pub mod engine;
pub mod executor;
pub mod jobs;
pub mod retry;
pub mod scheduler;
pub mod settings;
pub mod stats;
pub mod store;
pub mod ticker;

pub use config_manager::{ConfigChange, ConfigManager};
pub use engine::TaskEngine;
pub use executor::{ExecutionFailure, HandlerError, HandlerRegistry, TaskExecutor, TaskHandler};
pub use scheduler::{LoopState, SchedulerLoop};
pub use settings::{FileSettingsStore, MemorySettingsStore};
pub use stats::TaskStats;
pub use store::TaskStore;
