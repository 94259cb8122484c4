//! Ad-hoc batch run: enqueue tasks, drive the engine until idle, report.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde_json::Value;

use crate::output::{self, OutputFormat, TaskRow};
use taskhub_core::config::SchedulerConfigUpdate;
use taskhub_core::error::AppError;
use taskhub_entity::task::{TaskFilter, TaskKind, TaskPriority};
use taskhub_worker::{ConfigManager, MemorySettingsStore, TaskEngine};
use taskhub_worker::jobs::builtin_registry;

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Tasks to enqueue, as `kind` or `kind:priority`
    #[arg(required = true, value_parser = parse_task_spec)]
    pub tasks: Vec<TaskSpec>,

    /// JSON payload applied to every task
    #[arg(short, long, default_value = "{}")]
    pub payload: String,

    /// Simulated handler latency in milliseconds
    #[arg(long, default_value_t = 100)]
    pub latency_ms: u64,

    /// Override the concurrency cap for this run (not persisted)
    #[arg(long)]
    pub max_concurrent_tasks: Option<usize>,
}

/// A task to enqueue
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Task kind
    pub kind: TaskKind,
    /// Admission priority
    pub priority: TaskPriority,
}

fn parse_task_spec(raw: &str) -> Result<TaskSpec, String> {
    let (kind, priority) = match raw.split_once(':') {
        Some((kind, priority)) => (kind, Some(priority)),
        None => (raw, None),
    };

    let kind = TaskKind::from_str(kind).map_err(|e| e.message)?;
    let priority = match priority {
        Some(p) => TaskPriority::from_str(p).map_err(|e| e.message)?,
        None => TaskPriority::default(),
    };
    Ok(TaskSpec { kind, priority })
}

/// Execute the run command
pub async fn execute(args: &RunArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let payload: Value = serde_json::from_str(&args.payload)
        .map_err(|e| AppError::validation(format!("Invalid JSON payload: {}", e)))?;

    let persisted = ConfigManager::load(config.scheduler, super::open_settings(&config)).await?;
    let mut effective = persisted.get_config();
    if let Some(max) = args.max_concurrent_tasks {
        effective = effective.merged(&SchedulerConfigUpdate {
            max_concurrent_tasks: Some(max),
            ..Default::default()
        })?;
    }

    // overrides stay in memory; the settings file is only read
    let engine = TaskEngine::new(
        builtin_registry(Duration::from_millis(args.latency_ms)),
        ConfigManager::new(effective, Arc::new(MemorySettingsStore::new())),
    );

    for spec in &args.tasks {
        engine
            .add_task_json(spec.kind.as_str(), spec.priority, payload.clone())
            .await?;
    }

    drive_until_idle(&engine).await;

    let tasks = engine.list_tasks(TaskFilter::all()).await;
    let rows: Vec<TaskRow> = tasks.iter().rev().map(TaskRow::from).collect();
    output::print_list(&rows, format);

    let stats = engine.get_stats().await;
    match format {
        OutputFormat::Json => output::print_item(&stats, format),
        OutputFormat::Table => {
            println!();
            println!("Run Summary:");
            output::print_kv("Total", &stats.total.to_string());
            output::print_kv("Completed", &stats.completed.to_string());
            output::print_kv("Failed", &stats.failed.to_string());
            output::print_kv("Success rate", &format!("{:.1}%", stats.success_rate * 100.0));
        }
    }

    if stats.failed > 0 {
        output::print_warning(&format!("{} task(s) failed", stats.failed));
    }
    Ok(())
}

/// Tick until nothing is pending or running.
async fn drive_until_idle(engine: &TaskEngine) {
    let poll = Duration::from_millis(25);
    loop {
        engine.tick().await;
        let stats = engine.get_stats().await;
        if stats.pending == 0 && stats.running == 0 {
            break;
        }
        tokio::time::sleep(poll).await;
    }
    engine.shutdown().await;
}
