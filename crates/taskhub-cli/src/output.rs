//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use taskhub_entity::task::Task;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One task as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct TaskRow {
    /// Short task id
    #[tabled(rename = "ID")]
    pub id: String,
    /// Task kind
    #[tabled(rename = "Kind")]
    pub kind: String,
    /// Priority
    #[tabled(rename = "Priority")]
    pub priority: String,
    /// Status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Attempt number
    #[tabled(rename = "Attempt")]
    pub attempt: u32,
    /// Execution time
    #[tabled(rename = "Duration")]
    pub duration: String,
    /// Failure reason, if any
    #[tabled(rename = "Error")]
    pub error: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.short(),
            kind: task.kind.to_string(),
            priority: task.priority.to_string(),
            status: task.status.to_string(),
            attempt: task.meta.attempt,
            duration: task
                .duration()
                .map(|d| format!("{}ms", d.num_milliseconds()))
                .unwrap_or_else(|| "-".to_string()),
            error: task.error.clone().unwrap_or_default(),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}
