//! Scheduler configuration CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use taskhub_core::config::SchedulerConfigUpdate;
use taskhub_core::config::scheduler::SchedulerConfig;
use taskhub_core::error::AppError;
use taskhub_core::traits::SettingsStore;
use taskhub_worker::ConfigManager;
use taskhub_worker::config_manager::CONFIG_KEY;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective scheduler configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Update persisted scheduler settings
    Set(SetArgs),
    /// Forget persisted scheduler settings and fall back to the file defaults
    Reset,
}

/// Fields accepted by `config set`; omitted fields keep their value
#[derive(Debug, Args)]
pub struct SetArgs {
    /// Enable or disable the scheduler loop
    #[arg(long)]
    pub enabled: Option<bool>,
    /// Tick period in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Maximum simultaneously running tasks
    #[arg(long)]
    pub max_concurrent_tasks: Option<usize>,
    /// Manual retries allowed per failed task
    #[arg(long)]
    pub retry_attempts: Option<u32>,
    /// Per-task timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl From<&SetArgs> for SchedulerConfigUpdate {
    fn from(args: &SetArgs) -> Self {
        Self {
            enabled: args.enabled,
            interval_ms: args.interval_ms,
            max_concurrent_tasks: args.max_concurrent_tasks,
            retry_attempts: args.retry_attempts,
            timeout_ms: args.timeout_ms,
        }
    }
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let settings = super::open_settings(&config);

    match &args.command {
        ConfigCommand::Show => {
            let manager = ConfigManager::load(config.scheduler, settings).await?;
            print_scheduler(&manager.get_config(), format);
        }
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration '{}' is valid", config_path));
            output::print_kv("Settings file", &config.settings.path);
            output::print_kv("Log level", &config.logging.level);
            output::print_kv("Log format", &config.logging.format);
        }
        ConfigCommand::Set(set) => {
            let update = SchedulerConfigUpdate::from(set);
            if update.is_empty() {
                output::print_warning("Nothing to update");
                return Ok(());
            }

            let manager = ConfigManager::load(config.scheduler, settings).await?;
            let change = manager.update_config(update).await?;
            if change.is_noop() {
                output::print_warning("Configuration already up to date");
            } else {
                output::print_success("Scheduler configuration updated");
            }
            print_scheduler(&change.current, format);
        }
        ConfigCommand::Reset => {
            let store: Arc<dyn SettingsStore> = settings;
            if store.delete(CONFIG_KEY).await? {
                output::print_success("Persisted scheduler configuration removed");
            } else {
                output::print_warning("No persisted scheduler configuration found");
            }
        }
    }

    Ok(())
}

fn print_scheduler(config: &SchedulerConfig, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(config, format),
        OutputFormat::Table => {
            println!("Scheduler Configuration:");
            output::print_kv("Enabled", &config.enabled.to_string());
            output::print_kv("Interval", &format!("{}ms", config.interval_ms));
            output::print_kv("Max concurrent tasks", &config.max_concurrent_tasks.to_string());
            output::print_kv("Retry attempts", &config.retry_attempts.to_string());
            output::print_kv("Timeout", &format!("{}ms", config.timeout_ms));
        }
    }
}
