//! CLI command definitions and dispatch.

pub mod config;
pub mod run;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use taskhub_core::config::AppConfig;
use taskhub_core::error::AppError;
use taskhub_worker::FileSettingsStore;

/// TaskHub — in-process background task scheduler
#[derive(Debug, Parser)]
#[command(name = "taskhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scheduler configuration management
    Config(config::ConfigArgs),
    /// Enqueue a batch of tasks and run them to completion
    Run(run::RunArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
            Commands::Run(args) => run::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: open the settings store named by the config
pub fn open_settings(config: &AppConfig) -> Arc<FileSettingsStore> {
    Arc::new(FileSettingsStore::new(&config.settings.path))
}
