//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod scheduler;
pub mod settings;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::scheduler::SchedulerConfig;
use self::settings::SettingsConfig;

use crate::error::AppError;

pub use self::scheduler::SchedulerConfigUpdate;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the TOML
/// configuration file merged with `TASKHUB__*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default scheduler settings, used when nothing has been persisted yet.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Persisted settings location.
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error; every field has a default.
    /// Environment variables such as `TASKHUB__SCHEDULER__INTERVAL_MS`
    /// override file values.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("TASKHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.scheduler.validate()?;
        Ok(app)
    }
}
