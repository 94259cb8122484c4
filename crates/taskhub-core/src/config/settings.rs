//! Settings store configuration.

use serde::{Deserialize, Serialize};

/// Where persisted settings (the scheduler config) live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Path to the JSON settings file.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

fn default_path() -> String {
    "data/settings.json".to_string()
}
