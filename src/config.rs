use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;

/// Environment override for the completion API key
pub const API_KEY_ENV: &str = "PEAKFORM_API_KEY";

/// Environment override for the database path
pub const DB_PATH_ENV: &str = "PEAKFORM_DB";

/// Main application configuration.
///
/// Constructed once at startup and passed explicitly to the components that
/// need it; there is no global settings object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log store settings
    pub store: StoreSettings,

    /// Completion endpoint settings
    pub model: ModelSettings,

    /// Logging settings
    pub logging: LogConfig,
}

/// Log store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database path
    pub db_path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let db_path = dirs::data_dir()
            .map(|dir| dir.join("peakform").join("peakform.db"))
            .unwrap_or_else(|| PathBuf::from("peakform.db"));
        StoreSettings { db_path }
    }
}

/// Completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// API key; the PEAKFORM_API_KEY environment variable takes precedence
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model identifier sent with each request
    pub model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            api_key: None,
            base_url: "https://api.fireworks.ai/inference/v1".to_string(),
            model: "accounts/fireworks/models/gpt-oss-120b".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit path, or from the default
    /// location if it exists, falling back to defaults. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("peakform").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("peakform.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.model.api_key = Some(key);
            }
        }
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.is_empty() {
                self.store.db_path = PathBuf::from(path);
            }
        }
    }
}
