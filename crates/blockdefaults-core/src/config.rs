//! Application configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` fills any missing section or field from
//! `Default::default()`, so an empty or partial `config.toml` is valid and
//! older files keep working when new options are added.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gateway::DEFAULT_SETTING_KEY;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where block defaults are persisted
    pub storage: StorageConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from_default_path().unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            Self::default()
        })
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("blockdefaults").join("config.toml"))
    }

    /// Saves the config to a file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Settings file (None = platform data directory)
    pub path: Option<PathBuf>,

    /// Setting key the configuration blob is stored under
    pub setting_key: String,
}

impl StorageConfig {
    /// Returns the settings file to use.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("blockdefaults").join("settings.json"))
            }
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            setting_key: DEFAULT_SETTING_KEY.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no `-v` flag is given: error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
