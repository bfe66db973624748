//! Configuration management for regbook.
//!
//! Configuration is loaded with figment from TOML and environment
//! sources over built-in defaults, then validated.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "regbook";

/// Default ledger database file name.
const DATABASE_FILE_NAME: &str = "ledger.db";

/// Application configuration.
///
/// Loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `REGBOOK_`)
/// 2. TOML config file at `~/.config/regbook/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Mirror configuration.
    pub mirror: MirrorConfig,
    /// Export configuration.
    pub export: ExportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the ledger database file.
    /// Defaults to `~/.local/share/regbook/ledger.db`
    pub database_path: Option<PathBuf>,
}

/// Mirror-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Seconds between snapshot ticks.
    pub interval_secs: u64,
}

/// Export-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory export files are written into.
    /// Defaults to the current working directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        // The original deployment disagreed between 10s and 30s; the
        // shorter observed interval is the default.
        Self { interval_secs: 10 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("REGBOOK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.mirror.interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "mirror.interval_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the export output directory, resolving defaults if not set.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the mirror interval as a Duration.
    #[must_use]
    pub fn mirror_interval(&self) -> Duration {
        Duration::from_secs(self.mirror.interval_secs)
    }
}
