//! Configuration management for objreplay.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use objreplay_store::StoreConfig;

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "objreplay";

/// Default dead-letter database file name.
const DEAD_LETTER_FILE_NAME: &str = "dead-letter.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `OBJREPLAY_`, double
///    underscore between section and key: `OBJREPLAY_REPLAY__CONCURRENCY`)
/// 2. TOML config file at `~/.config/objreplay/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source object storage.
    pub src: StoreConfig,
    /// Destination object storage.
    pub dst: StoreConfig,
    /// Journal configuration.
    pub journal: JournalConfig,
    /// Replay pipeline configuration.
    pub replay: ReplayConfig,
    /// Dead-letter reporter configuration.
    pub reporter: ReporterConfig,
}

/// Journal-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Path to the journal file (newline-delimited JSON records).
    pub path: Option<PathBuf>,
    /// Number of records handed to the replayer per batch.
    pub batch_size: usize,
    /// Path to the offset file used to resume a previous run.
    /// If unset, every run starts from the beginning of the journal.
    pub offset_path: Option<PathBuf>,
}

/// Replay pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Maximum number of concurrent object copies.
    pub concurrency: usize,
    /// Check the destination for presence before copying.
    pub check_dst: bool,
    /// Maximum attempts per storage operation.
    pub max_retries: usize,
    /// Upper bound for the retry backoff in seconds.
    pub max_backoff_secs: u64,
    /// Skip objects larger than this many bytes.
    pub size_limit: Option<u64>,
    /// Path to a file of sorted binary digests to exclude.
    pub exclude_file: Option<PathBuf>,
    /// Stop after consuming this many journal records.
    pub stop_after_objects: Option<u64>,
}

/// Dead-letter reporter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Enable the dead-letter store.
    pub enabled: bool,
    /// Path to the dead-letter database.
    /// Defaults to `~/.local/share/objreplay/dead-letter.db`
    pub database_path: Option<PathBuf>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: None,
            batch_size: 200,
            offset_path: None,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            check_dst: true,
            max_retries: 3,
            max_backoff_secs: 60,
            size_limit: None,
            exclude_file: None,
            stop_after_objects: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `OBJREPLAY_`, double
    ///    underscore between section and key)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        // Double underscore separates the section from the key, so keys
        // that contain underscores stay addressable:
        // OBJREPLAY_JOURNAL__BATCH_SIZE -> journal.batch_size
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("OBJREPLAY_").split("__"));

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
        if self.replay.concurrency == 0 {
            return Err(Error::ConfigValidation {
                message: "replay.concurrency must be greater than 0".to_string(),
            });
        }

        if self.replay.max_retries == 0 {
            return Err(Error::ConfigValidation {
                message: "replay.max_retries must be greater than 0".to_string(),
            });
        }

        if self.journal.batch_size == 0 {
            return Err(Error::ConfigValidation {
                message: "journal.batch_size must be greater than 0".to_string(),
            });
        }

        // A replay into the source tree would read and write the same objects.
        if let (
            StoreConfig::Pathslicing { root: src_root, .. },
            StoreConfig::Pathslicing { root: dst_root, .. },
        ) = (&self.src, &self.dst)
        {
            if src_root == dst_root {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "src and dst point at the same pathslicing root: {}",
                        src_root.display()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the dead-letter database path, resolving defaults if not set.
    #[must_use]
    pub fn dead_letter_path(&self) -> PathBuf {
        self.reporter
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DEAD_LETTER_FILE_NAME))
    }

    /// Get the retry backoff cap as a Duration.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.replay.max_backoff_secs)
    }
}
