//! Pipe configuration.
//!
//! Stored as `pipe.json` in a directory chosen by the caller. Every field has
//! a default, so a missing file or a partial file both load cleanly.

use crate::error::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use const_format::concatcp;
use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "pipe.json";
const CONFIG_TEMP_FILE_NAME: &str = concatcp!(CONFIG_FILE_NAME, ".tmp");
const CONFIG_VERSION: u32 = 1;
const MAX_POLL_WINDOW_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Exclusive directory for pipe files. Ignored on Windows.
    #[serde(default)]
    pub pipe_dir: Option<PathBuf>,

    /// Longest a single read may wait for data to arrive.
    #[serde(default = "default_poll_window_ms")]
    pub poll_window_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Half-written connections are dropped after this long.
    #[serde(default = "default_pending_connection_ttl_ms")]
    pub pending_connection_ttl_ms: u64,

    /// Total time a second instance keeps retrying before starting on its own.
    #[serde(default = "default_send_retry_budget_ms")]
    pub send_retry_budget_ms: u64,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            pipe_dir: None,
            poll_window_ms: default_poll_window_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            pending_connection_ttl_ms: default_pending_connection_ttl_ms(),
            send_retry_budget_ms: default_send_retry_budget_ms(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_poll_window_ms() -> u64 {
    10
}
fn default_write_timeout_ms() -> u64 {
    1_500
}
fn default_pending_connection_ttl_ms() -> u64 {
    5_000
}
fn default_send_retry_budget_ms() -> u64 {
    6_500
}

impl PipeConfig {
    /// Load config from `{config_dir}/pipe.json`.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable or invalid.
    #[track_caller]
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Pipe config not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read pipe config: {e}");
            ConfigError::Read {
                path: config_path.clone(),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            }
        })?;

        let config: PipeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse pipe config: {e}");
            ConfigError::Parse {
                path: config_path.clone(),
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        config.validate()?;

        info!("Pipe config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to `{config_dir}/pipe.json` via temp file + rename.
    #[track_caller]
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            path: config_dir.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(CONFIG_TEMP_FILE_NAME);

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            path: temp_path.clone(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            path: config_path.clone(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        info!("Pipe config saved to {}", config_path.display());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::Validation {
                reason: format!(
                    "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                    self.version
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.poll_window_ms > MAX_POLL_WINDOW_MS {
            return Err(ConfigError::Validation {
                reason: format!(
                    "Invalid poll window: {}ms (must be at most {MAX_POLL_WINDOW_MS}ms)",
                    self.poll_window_ms
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.write_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                reason: String::from("write_timeout_ms must be greater than zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.pending_connection_ttl_ms == 0 {
            return Err(ConfigError::Validation {
                reason: String::from("pending_connection_ttl_ms must be greater than zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(dir) = &self.pipe_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation {
                reason: String::from("pipe_dir cannot be an empty path"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    pub fn poll_window(&self) -> Duration {
        Duration::from_millis(self.poll_window_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn pending_connection_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_connection_ttl_ms)
    }

    pub fn send_retry_budget(&self) -> Duration {
        Duration::from_millis(self.send_retry_budget_ms)
    }
}
