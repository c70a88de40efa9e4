//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::error::ConfigError;
use crate::services::SessionConfig;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Poll loop settings
    pub polling: PollingConfig,
    /// Device selection settings
    pub devices: DevicesConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Report GPUs at all
    pub enabled: bool,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verbose: false,
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Inventory poll interval in seconds
    pub fingerprint_period_seconds: u64,
    /// Stats poll interval in seconds
    pub stats_period_seconds: u64,
    /// Reports buffered per stream
    pub channel_capacity: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            fingerprint_period_seconds: 60,
            stats_period_seconds: 5,
            channel_capacity: 1,
        }
    }
}

/// Device selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DevicesConfig {
    /// UUIDs never reported
    pub ignored_gpu_ids: Vec<String>,
}

impl Config {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.fingerprint_period_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "polling.fingerprint_period_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.polling.stats_period_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "polling.stats_period_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.polling.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "polling.channel_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(id) = self.devices.ignored_gpu_ids.iter().find(|id| id.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "devices.ignored_gpu_ids".to_string(),
                message: format!("invalid device id '{}'", id),
            });
        }
        Ok(())
    }

    /// Convert to session settings
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        self.validate()?;
        Ok(SessionConfig {
            enabled: self.general.enabled,
            fingerprint_period: Duration::from_secs(self.polling.fingerprint_period_seconds),
            stats_period: Duration::from_secs(self.polling.stats_period_seconds),
            ignored_gpu_ids: self.devices.ignored_gpu_ids.iter().cloned().collect(),
            channel_capacity: self.polling.channel_capacity,
        })
    }
}
