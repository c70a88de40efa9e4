//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from an explicit file, or the default locations.
    ///
    /// An explicit path that fails to load is an error; missing default
    /// files are not.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI fingerprint period
    pub fn with_fingerprint_period(mut self, seconds: Option<u64>) -> Self {
        if let Some(s) = seconds {
            self.config.polling.fingerprint_period_seconds = s;
        }
        self
    }

    /// Override with CLI stats period
    pub fn with_stats_period(mut self, seconds: Option<u64>) -> Self {
        if let Some(s) = seconds {
            self.config.polling.stats_period_seconds = s;
        }
        self
    }

    /// Add CLI ignored GPU ids to those from the file
    pub fn with_ignored_gpus(mut self, ids: &[String]) -> Self {
        for id in ids {
            if !self.config.devices.ignored_gpu_ids.contains(id) {
                self.config.devices.ignored_gpu_ids.push(id.clone());
            }
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
