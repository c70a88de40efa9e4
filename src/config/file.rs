//! TOML config files
//!
//! An explicit path must load; default locations are tried in order and
//! skipped when missing or invalid.

use crate::config::Config;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Loader for `nvtelemetry` TOML files
pub struct ConfigFile;

impl ConfigFile {
    /// Load and validate one file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the first default location that parses
    pub fn load_default() -> Option<Config> {
        for path in Self::default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Search order for config files, system-wide first
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/nvtelemetry/config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("nvtelemetry/config.toml"));
        }

        paths.push(PathBuf::from("nvtelemetry.toml"));
        paths.push(PathBuf::from(".nvtelemetry.toml"));

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_paths_order() {
        let paths = ConfigFile::default_paths();
        assert_eq!(paths[0], PathBuf::from("/etc/nvtelemetry/config.toml"));
        assert!(paths.iter().any(|p| p.ends_with("nvtelemetry.toml")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigFile::load("/nonexistent/nvtelemetry/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[general]\nenabled = false\n\n[polling]\nstats_period_seconds = 2"
        )
        .unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert!(!config.general.enabled);
        assert_eq!(config.polling.stats_period_seconds, 2);
        assert_eq!(config.polling.fingerprint_period_seconds, 60);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[polling\nstats_period_seconds = ").unwrap();

        let result = ConfigFile::load(file.path());
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[polling]\nstats_period_seconds = 0").unwrap();

        let result = ConfigFile::load(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
