//! Unified error types for nvtelemetry
//!
//! Errors are layered: the driver adapter reports [`DriverError`], a failed
//! polling cycle is a [`PollError`], and everything surfaces to callers as
//! [`AppError`].

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The telemetry library could not be initialized
    #[error("Telemetry adapter unavailable: {0}")]
    AdapterUnavailable(DriverError),

    /// A polling cycle failed
    #[error(transparent)]
    Poll(#[from] PollError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reservation requested a device that is not in the current inventory
    #[error("Unknown device(s) requested: {0}")]
    UnknownDevice(String),

    /// The session was started twice or used after stopping
    #[error("Session error: {0}")]
    Session(String),

    /// IO error (output, file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a telemetry driver adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// NVML shared library could not be loaded
    #[error("could not load NVML library. Is the NVIDIA driver installed?")]
    LibraryNotFound,

    /// Failed to initialize NVML
    #[error("Failed to initialize NVML: {0}")]
    InitializationFailed(String),

    /// A query was issued before initialize() or after shutdown()
    #[error("Driver is not initialized")]
    NotInitialized,

    /// Device not found by UUID
    #[error("GPU device not found with UUID: {0}")]
    DeviceNotFound(String),

    /// Operation not supported by this GPU
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Insufficient permissions
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// GPU is lost (fallen off bus, etc.)
    #[error("GPU is lost or has become inaccessible")]
    GpuLost,

    /// Unknown NVML error
    #[error("NVML error: {0}")]
    Unknown(String),
}

/// A failed polling cycle. The next tick runs normally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The library is not usable (driver version query failed)
    #[error("adapter unavailable: {0}")]
    AdapterUnavailable(DriverError),

    /// Listing device handles failed
    #[error("device enumeration failed: {0}")]
    EnumerationFailed(DriverError),

    /// A per-device query failed, failing the whole batch
    #[error("query for device {uuid} failed: {error}")]
    QueryFailed { uuid: String, error: DriverError },
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_not_found_display() {
        let err = DriverError::LibraryNotFound;
        assert!(err.to_string().contains("could not load NVML library"));
    }

    #[test]
    fn test_query_failed_display() {
        let err = PollError::QueryFailed {
            uuid: "GPU-1".to_string(),
            error: DriverError::GpuLost,
        };
        let msg = err.to_string();
        assert!(msg.contains("GPU-1"));
        assert!(msg.contains("lost"));
    }

    #[test]
    fn test_driver_error_reported_once() {
        use std::error::Error as _;

        let err = PollError::EnumerationFailed(DriverError::GpuLost);
        assert!(err.to_string().contains("lost"));
        assert!(err.source().is_none());

        let app_err: AppError = err.into();
        assert!(app_err.to_string().starts_with("device enumeration failed"));
        assert!(app_err.source().is_none());

        let unavailable = AppError::AdapterUnavailable(DriverError::LibraryNotFound);
        assert!(unavailable.to_string().contains("could not load NVML library"));
        assert!(unavailable.source().is_none());
    }

    #[test]
    fn test_poll_error_conversion() {
        let app_err: AppError = PollError::EnumerationFailed(DriverError::NotInitialized).into();
        assert!(matches!(app_err, AppError::Poll(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "polling.stats_period".to_string(),
            message: "must be greater than zero".to_string(),
        };
        assert!(err.to_string().contains("polling.stats_period"));
    }
}
