//! Command handlers
//!
//! Each handler builds an NVML-backed session from the merged config and
//! prints what it reports.

pub mod inventory;
pub mod reserve;
pub mod stats;
pub mod watch;

pub use inventory::run_inventory;
pub use reserve::run_reserve;
pub use stats::run_stats;
pub use watch::run_watch;

use crate::config::Config;
use crate::error::Result;
use crate::nvml::NvmlDriver;
use crate::services::TelemetrySession;

/// Create a session backed by the system NVML library
pub(crate) fn nvml_session(config: &Config) -> Result<TelemetrySession<NvmlDriver>> {
    let session_config = config.session_config()?;
    Ok(TelemetrySession::new(NvmlDriver::new(), session_config))
}
