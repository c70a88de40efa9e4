//! Stats command implementation
//!
//! Stats cover only inventoried devices, so the inventory is polled first.

use crate::cli::args::OutputFormat;
use crate::cli::output::print_output;
use crate::commands::nvml_session;
use crate::config::Config;
use crate::error::Result;

/// Execute the stats command
pub fn run_stats(config: &Config, format: OutputFormat) -> Result<()> {
    let mut session = nvml_session(config)?;
    session.poll_fingerprint()?;
    let response = session.poll_stats()?;
    print_output(&response, format)?;
    Ok(())
}
