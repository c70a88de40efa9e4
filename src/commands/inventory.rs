//! Inventory command implementation
//!
//! Polls the GPU inventory once and prints the device groups.

use crate::cli::args::OutputFormat;
use crate::cli::output::print_output;
use crate::commands::nvml_session;
use crate::config::Config;
use crate::error::Result;

/// Execute the inventory command
pub fn run_inventory(config: &Config, format: OutputFormat) -> Result<()> {
    let mut session = nvml_session(config)?;
    let response = session.poll_fingerprint()?;
    print_output(&response, format)?;
    Ok(())
}
