//! Reserve command implementation
//!
//! Validates device ids against a fresh inventory and prints the container
//! environment that exposes them.

use crate::cli::args::{OutputFormat, ReserveArgs};
use crate::cli::output::print_output;
use crate::commands::nvml_session;
use crate::config::Config;
use crate::error::Result;

/// Execute the reserve command
pub fn run_reserve(args: &ReserveArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let mut session = nvml_session(config)?;
    session.poll_fingerprint()?;
    let reservation = session.reserve(&args.devices)?;
    print_output(&reservation, format)?;
    Ok(())
}
