//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// NVML-based GPU inventory and telemetry reporter
///
/// Reports NVIDIA GPUs (including MIG instances) grouped by model, with
/// normalized static attributes and live statistics.
#[derive(Parser, Debug)]
#[command(name = "nvtelemetry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NVTELEMETRY_CONFIG")]
    pub config: Option<String>,

    /// GPU UUID to leave out of every report (repeatable)
    #[arg(long = "ignore", global = true, value_name = "UUID")]
    pub ignore: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the GPU inventory once
    Inventory,

    /// Poll GPU statistics once
    Stats,

    /// Poll continuously and print every report until interrupted
    Watch(WatchArgs),

    /// Check devices against the inventory and print the container environment
    Reserve(ReserveArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Inventory poll interval in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub fingerprint_period: Option<u64>,

    /// Stats poll interval in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub stats_period: Option<u64>,

    /// Print only inventory reports
    #[arg(long, conflicts_with = "stats_only")]
    pub inventory_only: bool,

    /// Print only stats reports
    #[arg(long)]
    pub stats_only: bool,
}

/// Arguments for the reserve command
#[derive(Parser, Debug)]
pub struct ReserveArgs {
    /// GPU UUIDs to reserve
    #[arg(required = true, value_name = "UUID")]
    pub devices: Vec<String>,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
