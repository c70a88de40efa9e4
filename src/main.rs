//! nvtelemetry - NVML-based GPU inventory and telemetry reporter
//!
//! A command-line tool that reports NVIDIA GPUs grouped by model, together
//! with normalized attributes and live statistics.

use clap::Parser;
use nvtelemetry::cli::args::{generate_completions, Cli, Commands};
use nvtelemetry::commands::{run_inventory, run_reserve, run_stats, run_watch};
use nvtelemetry::config::{Config, ConfigBuilder};
use nvtelemetry::error::{AppError, DriverError, PollError};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    if let Err(e) = run(&cli) {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    match &cli.command {
        Commands::Inventory => run_inventory(&load_config(cli)?, cli.format),

        Commands::Stats => run_stats(&load_config(cli)?, cli.format),

        Commands::Watch(args) => run_watch(args, &load_config(cli)?, cli.format),

        Commands::Reserve(args) => run_reserve(args, &load_config(cli)?, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

/// Merge the config file with command-line overrides
fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let mut builder = ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .with_ignored_gpus(&cli.ignore);

    if let Commands::Watch(args) = &cli.command {
        builder = builder
            .with_fingerprint_period(args.fingerprint_period)
            .with_stats_period(args.stats_period);
    }

    let config = builder.build()?;
    if config.general.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }
    Ok(config)
}

fn driver_error(err: &AppError) -> Option<&DriverError> {
    match err {
        AppError::AdapterUnavailable(e) => Some(e),
        AppError::Poll(PollError::AdapterUnavailable(e))
        | AppError::Poll(PollError::EnumerationFailed(e))
        | AppError::Poll(PollError::QueryFailed { error: e, .. }) => Some(e),
        _ => None,
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match driver_error(err) {
        Some(DriverError::LibraryNotFound) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      On Linux, install the nvidia-utils package.");
        }
        Some(DriverError::InsufficientPermissions(_)) => {
            eprintln!();
            eprintln!("Hint: Try running with sudo or as root.");
        }
        _ => {}
    }

    if let AppError::UnknownDevice(_) = err {
        eprintln!();
        eprintln!("Hint: Run 'nvtelemetry inventory' to list reportable devices.");
    }
}
