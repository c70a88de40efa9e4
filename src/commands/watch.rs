//! Watch command implementation
//!
//! Runs both poll loops and prints every report until Ctrl-C.

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::cli::output::{print_output, TableDisplay};
use crate::commands::nvml_session;
use crate::config::Config;
use crate::error::{AppError, PollError, Result};

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const IDLE_SLEEP: Duration = Duration::from_millis(100);

/// Execute the watch command
pub fn run_watch(args: &WatchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Session(format!("failed to install signal handler: {}", e)))?;

    let mut session = nvml_session(config)?;
    let streams = session.start()?;

    let mut fingerprints_open = true;
    let mut stats_open = true;

    while running.load(Ordering::SeqCst) && (fingerprints_open || stats_open) {
        let mut idle = true;

        // Both streams are always drained so neither loop stalls
        if fingerprints_open {
            match next(&streams.fingerprints) {
                Some(Some(report)) => {
                    idle = false;
                    if !args.stats_only {
                        print_report(report, format)?;
                    }
                }
                Some(None) => {}
                None => fingerprints_open = false,
            }
        }

        if stats_open {
            match next(&streams.stats) {
                Some(Some(report)) => {
                    idle = false;
                    if !args.inventory_only {
                        print_report(report, format)?;
                    }
                }
                Some(None) => {}
                None => stats_open = false,
            }
        }

        if idle {
            thread::sleep(IDLE_SLEEP);
        }
    }

    session.stop();
    Ok(())
}

/// `None` once the stream is closed, `Some(None)` when nothing is pending
fn next<T>(rx: &Receiver<T>) -> Option<Option<T>> {
    match rx.try_recv() {
        Ok(report) => Some(Some(report)),
        Err(TryRecvError::Empty) => Some(None),
        Err(TryRecvError::Disconnected) => None,
    }
}

fn print_report<T: Serialize + TableDisplay>(
    report: std::result::Result<T, PollError>,
    format: OutputFormat,
) -> Result<()> {
    match report {
        Ok(data) => print_output(&data, format)?,
        Err(e) => eprintln!("Poll failed: {}", e),
    }
    Ok(())
}
