//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{ContainerReservation, FingerprintResponse, StatsResponse};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    handle.flush()
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

impl TableDisplay for FingerprintResponse {
    fn to_table(&self) -> String {
        let mut output = format!("Driver Version: {}\n", self.driver_version);
        let count: usize = self.groups.iter().map(|g| g.devices.len()).sum();
        output.push_str(&format!("GPUs Found: {}\n", count));

        for group in &self.groups {
            output.push_str(&format!("\n{} ({} device(s))\n", group.name, group.devices.len()));
            for device in &group.devices {
                output.push_str(&format!(
                    "  {} [{}]\n",
                    device.id, device.hw_locality.pci_bus_id
                ));
            }
            for (name, value) in &group.attributes {
                output.push_str(&format!("  {:<18} {}\n", name, value));
            }
        }

        output
    }

    fn to_compact(&self) -> String {
        self.groups
            .iter()
            .map(|g| format!("{}:{}", g.name, g.device_ids().collect::<Vec<_>>().join(",")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TableDisplay for StatsResponse {
    fn to_table(&self) -> String {
        let mut output = String::new();

        for group in &self.groups {
            output.push_str(&format!("{}\n", group.name));
            for (uuid, stats) in &group.instance_stats {
                output.push_str(&format!(
                    "  {} @ {}\n",
                    uuid,
                    stats.timestamp.format("%Y-%m-%d %H:%M:%S")
                ));
                for (name, value) in &stats.stats {
                    output.push_str(&format!("    {:<20} {}\n", name, value));
                }
            }
        }

        if output.is_empty() {
            output.push_str("No GPU stats available");
        }
        output
    }

    fn to_compact(&self) -> String {
        self.groups
            .iter()
            .flat_map(|g| g.instance_stats.iter())
            .map(|(uuid, stats)| format!("{}:{}", uuid, stats.summary))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TableDisplay for ContainerReservation {
    fn to_table(&self) -> String {
        self.envs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
