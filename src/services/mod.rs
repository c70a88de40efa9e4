//! Service layer for GPU telemetry
//!
//! The client gathers record batches from a driver; grouping, normalization
//! and assembly turn them into reports; the session runs the poll loops.

pub mod client;
pub mod fingerprint;
pub mod grouping;
pub mod inventory;
pub mod normalize;
pub mod session;
pub mod stats;

pub use client::{FingerprintData, TelemetryClient};
pub use inventory::InventoryTracker;
pub use session::{ReportStreams, SessionConfig, TelemetrySession};
