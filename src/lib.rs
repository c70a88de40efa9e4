//! nvtelemetry - NVML-based GPU telemetry library
//!
//! Polls NVIDIA GPUs (including MIG instances) through NVML and turns the
//! raw, partially available readings into grouped inventory and stats
//! reports.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Device records, attributes and reports
//! - [`error`]: Error types
//! - [`nvml`]: Driver abstraction and the NVML adapter
//! - [`services`]: Polling client, normalization and the poll session

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod nvml;
pub mod services;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
pub use services::{SessionConfig, TelemetrySession};
