//! NVML abstraction layer
//!
//! Provides the [`TelemetryDriver`] trait and its NVML-backed implementation.

pub mod device;
pub mod ffi;
pub mod traits;
pub mod wrapper;

pub use device::{pcie_bandwidth_mb_per_s, NvmlDevice};
pub use traits::TelemetryDriver;
pub use wrapper::NvmlDriver;
