//! Trait definition for telemetry drivers
//!
//! The polling pipeline only talks to this trait, so the NVML adapter can be
//! swapped for a scripted driver in tests.

use crate::domain::{Classification, DeviceInfo, DeviceStatus};
use crate::error::DriverError;

use std::collections::BTreeMap;

/// Device telemetry source
///
/// Calls are not assumed to be thread-safe; callers serialize access.
pub trait TelemetryDriver: Send {
    /// Load and initialize the underlying library
    fn initialize(&mut self) -> Result<(), DriverError>;

    /// Release the underlying library
    fn shutdown(&mut self) -> Result<(), DriverError>;

    /// Installed driver version string
    fn system_driver_version(&self) -> Result<String, DriverError>;

    /// Every device handle on the host, keyed by UUID.
    ///
    /// Refreshes partition topology, so call it before per-device queries
    /// in each cycle.
    fn list_device_handles(&mut self) -> Result<BTreeMap<String, Classification>, DriverError>;

    /// Static information for one device
    fn static_info(&self, uuid: &str) -> Result<DeviceInfo, DriverError>;

    /// Static information plus current readings for one device
    fn static_and_dynamic_info(
        &self,
        uuid: &str,
    ) -> Result<(DeviceInfo, DeviceStatus), DriverError>;
}

impl<D: TelemetryDriver + ?Sized> TelemetryDriver for Box<D> {
    fn initialize(&mut self) -> Result<(), DriverError> {
        (**self).initialize()
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        (**self).shutdown()
    }

    fn system_driver_version(&self) -> Result<String, DriverError> {
        (**self).system_driver_version()
    }

    fn list_device_handles(&mut self) -> Result<BTreeMap<String, Classification>, DriverError> {
        (**self).list_device_handles()
    }

    fn static_info(&self, uuid: &str) -> Result<DeviceInfo, DriverError> {
        (**self).static_info(uuid)
    }

    fn static_and_dynamic_info(
        &self,
        uuid: &str,
    ) -> Result<(DeviceInfo, DeviceStatus), DriverError> {
        (**self).static_and_dynamic_info(uuid)
    }
}
