//! Telemetry client
//!
//! Turns driver calls into per-poll record batches. A batch is all or
//! nothing: one failed device query fails the whole poll.

use crate::domain::{DeviceRecord, FingerprintRecord, StatsRecord};
use crate::error::{DriverError, PollError};
use crate::nvml::TelemetryDriver;

use std::sync::{Mutex, MutexGuard};

/// Driver version plus every reportable device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintData {
    pub driver_version: String,
    pub devices: Vec<FingerprintRecord>,
}

/// Serializes all driver access behind one lock
pub struct TelemetryClient<D: TelemetryDriver> {
    driver: Mutex<D>,
}

impl<D: TelemetryDriver> TelemetryClient<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Mutex::new(driver),
        }
    }

    fn driver(&self) -> MutexGuard<'_, D> {
        // A panic mid-call leaves no partial state in the driver worth guarding
        self.driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn initialize(&self) -> Result<(), DriverError> {
        self.driver().initialize()
    }

    pub fn shutdown(&self) -> Result<(), DriverError> {
        self.driver().shutdown()
    }

    /// Static data for every standalone device and MIG instance, sorted by UUID
    pub fn fingerprint_data(&self) -> Result<FingerprintData, PollError> {
        let mut driver = self.driver();

        let driver_version = driver
            .system_driver_version()
            .map_err(PollError::AdapterUnavailable)?;
        let handles = driver
            .list_device_handles()
            .map_err(PollError::EnumerationFailed)?;

        let mut devices = Vec::with_capacity(handles.len());
        for (uuid, classification) in &handles {
            if !classification.in_inventory() {
                continue;
            }
            let info = driver
                .static_info(uuid)
                .map_err(|error| PollError::QueryFailed {
                    uuid: uuid.clone(),
                    error,
                })?;
            devices.push(FingerprintRecord::from(info));
        }
        devices.sort_by(|a, b| a.uuid().cmp(b.uuid()));

        Ok(FingerprintData {
            driver_version,
            devices,
        })
    }

    /// Static data plus readings for every standalone device, sorted by UUID.
    ///
    /// MIG instances and their parents expose no usable telemetry and are
    /// skipped.
    pub fn stats_data(&self) -> Result<Vec<StatsRecord>, PollError> {
        let mut driver = self.driver();

        let handles = driver
            .list_device_handles()
            .map_err(PollError::EnumerationFailed)?;

        let mut records = Vec::with_capacity(handles.len());
        for (uuid, classification) in &handles {
            if !classification.in_stats() {
                continue;
            }
            let (info, status) =
                driver
                    .static_and_dynamic_info(uuid)
                    .map_err(|error| PollError::QueryFailed {
                        uuid: uuid.clone(),
                        error,
                    })?;
            records.push(StatsRecord::new(&info, status));
        }
        records.sort_by(|a, b| a.uuid().cmp(b.uuid()));

        Ok(records)
    }
}
