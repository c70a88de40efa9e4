//! Mock implementations for testing
//!
//! Provides a scripted telemetry driver for unit testing without real
//! hardware. A [`MockHandle`] keeps access to the driver's state after the
//! driver has been moved into a client or session.

use crate::domain::{Classification, DeviceInfo, DeviceStatus, FeatureState};
use crate::error::DriverError;
use crate::nvml::TelemetryDriver;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// A device known to the mock driver
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub classification: Classification,
    pub info: DeviceInfo,
    pub status: DeviceStatus,
}

impl MockDevice {
    /// Create a fully populated standalone device
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        let info = DeviceInfo::new(
            uuid,
            "00000000:3B:00.0",
            FeatureState::Disabled,
            FeatureState::Enabled,
        )
        .with_name(name)
        .with_memory_mib(16384)
        .with_power_w(300)
        .with_bar1_mib(256)
        .with_pci_bandwidth(16384)
        .with_clocks(1590, 5001);

        let status = DeviceStatus {
            power_usage_w: Some(150),
            temperature_c: Some(45),
            gpu_utilization: Some(30),
            memory_utilization: Some(10),
            encoder_utilization: Some(0),
            decoder_utilization: Some(0),
            bar1_used_mib: Some(4),
            used_memory_mib: Some(1024),
            ecc_errors_l1_cache: Some(0),
            ecc_errors_l2_cache: Some(0),
            ecc_errors_device: Some(0),
        };

        Self {
            classification: Classification::Standalone,
            info,
            status,
        }
    }

    /// Builder: set classification
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Builder: replace static info
    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Builder: replace dynamic readings
    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    driver_version: String,
    devices: BTreeMap<String, MockDevice>,
    initialized: bool,
    init_error: Option<DriverError>,
    version_error: Option<DriverError>,
    list_error: Option<DriverError>,
    query_errors: HashMap<String, DriverError>,
    shutdown_calls: usize,
    list_calls: usize,
}

/// Scripted telemetry driver
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

/// Shared access to a [`MockDriver`]'s state
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDriver {
    /// Create a driver with no devices
    pub fn new() -> Self {
        let state = MockState {
            driver_version: "535.154.05".to_string(),
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Create a driver with the given devices
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let driver = Self::new();
        driver.handle().set_devices(devices);
        driver
    }

    /// Get a handle for changing state later
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Replace the device set
    pub fn set_devices(&self, devices: Vec<MockDevice>) {
        lock(&self.state).devices = devices
            .into_iter()
            .map(|d| (d.info.uuid.clone(), d))
            .collect();
    }

    /// Add or replace one device
    pub fn add_device(&self, device: MockDevice) {
        lock(&self.state)
            .devices
            .insert(device.info.uuid.clone(), device);
    }

    pub fn remove_device(&self, uuid: &str) {
        lock(&self.state).devices.remove(uuid);
    }

    pub fn set_driver_version(&self, version: impl Into<String>) {
        lock(&self.state).driver_version = version.into();
    }

    /// Make initialize() fail
    pub fn fail_initialize(&self, error: Option<DriverError>) {
        lock(&self.state).init_error = error;
    }

    /// Make system_driver_version() fail
    pub fn fail_driver_version(&self, error: Option<DriverError>) {
        lock(&self.state).version_error = error;
    }

    /// Make list_device_handles() fail
    pub fn fail_listing(&self, error: Option<DriverError>) {
        lock(&self.state).list_error = error;
    }

    /// Make queries for one device fail
    pub fn fail_query(&self, uuid: &str, error: Option<DriverError>) {
        let mut state = lock(&self.state);
        match error {
            Some(e) => state.query_errors.insert(uuid.to_string(), e),
            None => state.query_errors.remove(uuid),
        };
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.state).initialized
    }

    pub fn shutdown_calls(&self) -> usize {
        lock(&self.state).shutdown_calls
    }

    pub fn list_calls(&self) -> usize {
        lock(&self.state).list_calls
    }
}

impl MockState {
    fn ensure_initialized(&self) -> Result<(), DriverError> {
        if self.initialized {
            Ok(())
        } else {
            Err(DriverError::NotInitialized)
        }
    }

    fn device(&self, uuid: &str) -> Result<&MockDevice, DriverError> {
        self.ensure_initialized()?;
        if let Some(e) = self.query_errors.get(uuid) {
            return Err(e.clone());
        }
        self.devices
            .get(uuid)
            .ok_or_else(|| DriverError::DeviceNotFound(uuid.to_string()))
    }
}

impl TelemetryDriver for MockDriver {
    fn initialize(&mut self) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if let Some(e) = &state.init_error {
            return Err(e.clone());
        }
        state.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.initialized = false;
        state.shutdown_calls += 1;
        Ok(())
    }

    fn system_driver_version(&self) -> Result<String, DriverError> {
        let state = lock(&self.state);
        state.ensure_initialized()?;
        match &state.version_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.driver_version.clone()),
        }
    }

    fn list_device_handles(&mut self) -> Result<BTreeMap<String, Classification>, DriverError> {
        let mut state = lock(&self.state);
        state.ensure_initialized()?;
        state.list_calls += 1;
        if let Some(e) = &state.list_error {
            return Err(e.clone());
        }
        Ok(state
            .devices
            .iter()
            .map(|(uuid, d)| (uuid.clone(), d.classification))
            .collect())
    }

    fn static_info(&self, uuid: &str) -> Result<DeviceInfo, DriverError> {
        let state = lock(&self.state);
        state.device(uuid).map(|d| d.info.clone())
    }

    fn static_and_dynamic_info(
        &self,
        uuid: &str,
    ) -> Result<(DeviceInfo, DeviceStatus), DriverError> {
        let state = lock(&self.state);
        state
            .device(uuid)
            .map(|d| (d.info.clone(), d.status.clone()))
    }
}
