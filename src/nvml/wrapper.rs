//! NVML driver implementation
//!
//! Owns the NVML library handle, discovers MIG topology and answers
//! per-device queries by UUID.

use crate::domain::{Classification, DeviceInfo, DeviceStatus};
use crate::error::DriverError;
use crate::nvml::device::{mig_enabled, NvmlDevice};
use crate::nvml::ffi::RawNvml;
use crate::nvml::traits::TelemetryDriver;

use nvml_wrapper::Nvml;
use std::collections::{BTreeMap, HashMap};

/// Telemetry driver backed by NVML
#[derive(Default)]
pub struct NvmlDriver {
    nvml: Option<Nvml>,
    raw: Option<RawNvml>,
    /// MIG instance UUID to its parent's PCI bus ID
    partitions: HashMap<String, String>,
}

impl NvmlDriver {
    /// Create an uninitialized driver
    pub fn new() -> Self {
        Self::default()
    }

    fn libraries(&self) -> Result<(&Nvml, &RawNvml), DriverError> {
        match (&self.nvml, &self.raw) {
            (Some(nvml), Some(raw)) => Ok((nvml, raw)),
            _ => Err(DriverError::NotInitialized),
        }
    }

    fn device(&self, uuid: &str) -> Result<NvmlDevice<'_>, DriverError> {
        let (nvml, _) = self.libraries()?;
        let device = nvml.device_by_uuid(uuid).map_err(|e| match e {
            nvml_wrapper::error::NvmlError::NotFound => DriverError::DeviceNotFound(uuid.to_string()),
            other => NvmlDevice::convert_error(other),
        })?;
        Ok(NvmlDevice::new(device, uuid))
    }
}

impl TelemetryDriver for NvmlDriver {
    fn initialize(&mut self) -> Result<(), DriverError> {
        if self.nvml.is_some() {
            return Ok(());
        }

        let nvml = Nvml::init().map_err(|e| match e {
            nvml_wrapper::error::NvmlError::LibloadingError(_) => DriverError::LibraryNotFound,
            nvml_wrapper::error::NvmlError::DriverNotLoaded => {
                DriverError::InitializationFailed("NVIDIA driver not loaded".to_string())
            }
            other => DriverError::InitializationFailed(other.to_string()),
        })?;
        let raw = RawNvml::load()?;

        self.nvml = Some(nvml);
        self.raw = Some(raw);
        log::info!("NVML initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        self.partitions.clear();
        self.raw = None;
        if let Some(nvml) = self.nvml.take() {
            nvml.shutdown().map_err(NvmlDevice::convert_error)?;
            log::info!("NVML shut down");
        }
        Ok(())
    }

    fn system_driver_version(&self) -> Result<String, DriverError> {
        let (nvml, _) = self.libraries()?;
        nvml.sys_driver_version()
            .map_err(NvmlDevice::convert_error)
    }

    fn list_device_handles(&mut self) -> Result<BTreeMap<String, Classification>, DriverError> {
        let (nvml, raw) = self.libraries()?;
        let count = nvml.device_count().map_err(NvmlDevice::convert_error)?;

        let mut handles = BTreeMap::new();
        let mut partitions = HashMap::new();

        for index in 0..count {
            let device = nvml
                .device_by_index(index)
                .map_err(NvmlDevice::convert_error)?;
            let uuid = device.uuid().map_err(NvmlDevice::convert_error)?;

            if !mig_enabled(&device)? {
                handles.insert(uuid, Classification::Standalone);
                continue;
            }

            let bus_id = device.pci_info().map_err(NvmlDevice::convert_error)?.bus_id;
            // SAFETY: the handle does not outlive `device`
            let handle = unsafe { device.handle() };
            for mig_uuid in raw.mig_device_uuids(handle)? {
                partitions.insert(mig_uuid.clone(), bus_id.clone());
                handles.insert(mig_uuid, Classification::Partition);
            }
            handles.insert(uuid, Classification::PartitionParent);
        }

        log::debug!(
            "Found {} device handle(s), {} MIG instance(s)",
            handles.len(),
            partitions.len()
        );
        self.partitions = partitions;
        Ok(handles)
    }

    fn static_info(&self, uuid: &str) -> Result<DeviceInfo, DriverError> {
        let device = self.device(uuid)?;
        device.info(self.partitions.get(uuid).cloned())
    }

    fn static_and_dynamic_info(
        &self,
        uuid: &str,
    ) -> Result<(DeviceInfo, DeviceStatus), DriverError> {
        let device = self.device(uuid)?;
        let info = device.info(self.partitions.get(uuid).cloned())?;
        let status = device.status()?;
        Ok((info, status))
    }
}
