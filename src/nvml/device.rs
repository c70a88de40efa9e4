//! NVML device queries
//!
//! Reads the static and dynamic fields of one device. Fields the device
//! does not support come back as `None`; any other failure is an error.

use crate::domain::{DeviceInfo, DeviceStatus, FeatureState};
use crate::error::DriverError;

use nvml_wrapper::enum_wrappers::device::{
    Clock, EccCounter, MemoryError, MemoryLocation, TemperatureSensor,
};
use nvml_wrapper::Device;

const BYTES_PER_MIB: u64 = 1 << 20;
/// `MigMode::current` value for an enabled GPU
const MIG_MODE_ENABLED: u32 = 1;

/// One NVML device handle, looked up by UUID
pub struct NvmlDevice<'a> {
    device: Device<'a>,
    uuid: String,
}

impl<'a> NvmlDevice<'a> {
    pub fn new(device: Device<'a>, uuid: impl Into<String>) -> Self {
        Self {
            device,
            uuid: uuid.into(),
        }
    }

    /// Convert an nvml-wrapper error to our error type
    pub fn convert_error(err: nvml_wrapper::error::NvmlError) -> DriverError {
        use nvml_wrapper::error::NvmlError as NE;
        match err {
            NE::NotSupported => {
                DriverError::NotSupported("Operation not supported by this GPU".to_string())
            }
            NE::NoPermission => {
                DriverError::InsufficientPermissions("Insufficient permissions".to_string())
            }
            NE::GpuLost => DriverError::GpuLost,
            NE::Uninitialized => DriverError::NotInitialized,
            NE::LibloadingError(_) => DriverError::LibraryNotFound,
            _ => DriverError::Unknown(err.to_string()),
        }
    }

    /// Static fields. MIG instances pass their parent's PCI bus ID.
    pub fn info(&self, pci_bus_id: Option<String>) -> Result<DeviceInfo, DriverError> {
        let pci_bus_id = match pci_bus_id {
            Some(id) => id,
            None => {
                self.device
                    .pci_info()
                    .map_err(Self::convert_error)?
                    .bus_id
            }
        };

        let display = optional(
            self.device
                .is_display_connected()
                .map_err(Self::convert_error),
        )?
        .unwrap_or(false);
        let persistence = optional(
            self.device
                .is_in_persistent_mode()
                .map_err(Self::convert_error),
        )?
        .unwrap_or(false);

        let mut info = DeviceInfo::new(
            self.uuid.clone(),
            pci_bus_id,
            FeatureState::from(display),
            FeatureState::from(persistence),
        );

        info.name = optional(self.device.name().map_err(Self::convert_error))?;
        info.memory_mib = optional(self.device.memory_info().map_err(Self::convert_error))?
            .map(|m| m.total / BYTES_PER_MIB);
        info.power_w = optional(
            self.device
                .power_management_limit()
                .map_err(Self::convert_error),
        )?
        .map(|mw| mw / 1000);
        info.bar1_mib = optional(self.device.bar1_memory_info().map_err(Self::convert_error))?
            .map(|b| b.total / BYTES_PER_MIB);

        let link_gen = optional(self.device.max_pcie_link_gen().map_err(Self::convert_error))?;
        let link_width =
            optional(self.device.max_pcie_link_width().map_err(Self::convert_error))?;
        info.pci_bandwidth_mb_per_s = match (link_gen, link_width) {
            (Some(gen), Some(width)) => pcie_bandwidth_mb_per_s(gen, width),
            _ => None,
        };

        info.cores_clock_mhz = optional(
            self.device
                .clock_info(Clock::Graphics)
                .map_err(Self::convert_error),
        )?;
        info.memory_clock_mhz = optional(
            self.device
                .clock_info(Clock::Memory)
                .map_err(Self::convert_error),
        )?;

        Ok(info)
    }

    /// Dynamic readings
    pub fn status(&self) -> Result<DeviceStatus, DriverError> {
        let utilization =
            optional(self.device.utilization_rates().map_err(Self::convert_error))?;
        let memory = optional(self.device.memory_info().map_err(Self::convert_error))?;
        let bar1 = optional(self.device.bar1_memory_info().map_err(Self::convert_error))?;

        Ok(DeviceStatus {
            power_usage_w: optional(self.device.power_usage().map_err(Self::convert_error))?
                .map(|mw| mw / 1000),
            temperature_c: optional(
                self.device
                    .temperature(TemperatureSensor::Gpu)
                    .map_err(Self::convert_error),
            )?,
            gpu_utilization: utilization.as_ref().map(|u| u.gpu),
            memory_utilization: utilization.as_ref().map(|u| u.memory),
            encoder_utilization: optional(
                self.device
                    .encoder_utilization()
                    .map_err(Self::convert_error),
            )?
            .map(|e| e.utilization),
            decoder_utilization: optional(
                self.device
                    .decoder_utilization()
                    .map_err(Self::convert_error),
            )?
            .map(|d| d.utilization),
            bar1_used_mib: bar1.map(|b| b.used / BYTES_PER_MIB),
            used_memory_mib: memory.map(|m| m.used / BYTES_PER_MIB),
            ecc_errors_l1_cache: self.ecc_errors(MemoryLocation::L1Cache)?,
            ecc_errors_l2_cache: self.ecc_errors(MemoryLocation::L2Cache)?,
            ecc_errors_device: self.ecc_errors(MemoryLocation::Device)?,
        })
    }

    /// Corrected volatile ECC errors at one memory location
    fn ecc_errors(&self, location: MemoryLocation) -> Result<Option<u64>, DriverError> {
        optional(
            self.device
                .memory_error_counter(MemoryError::Corrected, EccCounter::Volatile, location)
                .map_err(Self::convert_error),
        )
    }
}

/// Whether MIG mode is currently enabled. Unsupported means disabled.
pub(crate) fn mig_enabled(device: &Device<'_>) -> Result<bool, DriverError> {
    let mode = optional(device.mig_mode().map_err(NvmlDevice::convert_error))?;
    Ok(mode.is_some_and(|m| m.current == MIG_MODE_ENABLED))
}

/// Treat "not supported" as a missing field
fn optional<T>(result: Result<T, DriverError>) -> Result<Option<T>, DriverError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DriverError::NotSupported(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Usable bandwidth of a PCIe link in MB/s, from its generation and lane count.
///
/// Generations before 3 are not reported.
pub fn pcie_bandwidth_mb_per_s(generation: u32, width: u32) -> Option<u32> {
    let per_lane = match generation {
        3 => 1 << 10,
        4 => 2 << 10,
        5 => 3 << 10,
        6 => 4 << 10,
        _ => return None,
    };
    width.checked_mul(per_lane)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcie_bandwidth() {
        assert_eq!(pcie_bandwidth_mb_per_s(3, 16), Some(16384));
        assert_eq!(pcie_bandwidth_mb_per_s(4, 16), Some(32768));
        assert_eq!(pcie_bandwidth_mb_per_s(5, 8), Some(24576));
        assert_eq!(pcie_bandwidth_mb_per_s(6, 1), Some(4096));
    }

    #[test]
    fn test_pcie_bandwidth_unknown_generation() {
        assert_eq!(pcie_bandwidth_mb_per_s(2, 16), None);
        assert_eq!(pcie_bandwidth_mb_per_s(0, 0), None);
    }

    #[test]
    fn test_optional_maps_not_supported() {
        let missing: Result<u32, DriverError> = Err(DriverError::NotSupported("x".to_string()));
        assert_eq!(optional(missing), Ok(None));

        let lost: Result<u32, DriverError> = Err(DriverError::GpuLost);
        assert_eq!(optional(lost), Err(DriverError::GpuLost));

        assert_eq!(optional(Ok::<u32, DriverError>(7)), Ok(Some(7)));
    }

    #[test]
    fn test_convert_error() {
        use nvml_wrapper::error::NvmlError as NE;
        assert!(matches!(
            NvmlDevice::convert_error(NE::NotSupported),
            DriverError::NotSupported(_)
        ));
        assert_eq!(NvmlDevice::convert_error(NE::GpuLost), DriverError::GpuLost);
    }
}
