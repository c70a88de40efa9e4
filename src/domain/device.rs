//! Device records
//!
//! Raw adapter output ([`DeviceInfo`], [`DeviceStatus`]) and the normalized
//! per-poll records built from it ([`FingerprintRecord`], [`StatsRecord`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group name used for devices whose model name could not be read
pub const UNKNOWN_MODEL: &str = "unknown";

/// How a device handle relates to MIG partitioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Ordinary, unpartitioned GPU
    Standalone,
    /// Physical GPU with MIG enabled. Never reported on its own.
    PartitionParent,
    /// MIG instance carved out of a parent GPU
    Partition,
}

impl Classification {
    /// Whether devices of this kind appear in inventory reports
    pub fn in_inventory(self) -> bool {
        !matches!(self, Self::PartitionParent)
    }

    /// Whether devices of this kind appear in stats reports
    pub fn in_stats(self) -> bool {
        matches!(self, Self::Standalone)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::PartitionParent => write!(f, "partition parent"),
            Self::Partition => write!(f, "partition"),
        }
    }
}

/// Two-state device feature (display, persistence mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureState {
    Enabled,
    Disabled,
}

impl From<bool> for FeatureState {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl fmt::Display for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "Enabled"),
            Self::Disabled => write!(f, "Disabled"),
        }
    }
}

/// Static device information as reported by the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub uuid: String,
    pub pci_bus_id: String,
    pub display_state: FeatureState,
    pub persistence_mode: FeatureState,
    /// Model name (e.g., "NVIDIA A100-SXM4-40GB")
    pub name: Option<String>,
    pub memory_mib: Option<u64>,
    /// Power management limit in watts
    pub power_w: Option<u32>,
    pub bar1_mib: Option<u64>,
    pub pci_bandwidth_mb_per_s: Option<u32>,
    pub cores_clock_mhz: Option<u32>,
    pub memory_clock_mhz: Option<u32>,
}

impl DeviceInfo {
    /// Create device info with only the required fields set
    pub fn new(
        uuid: impl Into<String>,
        pci_bus_id: impl Into<String>,
        display_state: FeatureState,
        persistence_mode: FeatureState,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            pci_bus_id: pci_bus_id.into(),
            display_state,
            persistence_mode,
            name: None,
            memory_mib: None,
            power_w: None,
            bar1_mib: None,
            pci_bandwidth_mb_per_s: None,
            cores_clock_mhz: None,
            memory_clock_mhz: None,
        }
    }

    /// Set the model name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set total framebuffer memory in MiB
    pub fn with_memory_mib(mut self, mib: u64) -> Self {
        self.memory_mib = Some(mib);
        self
    }

    /// Set the power limit in watts
    pub fn with_power_w(mut self, watts: u32) -> Self {
        self.power_w = Some(watts);
        self
    }

    /// Set total BAR1 memory in MiB
    pub fn with_bar1_mib(mut self, mib: u64) -> Self {
        self.bar1_mib = Some(mib);
        self
    }

    pub fn with_pci_bandwidth(mut self, mb_per_s: u32) -> Self {
        self.pci_bandwidth_mb_per_s = Some(mb_per_s);
        self
    }

    /// Set graphics and memory clocks in MHz
    pub fn with_clocks(mut self, cores_mhz: u32, memory_mhz: u32) -> Self {
        self.cores_clock_mhz = Some(cores_mhz);
        self.memory_clock_mhz = Some(memory_mhz);
        self
    }
}

/// Dynamic device readings. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub power_usage_w: Option<u32>,
    pub temperature_c: Option<u32>,
    pub gpu_utilization: Option<u32>,
    pub memory_utilization: Option<u32>,
    pub encoder_utilization: Option<u32>,
    pub decoder_utilization: Option<u32>,
    pub bar1_used_mib: Option<u64>,
    pub used_memory_mib: Option<u64>,
    pub ecc_errors_l1_cache: Option<u64>,
    pub ecc_errors_l2_cache: Option<u64>,
    pub ecc_errors_device: Option<u64>,
}

/// Identity fields shared by fingerprint and stats records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub uuid: String,
    pub model_name: Option<String>,
    pub memory_mib: Option<u64>,
    pub power_w: Option<u32>,
    pub bar1_mib: Option<u64>,
}

impl From<&DeviceInfo> for DeviceIdentity {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            uuid: info.uuid.clone(),
            model_name: info.name.clone(),
            memory_mib: info.memory_mib,
            power_w: info.power_w,
            bar1_mib: info.bar1_mib,
        }
    }
}

/// Common access to records flowing through the grouping pipeline
pub trait DeviceRecord {
    fn identity(&self) -> &DeviceIdentity;

    fn uuid(&self) -> &str {
        &self.identity().uuid
    }

    /// Model name used as the grouping key
    fn group_name(&self) -> &str {
        self.identity()
            .model_name
            .as_deref()
            .unwrap_or(UNKNOWN_MODEL)
    }
}

/// Static description of one reportable device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub identity: DeviceIdentity,
    pub pci_bus_id: String,
    pub pci_bandwidth_mb_per_s: Option<u32>,
    pub cores_clock_mhz: Option<u32>,
    pub memory_clock_mhz: Option<u32>,
    pub display_state: FeatureState,
    pub persistence_mode: FeatureState,
}

impl From<DeviceInfo> for FingerprintRecord {
    fn from(info: DeviceInfo) -> Self {
        Self {
            identity: DeviceIdentity::from(&info),
            pci_bus_id: info.pci_bus_id,
            pci_bandwidth_mb_per_s: info.pci_bandwidth_mb_per_s,
            cores_clock_mhz: info.cores_clock_mhz,
            memory_clock_mhz: info.memory_clock_mhz,
            display_state: info.display_state,
            persistence_mode: info.persistence_mode,
        }
    }
}

impl DeviceRecord for FingerprintRecord {
    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
}

/// Static identity plus one set of dynamic readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub identity: DeviceIdentity,
    #[serde(flatten)]
    pub status: DeviceStatus,
}

impl StatsRecord {
    pub fn new(info: &DeviceInfo, status: DeviceStatus) -> Self {
        Self {
            identity: DeviceIdentity::from(info),
            status,
        }
    }
}

impl DeviceRecord for StatsRecord {
    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(uuid: &str) -> DeviceInfo {
        DeviceInfo::new(
            uuid,
            "00000000:3B:00.0",
            FeatureState::Disabled,
            FeatureState::Enabled,
        )
    }

    #[test]
    fn test_classification_visibility() {
        assert!(Classification::Standalone.in_inventory());
        assert!(Classification::Standalone.in_stats());
        assert!(Classification::Partition.in_inventory());
        assert!(!Classification::Partition.in_stats());
        assert!(!Classification::PartitionParent.in_inventory());
        assert!(!Classification::PartitionParent.in_stats());
    }

    #[test]
    fn test_feature_state_display() {
        assert_eq!(FeatureState::from(true).to_string(), "Enabled");
        assert_eq!(FeatureState::from(false).to_string(), "Disabled");
    }

    #[test]
    fn test_fingerprint_record_from_info() {
        let record = FingerprintRecord::from(
            info("GPU-1")
                .with_name("Tesla T4")
                .with_memory_mib(15360)
                .with_clocks(1590, 5001),
        );

        assert_eq!(record.uuid(), "GPU-1");
        assert_eq!(record.group_name(), "Tesla T4");
        assert_eq!(record.identity.memory_mib, Some(15360));
        assert_eq!(record.cores_clock_mhz, Some(1590));
        assert_eq!(record.memory_clock_mhz, Some(5001));
        assert_eq!(record.pci_bandwidth_mb_per_s, None);
    }

    #[test]
    fn test_missing_name_groups_as_unknown() {
        let record = StatsRecord::new(&info("GPU-2"), DeviceStatus::default());
        assert_eq!(record.group_name(), UNKNOWN_MODEL);
    }
}
