//! Report types handed to the consumer
//!
//! Fingerprint reports describe device groups; stats reports carry one
//! [`DeviceStats`] per device, keyed by UUID.

use crate::domain::attribute::AttributeValue;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Vendor reported for every device group
pub const VENDOR: &str = "nvidia";
/// Device type reported for every device group
pub const DEVICE_TYPE: &str = "gpu";
/// Environment variable used to hand reserved devices to a container
pub const VISIBLE_DEVICES_ENV: &str = "NVIDIA_VISIBLE_DEVICES";

/// Where a device sits on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceLocality {
    pub pci_bus_id: String,
}

/// One schedulable device inside a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub healthy: bool,
    pub hw_locality: DeviceLocality,
}

/// Devices of one model with their shared attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceGroup {
    pub vendor: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub devices: Vec<Device>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl DeviceGroup {
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.id.as_str())
    }
}

/// Result of one successful fingerprint poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FingerprintResponse {
    pub driver_version: String,
    pub groups: Vec<DeviceGroup>,
}

/// Readings of a single device at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    /// Headline value (memory state)
    pub summary: AttributeValue,
    pub stats: BTreeMap<String, AttributeValue>,
    pub timestamp: DateTime<Utc>,
}

/// Stats of every device in one group, keyed by UUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceGroupStats {
    pub vendor: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub instance_stats: BTreeMap<String, DeviceStats>,
}

/// Result of one successful stats poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsResponse {
    pub groups: Vec<DeviceGroupStats>,
}

/// What a container needs to see the reserved devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerReservation {
    pub envs: BTreeMap<String, String>,
}

impl ContainerReservation {
    /// Reservation exposing the given device ids
    pub fn for_devices<S: AsRef<str>>(ids: &[S]) -> Self {
        let mut envs = BTreeMap::new();
        if !ids.is_empty() {
            let joined = ids.iter().map(|id| id.as_ref()).collect::<Vec<&str>>().join(",");
            envs.insert(VISIBLE_DEVICES_ENV.to_string(), joined);
        }
        Self { envs }
    }
}
