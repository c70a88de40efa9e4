//! Fingerprint response assembly

use crate::domain::report::{DEVICE_TYPE, VENDOR};
use crate::domain::{
    Device, DeviceGroup, DeviceLocality, DeviceRecord, FingerprintRecord, FingerprintResponse,
};
use crate::services::grouping::group_by_model;
use crate::services::normalize::{common_attributes, fingerprint_attributes, AttributeMap};

/// Build one device group. Attributes come from the first device, merged
/// with `common`. Returns `None` for an empty device list.
pub fn device_group_from_fingerprint(
    name: &str,
    devices: &[FingerprintRecord],
    common: &AttributeMap,
) -> Option<DeviceGroup> {
    let first = devices.first()?;

    let mut attributes = fingerprint_attributes(first);
    attributes.extend(common.iter().map(|(k, v)| (k.clone(), v.clone())));

    Some(DeviceGroup {
        vendor: VENDOR.to_string(),
        device_type: DEVICE_TYPE.to_string(),
        name: name.to_string(),
        devices: devices
            .iter()
            .map(|d| Device {
                id: d.uuid().to_string(),
                healthy: true,
                hw_locality: DeviceLocality {
                    pci_bus_id: d.pci_bus_id.clone(),
                },
            })
            .collect(),
        attributes,
    })
}

/// Group already filtered records by model into a response
pub fn build_fingerprint_response(
    driver_version: &str,
    devices: Vec<FingerprintRecord>,
) -> FingerprintResponse {
    let common = common_attributes(driver_version);
    let groups = group_by_model(devices)
        .into_iter()
        .filter_map(|(name, members)| device_group_from_fingerprint(&name, &members, &common))
        .collect();

    FingerprintResponse {
        driver_version: driver_version.to_string(),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttributeKind, DeviceInfo, FeatureState};

    fn record(uuid: &str, name: &str, bus: &str, memory_mib: u64) -> FingerprintRecord {
        FingerprintRecord::from(
            DeviceInfo::new(uuid, bus, FeatureState::Disabled, FeatureState::Enabled)
                .with_name(name)
                .with_memory_mib(memory_mib),
        )
    }

    #[test]
    fn test_group_from_no_devices() {
        assert!(device_group_from_fingerprint("Tesla T4", &[], &AttributeMap::new()).is_none());
    }

    #[test]
    fn test_group_uses_first_device_attributes() {
        let devices = vec![
            record("GPU-1", "Tesla T4", "0000:3B:00.0", 15360),
            record("GPU-2", "Tesla T4", "0000:5E:00.0", 99999),
        ];
        let common = common_attributes("535.154.05");

        let group = device_group_from_fingerprint("Tesla T4", &devices, &common).unwrap();
        assert_eq!(group.vendor, "nvidia");
        assert_eq!(group.device_type, "gpu");
        assert_eq!(group.name, "Tesla T4");
        assert_eq!(group.devices.len(), 2);
        assert!(group.devices.iter().all(|d| d.healthy));
        assert_eq!(group.devices[1].hw_locality.pci_bus_id, "0000:5E:00.0");
        assert_eq!(group.attributes["memory"].value, AttributeKind::Int(15360));
        assert_eq!(
            group.attributes["driver_version"].value,
            AttributeKind::String("535.154.05".to_string())
        );
        assert_eq!(group.attributes.len(), 9);
    }

    #[test]
    fn test_response_groups_by_model() {
        let devices = vec![
            record("GPU-1", "Tesla T4", "bus-1", 15360),
            record("GPU-2", "A100", "bus-2", 40960),
            record("GPU-3", "Tesla T4", "bus-3", 15360),
        ];

        let response = build_fingerprint_response("535.154.05", devices);
        assert_eq!(response.driver_version, "535.154.05");
        assert_eq!(response.groups.len(), 2);
        assert_eq!(response.groups[0].name, "Tesla T4");
        assert_eq!(
            response.groups[0].device_ids().collect::<Vec<_>>(),
            vec!["GPU-1", "GPU-3"]
        );
        assert_eq!(response.groups[1].name, "A100");
    }

    #[test]
    fn test_empty_response() {
        let response = build_fingerprint_response("535.154.05", vec![]);
        assert!(response.groups.is_empty());
    }
}
