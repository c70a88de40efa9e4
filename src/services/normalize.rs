//! Attribute normalization
//!
//! Converts records with optional readings into attribute maps. Every
//! registered attribute is always present; missing readings become the
//! "not available" sentinel.

use crate::domain::attribute::{fingerprint, stats};
use crate::domain::{AttributeValue, FingerprintRecord, StatsRecord};

use std::collections::BTreeMap;

pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Per-device static attributes
pub fn fingerprint_attributes(record: &FingerprintRecord) -> AttributeMap {
    let identity = &record.identity;
    let entries = [
        (fingerprint::MEMORY, fingerprint::MEMORY.int(identity.memory_mib)),
        (fingerprint::POWER, fingerprint::POWER.int(identity.power_w)),
        (fingerprint::BAR1, fingerprint::BAR1.int(identity.bar1_mib)),
        (
            fingerprint::PCI_BANDWIDTH,
            fingerprint::PCI_BANDWIDTH.int(record.pci_bandwidth_mb_per_s),
        ),
        (
            fingerprint::CORES_CLOCK,
            fingerprint::CORES_CLOCK.int(record.cores_clock_mhz),
        ),
        (
            fingerprint::MEMORY_CLOCK,
            fingerprint::MEMORY_CLOCK.int(record.memory_clock_mhz),
        ),
        (
            fingerprint::DISPLAY_STATE,
            fingerprint::DISPLAY_STATE.string(Some(record.display_state)),
        ),
        (
            fingerprint::PERSISTENCE_MODE,
            fingerprint::PERSISTENCE_MODE.string(Some(record.persistence_mode)),
        ),
    ];

    entries
        .into_iter()
        .map(|(spec, value)| (spec.name.to_string(), value))
        .collect()
}

/// Attributes shared by every group in one fingerprint response
pub fn common_attributes(driver_version: &str) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    attributes.insert(
        fingerprint::DRIVER_VERSION.name.to_string(),
        fingerprint::DRIVER_VERSION.string(Some(driver_version)),
    );
    attributes
}

/// Used / total framebuffer memory
pub fn memory_state(record: &StatsRecord) -> AttributeValue {
    stats::MEMORY_STATE.ratio(record.status.used_memory_mib, record.identity.memory_mib)
}

/// Current draw over the power limit
pub fn power_usage(record: &StatsRecord) -> AttributeValue {
    stats::POWER_USAGE.ratio(record.status.power_usage_w, record.identity.power_w)
}

/// Per-device dynamic attributes
pub fn stats_attributes(record: &StatsRecord) -> AttributeMap {
    let status = &record.status;
    let entries = [
        (stats::POWER_USAGE, power_usage(record)),
        (
            stats::GPU_UTILIZATION,
            stats::GPU_UTILIZATION.int(status.gpu_utilization),
        ),
        (
            stats::MEMORY_UTILIZATION,
            stats::MEMORY_UTILIZATION.int(status.memory_utilization),
        ),
        (
            stats::ENCODER_UTILIZATION,
            stats::ENCODER_UTILIZATION.int(status.encoder_utilization),
        ),
        (
            stats::DECODER_UTILIZATION,
            stats::DECODER_UTILIZATION.int(status.decoder_utilization),
        ),
        (stats::TEMPERATURE, stats::TEMPERATURE.int(status.temperature_c)),
        (stats::MEMORY_STATE, memory_state(record)),
        (
            stats::BAR1_STATE,
            stats::BAR1_STATE.ratio(status.bar1_used_mib, record.identity.bar1_mib),
        ),
        (
            stats::ECC_ERRORS_L1,
            stats::ECC_ERRORS_L1.int(status.ecc_errors_l1_cache),
        ),
        (
            stats::ECC_ERRORS_L2,
            stats::ECC_ERRORS_L2.int(status.ecc_errors_l2_cache),
        ),
        (
            stats::ECC_ERRORS_DEVICE,
            stats::ECC_ERRORS_DEVICE.int(status.ecc_errors_device),
        ),
    ];

    entries
        .into_iter()
        .map(|(spec, value)| (spec.name.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttributeKind, DeviceInfo, DeviceStatus, FeatureState, NOT_AVAILABLE};

    fn bare_info() -> DeviceInfo {
        DeviceInfo::new(
            "GPU-1",
            "00000000:3B:00.0",
            FeatureState::Enabled,
            FeatureState::Disabled,
        )
    }

    #[test]
    fn test_fingerprint_all_present() {
        let record = FingerprintRecord::from(
            bare_info()
                .with_name("Tesla T4")
                .with_memory_mib(15360)
                .with_power_w(70)
                .with_bar1_mib(256)
                .with_pci_bandwidth(16384)
                .with_clocks(1590, 5001),
        );

        let attrs = fingerprint_attributes(&record);
        assert_eq!(attrs.len(), 8);
        assert_eq!(attrs["memory"].value, AttributeKind::Int(15360));
        assert_eq!(attrs["memory"].unit, "MiB");
        assert_eq!(attrs["power"].value, AttributeKind::Int(70));
        assert_eq!(attrs["power"].unit, "W");
        assert_eq!(attrs["pci_bandwidth"].unit, "MB/s");
        assert_eq!(attrs["cores_clock"].value, AttributeKind::Int(1590));
        assert_eq!(attrs["memory_clock"].unit, "MHz");
        assert_eq!(
            attrs["display_state"].value,
            AttributeKind::String("Enabled".to_string())
        );
        assert_eq!(
            attrs["persistence_mode"].value,
            AttributeKind::String("Disabled".to_string())
        );
    }

    #[test]
    fn test_fingerprint_missing_fields_are_sentinels() {
        let attrs = fingerprint_attributes(&FingerprintRecord::from(bare_info()));
        assert_eq!(attrs.len(), 8);
        for name in ["memory", "power", "bar1", "pci_bandwidth", "cores_clock", "memory_clock"] {
            assert!(attrs[name].is_not_available(), "{} should be unavailable", name);
        }
        assert!(!attrs["display_state"].is_not_available());
    }

    #[test]
    fn test_common_attributes() {
        let attrs = common_attributes("535.154.05");
        assert_eq!(
            attrs["driver_version"].value,
            AttributeKind::String("535.154.05".to_string())
        );
    }

    #[test]
    fn test_memory_state_ratio() {
        let info = bare_info().with_memory_mib(16384);
        let record = StatsRecord::new(
            &info,
            DeviceStatus {
                used_memory_mib: Some(1024),
                ..DeviceStatus::default()
            },
        );
        assert_eq!(
            memory_state(&record).value,
            AttributeKind::Ratio {
                numerator: 1024,
                denominator: 16384
            }
        );
    }

    #[test]
    fn test_memory_state_missing_half() {
        let record = StatsRecord::new(
            &bare_info(),
            DeviceStatus {
                used_memory_mib: Some(1024),
                ..DeviceStatus::default()
            },
        );
        assert!(memory_state(&record).is_not_available());
    }

    #[test]
    fn test_power_usage_variants() {
        let status = DeviceStatus {
            power_usage_w: Some(120),
            ..DeviceStatus::default()
        };

        let with_limit = StatsRecord::new(&bare_info().with_power_w(300), status.clone());
        assert_eq!(
            power_usage(&with_limit).value,
            AttributeKind::Ratio {
                numerator: 120,
                denominator: 300
            }
        );

        let without_limit = StatsRecord::new(&bare_info(), status);
        assert!(power_usage(&without_limit).is_not_available());
        assert_eq!(power_usage(&without_limit).unit, "W");

        let no_reading = StatsRecord::new(&bare_info().with_power_w(300), DeviceStatus::default());
        assert!(power_usage(&no_reading).is_not_available());
    }

    #[test]
    fn test_stats_all_missing() {
        let record = StatsRecord::new(&bare_info(), DeviceStatus::default());
        let attrs = stats_attributes(&record);

        assert_eq!(attrs.len(), 11);
        for (name, value) in &attrs {
            assert_eq!(
                value.value,
                AttributeKind::String(NOT_AVAILABLE.to_string()),
                "{} should be unavailable",
                name
            );
        }
        assert_eq!(attrs["Temperature"].unit, "C");
        assert_eq!(attrs["Temperature"].desc, "Temperature of the Unit");
    }

    #[test]
    fn test_stats_readings() {
        let info = bare_info().with_memory_mib(16384).with_bar1_mib(256);
        let record = StatsRecord::new(
            &info,
            DeviceStatus {
                temperature_c: Some(61),
                gpu_utilization: Some(90),
                bar1_used_mib: Some(8),
                ecc_errors_l2_cache: Some(3),
                ..DeviceStatus::default()
            },
        );
        let attrs = stats_attributes(&record);

        assert_eq!(attrs["Temperature"].value, AttributeKind::Int(61));
        assert_eq!(attrs["GPU utilization"].value, AttributeKind::Int(90));
        assert_eq!(attrs["GPU utilization"].unit, "%");
        assert_eq!(
            attrs["BAR1 buffer state"].value,
            AttributeKind::Ratio {
                numerator: 8,
                denominator: 256
            }
        );
        assert_eq!(attrs["ECC L2 errors"].value, AttributeKind::Int(3));
        assert!(attrs["ECC L1 errors"].is_not_available());
        assert!(attrs["Memory state"].is_not_available());
    }
}
