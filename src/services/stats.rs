//! Stats response assembly

use crate::domain::report::{DEVICE_TYPE, VENDOR};
use crate::domain::{DeviceGroupStats, DeviceRecord, DeviceStats, StatsRecord, StatsResponse};
use crate::services::grouping::group_by_model;
use crate::services::normalize::{memory_state, stats_attributes};

use chrono::{DateTime, Utc};

/// Stats of a single device. The summary is its memory state.
pub fn stats_for_item(record: &StatsRecord, timestamp: DateTime<Utc>) -> DeviceStats {
    DeviceStats {
        summary: memory_state(record),
        stats: stats_attributes(record),
        timestamp,
    }
}

/// Stats of every record in one group, keyed by UUID
pub fn stats_for_group(
    name: &str,
    records: &[StatsRecord],
    timestamp: DateTime<Utc>,
) -> DeviceGroupStats {
    DeviceGroupStats {
        vendor: VENDOR.to_string(),
        device_type: DEVICE_TYPE.to_string(),
        name: name.to_string(),
        instance_stats: records
            .iter()
            .map(|r| (r.uuid().to_string(), stats_for_item(r, timestamp)))
            .collect(),
    }
}

/// Group already filtered records by model into a response
pub fn build_stats_response(records: Vec<StatsRecord>, timestamp: DateTime<Utc>) -> StatsResponse {
    StatsResponse {
        groups: group_by_model(records)
            .into_iter()
            .map(|(name, members)| stats_for_group(&name, &members, timestamp))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttributeKind, DeviceInfo, DeviceStatus, FeatureState};

    fn record(uuid: &str, name: &str, used: Option<u64>) -> StatsRecord {
        let info = DeviceInfo::new(uuid, "bus", FeatureState::Disabled, FeatureState::Disabled)
            .with_name(name)
            .with_memory_mib(16384);
        StatsRecord::new(
            &info,
            DeviceStatus {
                used_memory_mib: used,
                temperature_c: Some(50),
                ..DeviceStatus::default()
            },
        )
    }

    #[test]
    fn test_stats_for_item() {
        let now = Utc::now();
        let stats = stats_for_item(&record("GPU-1", "Tesla T4", Some(2048)), now);

        assert_eq!(stats.timestamp, now);
        assert_eq!(
            stats.summary.value,
            AttributeKind::Ratio {
                numerator: 2048,
                denominator: 16384
            }
        );
        assert_eq!(stats.summary, stats.stats["Memory state"]);
        assert_eq!(stats.stats["Temperature"].value, AttributeKind::Int(50));
    }

    #[test]
    fn test_summary_sentinel_when_used_missing() {
        let stats = stats_for_item(&record("GPU-1", "Tesla T4", None), Utc::now());
        assert!(stats.summary.is_not_available());
    }

    #[test]
    fn test_stats_for_group_keyed_by_uuid() {
        let now = Utc::now();
        let records = vec![
            record("GPU-1", "Tesla T4", Some(1)),
            record("GPU-2", "Tesla T4", Some(2)),
        ];

        let group = stats_for_group("Tesla T4", &records, now);
        assert_eq!(group.vendor, "nvidia");
        assert_eq!(group.device_type, "gpu");
        assert_eq!(group.instance_stats.len(), 2);
        assert!(group.instance_stats.contains_key("GPU-2"));
        assert!(group.instance_stats.values().all(|s| s.timestamp == now));
    }

    #[test]
    fn test_response_groups_by_model() {
        let records = vec![
            record("GPU-1", "Tesla T4", Some(1)),
            record("GPU-2", "A100", Some(2)),
            record("GPU-3", "Tesla T4", Some(3)),
        ];

        let response = build_stats_response(records, Utc::now());
        assert_eq!(response.groups.len(), 2);
        assert_eq!(response.groups[0].name, "Tesla T4");
        assert_eq!(response.groups[0].instance_stats.len(), 2);
        assert_eq!(response.groups[1].name, "A100");
    }
}
