//! Device grouping and exclusion
//!
//! Records are grouped by model name in first-seen order, so sorted input
//! produces the same groups on every poll.

use crate::domain::DeviceRecord;

use std::collections::{HashMap, HashSet};

/// Drop records whose UUID is in the excluded set
pub fn filter_excluded<T: DeviceRecord>(records: Vec<T>, excluded: &HashSet<String>) -> Vec<T> {
    if excluded.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| !excluded.contains(r.uuid()))
        .collect()
}

/// Partition records by key. Groups keep first-seen order and members keep
/// input order.
pub fn group_by<T, F>(records: Vec<T>, key: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> &str,
{
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let name = key(&record).to_string();
        if let Some(&i) = index.get(&name) {
            groups[i].1.push(record);
        } else {
            index.insert(name.clone(), groups.len());
            groups.push((name, vec![record]));
        }
    }

    groups
}

/// Group records by model name
pub fn group_by_model<T: DeviceRecord>(records: Vec<T>) -> Vec<(String, Vec<T>)> {
    group_by(records, |r| r.group_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceInfo, DeviceStatus, FeatureState, StatsRecord, UNKNOWN_MODEL};

    fn record(uuid: &str, name: Option<&str>) -> StatsRecord {
        let mut info = DeviceInfo::new(uuid, "bus", FeatureState::Disabled, FeatureState::Disabled);
        info.name = name.map(str::to_string);
        StatsRecord::new(&info, DeviceStatus::default())
    }

    fn uuids(records: &[StatsRecord]) -> Vec<&str> {
        records.iter().map(|r| r.uuid()).collect()
    }

    #[test]
    fn test_filter_empty_set_keeps_all() {
        let records = vec![record("GPU-1", None), record("GPU-2", None)];
        let kept = filter_excluded(records, &HashSet::new());
        assert_eq!(uuids(&kept), vec!["GPU-1", "GPU-2"]);
    }

    #[test]
    fn test_filter_removes_excluded() {
        let records = vec![
            record("GPU-1", None),
            record("GPU-2", None),
            record("GPU-3", None),
        ];
        let excluded: HashSet<String> = ["GPU-2".to_string()].into_iter().collect();
        let kept = filter_excluded(records, &excluded);
        assert_eq!(uuids(&kept), vec!["GPU-1", "GPU-3"]);
    }

    #[test]
    fn test_filter_all_excluded() {
        let records = vec![record("GPU-1", None)];
        let excluded: HashSet<String> = ["GPU-1".to_string()].into_iter().collect();
        assert!(filter_excluded(records, &excluded).is_empty());
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let records = vec![
            record("GPU-1", Some("Tesla T4")),
            record("GPU-2", Some("A100")),
            record("GPU-3", Some("Tesla T4")),
        ];

        let groups = group_by_model(records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "Tesla T4");
        assert_eq!(uuids(&groups[0].1), vec!["GPU-1", "GPU-3"]);
        assert_eq!(groups[1].0, "A100");
        assert_eq!(uuids(&groups[1].1), vec!["GPU-2"]);
    }

    #[test]
    fn test_group_by_missing_name() {
        let groups = group_by_model(vec![record("GPU-1", None), record("GPU-2", None)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, UNKNOWN_MODEL);
    }

    #[test]
    fn test_group_by_empty() {
        let groups = group_by_model(Vec::<StatsRecord>::new());
        assert!(groups.is_empty());
    }
}
