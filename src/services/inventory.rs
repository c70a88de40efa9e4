//! Inventory change detection
//!
//! Tracks the set of device UUIDs seen in the last fingerprint poll.

use crate::domain::DeviceRecord;

use std::collections::BTreeSet;

/// Set of currently known devices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryTracker {
    devices: BTreeSet<String>,
}

impl InventoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked set with the UUIDs in `records` and report whether
    /// the set differs from the previous one.
    pub fn has_changed<T: DeviceRecord>(&mut self, records: &[T]) -> bool {
        let current: BTreeSet<String> = records.iter().map(|r| r.uuid().to_string()).collect();
        let changed = current != self.devices;
        self.devices = current;
        changed
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.devices.contains(uuid)
    }

    /// Keep only records for tracked devices, in input order
    pub fn retain_known<T: DeviceRecord>(&self, records: Vec<T>) -> Vec<T> {
        records
            .into_iter()
            .filter(|r| self.contains(r.uuid()))
            .collect()
    }

    /// Tracked UUIDs in sorted order
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
