//! Domain models for nvtelemetry
//!
//! Device records produced by the driver adapter, typed attribute values,
//! and the report types handed to consumers.

pub mod attribute;
pub mod device;
pub mod report;

pub use attribute::{AttributeKind, AttributeSpec, AttributeValue, NOT_AVAILABLE};
pub use device::{
    Classification, DeviceIdentity, DeviceInfo, DeviceRecord, DeviceStatus, FeatureState,
    FingerprintRecord, StatsRecord, UNKNOWN_MODEL,
};
pub use report::{
    ContainerReservation, Device, DeviceGroup, DeviceGroupStats, DeviceLocality, DeviceStats,
    FingerprintResponse, StatsResponse,
};
