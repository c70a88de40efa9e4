//! Typed attribute values
//!
//! Every reported attribute carries a unit and a description taken from a
//! static [`AttributeSpec`]. Missing readings render as the
//! [`NOT_AVAILABLE`] sentinel instead of being dropped.

use serde::Serialize;
use std::fmt;

/// Sentinel text for a reading the driver could not provide.
/// Consumers match on this exact string.
pub const NOT_AVAILABLE: &str = "node is configured to skip this attribute";

/// Payload of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Int(i64),
    Ratio { numerator: i64, denominator: i64 },
    String(String),
}

/// A normalized attribute: value plus unit and description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeValue {
    pub unit: &'static str,
    pub desc: &'static str,
    #[serde(flatten)]
    pub value: AttributeKind,
}

impl AttributeValue {
    /// Whether this value is the "not available" sentinel
    pub fn is_not_available(&self) -> bool {
        matches!(&self.value, AttributeKind::String(s) if s == NOT_AVAILABLE)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            AttributeKind::Int(v) if self.unit.is_empty() => write!(f, "{}", v),
            AttributeKind::Int(v) => write!(f, "{} {}", v, self.unit),
            AttributeKind::Ratio {
                numerator,
                denominator,
            } if self.unit.is_empty() => write!(f, "{} / {}", numerator, denominator),
            AttributeKind::Ratio {
                numerator,
                denominator,
            } => write!(f, "{} / {} {}", numerator, denominator, self.unit),
            AttributeKind::String(s) => write!(f, "{}", s),
        }
    }
}

/// Registry entry: a named attribute with its unit and description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub desc: &'static str,
}

impl AttributeSpec {
    pub const fn new(name: &'static str, unit: &'static str, desc: &'static str) -> Self {
        Self { name, unit, desc }
    }

    fn with(&self, value: AttributeKind) -> AttributeValue {
        AttributeValue {
            unit: self.unit,
            desc: self.desc,
            value,
        }
    }

    /// The "not available" value for this attribute
    pub fn not_available(&self) -> AttributeValue {
        self.with(AttributeKind::String(NOT_AVAILABLE.to_string()))
    }

    /// Integer reading, or the sentinel when absent
    pub fn int<T: Into<u64>>(&self, value: Option<T>) -> AttributeValue {
        match value {
            Some(v) => self.with(AttributeKind::Int(saturating_i64(v.into()))),
            None => self.not_available(),
        }
    }

    /// Ratio reading. Both halves must be present.
    pub fn ratio<N: Into<u64>, D: Into<u64>>(
        &self,
        numerator: Option<N>,
        denominator: Option<D>,
    ) -> AttributeValue {
        match (numerator, denominator) {
            (Some(n), Some(d)) => self.with(AttributeKind::Ratio {
                numerator: saturating_i64(n.into()),
                denominator: saturating_i64(d.into()),
            }),
            _ => self.not_available(),
        }
    }

    /// String reading, or the sentinel when absent
    pub fn string<S: ToString>(&self, value: Option<S>) -> AttributeValue {
        match value {
            Some(s) => self.with(AttributeKind::String(s.to_string())),
            None => self.not_available(),
        }
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Static attributes reported once per device group
pub mod fingerprint {
    use super::AttributeSpec;

    pub const MEMORY: AttributeSpec = AttributeSpec::new("memory", "MiB", "Total framebuffer memory");
    pub const POWER: AttributeSpec = AttributeSpec::new("power", "W", "Power management limit");
    pub const BAR1: AttributeSpec = AttributeSpec::new("bar1", "MiB", "Total BAR1 memory");
    pub const PCI_BANDWIDTH: AttributeSpec =
        AttributeSpec::new("pci_bandwidth", "MB/s", "Maximum PCIe link bandwidth");
    pub const CORES_CLOCK: AttributeSpec =
        AttributeSpec::new("cores_clock", "MHz", "Graphics clock");
    pub const MEMORY_CLOCK: AttributeSpec =
        AttributeSpec::new("memory_clock", "MHz", "Memory clock");
    pub const DISPLAY_STATE: AttributeSpec =
        AttributeSpec::new("display_state", "", "Whether a display is initialized on the device");
    pub const PERSISTENCE_MODE: AttributeSpec =
        AttributeSpec::new("persistence_mode", "", "Driver persistence mode");
    pub const DRIVER_VERSION: AttributeSpec =
        AttributeSpec::new("driver_version", "", "System driver version");
}

/// Dynamic attributes reported per device on every stats poll
pub mod stats {
    use super::AttributeSpec;

    pub const POWER_USAGE: AttributeSpec = AttributeSpec::new(
        "Power usage",
        "W",
        "Power usage for this GPU in watts and its associated circuitry (e.g. memory) / Maximum GPU Power",
    );
    pub const GPU_UTILIZATION: AttributeSpec = AttributeSpec::new(
        "GPU utilization",
        "%",
        "Percent of time over the past sample period during which one or more kernels were executing on the GPU.",
    );
    pub const MEMORY_UTILIZATION: AttributeSpec = AttributeSpec::new(
        "Memory utilization",
        "%",
        "Percentage of bandwidth used during the past sample period",
    );
    pub const ENCODER_UTILIZATION: AttributeSpec =
        AttributeSpec::new("Encoder utilization", "%", "Percent of time over the past sample period during which GPU Encoder was used");
    pub const DECODER_UTILIZATION: AttributeSpec =
        AttributeSpec::new("Decoder utilization", "%", "Percent of time over the past sample period during which GPU Decoder was used");
    pub const TEMPERATURE: AttributeSpec =
        AttributeSpec::new("Temperature", "C", "Temperature of the Unit");
    pub const MEMORY_STATE: AttributeSpec =
        AttributeSpec::new("Memory state", "MiB", "UsedMemory / TotalMemory");
    pub const BAR1_STATE: AttributeSpec =
        AttributeSpec::new("BAR1 buffer state", "MiB", "UsedBAR1 / TotalBAR1");
    pub const ECC_ERRORS_L1: AttributeSpec =
        AttributeSpec::new("ECC L1 errors", "#", "Requested L1Cache error counter for the device");
    pub const ECC_ERRORS_L2: AttributeSpec =
        AttributeSpec::new("ECC L2 errors", "#", "Requested L2Cache error counter for the device");
    pub const ECC_ERRORS_DEVICE: AttributeSpec =
        AttributeSpec::new("ECC memory errors", "#", "Requested memory error counter for the device");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_present() {
        let value = stats::TEMPERATURE.int(Some(65u32));
        assert_eq!(value.value, AttributeKind::Int(65));
        assert_eq!(value.unit, "C");
        assert_eq!(value.desc, "Temperature of the Unit");
    }

    #[test]
    fn test_int_absent_is_sentinel() {
        let value = stats::TEMPERATURE.int(None::<u32>);
        assert!(value.is_not_available());
        assert_eq!(value.unit, "C");
        assert_eq!(value.desc, stats::TEMPERATURE.desc);
    }

    #[test]
    fn test_int_saturates() {
        let value = stats::ECC_ERRORS_DEVICE.int(Some(u64::MAX));
        assert_eq!(value.value, AttributeKind::Int(i64::MAX));
    }

    #[test]
    fn test_ratio_needs_both_halves() {
        let value = stats::MEMORY_STATE.ratio(Some(1024u64), Some(16384u64));
        assert_eq!(
            value.value,
            AttributeKind::Ratio {
                numerator: 1024,
                denominator: 16384
            }
        );

        assert!(stats::MEMORY_STATE
            .ratio(None::<u64>, Some(16384u64))
            .is_not_available());
        assert!(stats::MEMORY_STATE
            .ratio(Some(1024u64), None::<u64>)
            .is_not_available());
    }

    #[test]
    fn test_display() {
        assert_eq!(stats::TEMPERATURE.int(Some(40u32)).to_string(), "40 C");
        assert_eq!(
            stats::MEMORY_STATE
                .ratio(Some(10u64), Some(20u64))
                .to_string(),
            "10 / 20 MiB"
        );
        assert_eq!(
            fingerprint::DISPLAY_STATE.string(Some("Enabled")).to_string(),
            "Enabled"
        );
    }

    #[test]
    fn test_serialize_sentinel() {
        let json = serde_json::to_value(stats::TEMPERATURE.not_available()).unwrap();
        assert_eq!(json["string"], NOT_AVAILABLE);
        assert_eq!(json["unit"], "C");
    }
}
