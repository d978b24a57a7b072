//! Host hardware/OS attributes, flat and evidence-wrapped.

use crate::evidence::EvidenceRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Confidence of an attribute backed by at least one discovery record.
pub const EVIDENCED_CONFIDENCE: f64 = 0.9;
/// Confidence of an attribute supplied without evidence.
pub const UNEVIDENCED_CONFIDENCE: f64 = 0.5;

/// Flat host attributes used for sizing. Every value is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub platform: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_physical_cores: Option<u64>,
    pub cpu_logical_cores: Option<u64>,
    pub memory_bytes: Option<u64>,
}

impl HostSpec {
    /// True when no attribute carries a value.
    pub fn is_empty(&self) -> bool {
        HostAttribute::ALL.iter().all(|a| a.value(self).is_none())
    }

    /// Unwrap evidence-wrapped fields back into bare values.
    ///
    /// Integer attributes accept numbers or numeric strings; anything else
    /// is treated as absent.
    pub fn from_fields(fields: &BTreeMap<String, HostSpecField>) -> Self {
        let text = |attr: HostAttribute| -> Option<String> {
            match fields.get(attr.as_str())?.value.as_ref()? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }
        };
        let int = |attr: HostAttribute| -> Option<u64> {
            match fields.get(attr.as_str())?.value.as_ref()? {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };

        Self {
            os_name: text(HostAttribute::OsName),
            os_version: text(HostAttribute::OsVersion),
            platform: text(HostAttribute::Platform),
            cpu_model: text(HostAttribute::CpuModel),
            cpu_physical_cores: int(HostAttribute::CpuPhysicalCores),
            cpu_logical_cores: int(HostAttribute::CpuLogicalCores),
            memory_bytes: int(HostAttribute::MemoryBytes),
        }
    }
}

/// Names of the [`HostSpec`] attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostAttribute {
    OsName,
    OsVersion,
    Platform,
    CpuModel,
    CpuPhysicalCores,
    CpuLogicalCores,
    MemoryBytes,
}

impl HostAttribute {
    pub const ALL: [HostAttribute; 7] = [
        HostAttribute::OsName,
        HostAttribute::OsVersion,
        HostAttribute::Platform,
        HostAttribute::CpuModel,
        HostAttribute::CpuPhysicalCores,
        HostAttribute::CpuLogicalCores,
        HostAttribute::MemoryBytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HostAttribute::OsName => "os_name",
            HostAttribute::OsVersion => "os_version",
            HostAttribute::Platform => "platform",
            HostAttribute::CpuModel => "cpu_model",
            HostAttribute::CpuPhysicalCores => "cpu_physical_cores",
            HostAttribute::CpuLogicalCores => "cpu_logical_cores",
            HostAttribute::MemoryBytes => "memory_bytes",
        }
    }

    /// The attribute's value on `spec` as JSON.
    pub fn value(&self, spec: &HostSpec) -> Option<Value> {
        match self {
            HostAttribute::OsName => spec.os_name.clone().map(Value::from),
            HostAttribute::OsVersion => spec.os_version.clone().map(Value::from),
            HostAttribute::Platform => spec.platform.clone().map(Value::from),
            HostAttribute::CpuModel => spec.cpu_model.clone().map(Value::from),
            HostAttribute::CpuPhysicalCores => spec.cpu_physical_cores.map(Value::from),
            HostAttribute::CpuLogicalCores => spec.cpu_logical_cores.map(Value::from),
            HostAttribute::MemoryBytes => spec.memory_bytes.map(Value::from),
        }
    }
}

impl fmt::Display for HostAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host attribute annotated with confidence and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HostSpecFieldRepr")]
pub struct HostSpecField {
    pub value: Option<Value>,
    pub confidence: f64,
    pub evidence: Vec<EvidenceRecord>,
}

impl HostSpecField {
    /// Wrap a value, deriving confidence from whether it is present and
    /// whether any evidence backs it.
    pub fn new(value: Option<Value>, evidence: Vec<EvidenceRecord>) -> Self {
        let value = value.filter(|v| !v.is_null());
        let confidence = match (&value, evidence.is_empty()) {
            (None, _) => 0.0,
            (Some(_), false) => EVIDENCED_CONFIDENCE,
            (Some(_), true) => UNEVIDENCED_CONFIDENCE,
        };
        Self {
            value,
            confidence,
            evidence,
        }
    }
}

// Schema "0" artifacts stored bare values instead of wrapped fields.
#[derive(Deserialize)]
#[serde(untagged)]
enum HostSpecFieldRepr {
    Wrapped {
        #[serde(default)]
        value: Option<Value>,
        confidence: f64,
        #[serde(default)]
        evidence: Vec<EvidenceRecord>,
    },
    Bare(Value),
}

impl From<HostSpecFieldRepr> for HostSpecField {
    fn from(repr: HostSpecFieldRepr) -> Self {
        match repr {
            HostSpecFieldRepr::Wrapped {
                value,
                confidence,
                evidence,
            } => Self {
                value,
                confidence,
                evidence,
            },
            HostSpecFieldRepr::Bare(value) => Self::new(Some(value), Vec::new()),
        }
    }
}
