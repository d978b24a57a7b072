//! Ordered field-fallback policies for loosely-shaped rows.
//!
//! OSQuery column names differ between platforms and classifier replies
//! use whatever keys the model picked, so every lookup goes through an
//! explicit priority list: the first present, non-empty field wins.

use autoblueprint_workload_schema::Row;
use serde_json::Value;

/// A priority-ordered list of candidate column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    fields: &'static [&'static str],
}

impl FieldPolicy {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    /// First non-empty string (numbers are rendered as text).
    pub fn first_text(&self, row: &Row) -> Option<String> {
        self.fields.iter().find_map(|field| match row.get(*field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// First field that parses as a positive integer. Empty strings,
    /// unparsable text and zero all count as absent.
    pub fn first_int(&self, row: &Row) -> Option<u64> {
        self.fields
            .iter()
            .find_map(|field| parse_int(row.get(*field)?).filter(|n| *n > 0))
    }
}

fn parse_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub const COMPONENT_NAME: FieldPolicy =
    FieldPolicy::new(&["name", "program", "display_name", "product"]);
pub const COMPONENT_VERSION: FieldPolicy = FieldPolicy::new(&["version", "product_version"]);
pub const COMPONENT_TYPE: FieldPolicy = FieldPolicy::new(&["type", "category"]);
pub const PUBLISHER: FieldPolicy = FieldPolicy::new(&["publisher"]);

pub const OS_NAME: FieldPolicy = FieldPolicy::new(&["name"]);
pub const OS_VERSION: FieldPolicy = FieldPolicy::new(&["version", "build"]);
pub const OS_PLATFORM: FieldPolicy = FieldPolicy::new(&["platform"]);
pub const CPU_MODEL: FieldPolicy = FieldPolicy::new(&["cpu_brand", "model"]);
pub const CPU_PHYSICAL_CORES: FieldPolicy =
    FieldPolicy::new(&["cpu_physical_cores", "number_of_cores"]);
pub const CPU_LOGICAL_CORES: FieldPolicy =
    FieldPolicy::new(&["cpu_logical_cores", "logical_processors"]);
pub const CPU_PHYSICAL_MEMORY: FieldPolicy = FieldPolicy::new(&["physical_memory"]);
pub const MEMORY_TOTAL_BYTES: FieldPolicy = FieldPolicy::new(&["total_bytes"]);

/// Display name of a program or classified component, "unknown" if none.
pub fn component_name(row: &Row) -> String {
    COMPONENT_NAME
        .first_text(row)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Lookup key for matching classified components against discovery rows.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
