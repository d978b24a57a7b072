//! Discovery dump types - the decoded OSQuery export.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single discovery row: column name to scalar.
pub type Row = Map<String, Value>;

/// Logical tables in the OSQuery export, in the order the discovery
/// queries emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryTable {
    OsVersion,
    CpuInfo,
    MemoryInfo,
    InterfaceDetails,
    Processes,
    Programs,
}

impl DiscoveryTable {
    /// All tables in export order.
    pub const ALL: [DiscoveryTable; 6] = [
        DiscoveryTable::OsVersion,
        DiscoveryTable::CpuInfo,
        DiscoveryTable::MemoryInfo,
        DiscoveryTable::InterfaceDetails,
        DiscoveryTable::Processes,
        DiscoveryTable::Programs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryTable::OsVersion => "os_version",
            DiscoveryTable::CpuInfo => "cpu_info",
            DiscoveryTable::MemoryInfo => "memory_info",
            DiscoveryTable::InterfaceDetails => "interface_details",
            DiscoveryTable::Processes => "processes",
            DiscoveryTable::Programs => "programs",
        }
    }
}

impl fmt::Display for DiscoveryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed discovery export.
///
/// Every table in [`DiscoveryTable::ALL`] is present; tables beyond the
/// number of decoded blocks hold no rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryDump {
    tables: BTreeMap<DiscoveryTable, Vec<Row>>,
    raw_blocks: Vec<Value>,
}

impl DiscoveryDump {
    /// Map decoded blocks positionally onto the table order.
    pub fn from_blocks(raw_blocks: Vec<Value>) -> Self {
        let mut tables = BTreeMap::new();
        for (i, table) in DiscoveryTable::ALL.iter().enumerate() {
            let rows = raw_blocks.get(i).map(rows_of).unwrap_or_default();
            tables.insert(*table, rows);
        }
        Self { tables, raw_blocks }
    }

    /// Rows of a table (empty if the block was absent).
    pub fn table(&self, table: DiscoveryTable) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First row of a table, if any.
    pub fn first_row(&self, table: DiscoveryTable) -> Option<&Row> {
        self.table(table).first()
    }

    /// The decoded blocks exactly as they appeared in the export.
    pub fn raw_blocks(&self) -> &[Value] {
        &self.raw_blocks
    }

    /// Number of decoded blocks.
    pub fn block_count(&self) -> usize {
        self.raw_blocks.len()
    }

    pub fn programs(&self) -> &[Row] {
        self.table(DiscoveryTable::Programs)
    }
}

// Non-object entries carry no columns and are not rows.
fn rows_of(block: &Value) -> Vec<Row> {
    match block {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_tables_default_to_empty() {
        let dump = DiscoveryDump::from_blocks(vec![
            json!([{"name": "Ubuntu", "platform": "ubuntu"}]),
            json!([{"cpu_brand": "Xeon"}]),
            json!([]),
        ]);

        assert_eq!(dump.block_count(), 3);
        assert_eq!(dump.table(DiscoveryTable::OsVersion).len(), 1);
        assert_eq!(dump.table(DiscoveryTable::CpuInfo).len(), 1);
        assert!(dump.table(DiscoveryTable::MemoryInfo).is_empty());
        assert!(dump.table(DiscoveryTable::InterfaceDetails).is_empty());
        assert!(dump.table(DiscoveryTable::Processes).is_empty());
        assert!(dump.programs().is_empty());
    }

    #[test]
    fn test_non_array_block_yields_no_rows() {
        let dump = DiscoveryDump::from_blocks(vec![json!({"name": "Ubuntu"})]);
        assert!(dump.table(DiscoveryTable::OsVersion).is_empty());
        assert_eq!(dump.raw_blocks().len(), 1);
    }

    #[test]
    fn test_table_names() {
        let names: Vec<&str> = DiscoveryTable::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            vec!["os_version", "cpu_info", "memory_info", "interface_details", "processes", "programs"]
        );
    }
}
