//! Evidence records - provenance citations attached to derived values.

use crate::discovery::{DiscoveryTable, Row};
use serde::{Deserialize, Serialize};

/// Where a derived value came from. Descriptive only; nothing downstream
/// branches on evidence content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvidenceRecord {
    /// A row of the discovery export.
    OsqueryRecord {
        source: DiscoveryTable,
        /// Row position within `source`. Absent in schema "0" artifacts.
        #[serde(default)]
        index: Option<usize>,
        record: Row,
    },
    /// Attribution to the classification model.
    LlmClassification { source: String },
}

impl EvidenceRecord {
    pub fn osquery(source: DiscoveryTable, index: usize, record: &Row) -> Self {
        EvidenceRecord::OsqueryRecord {
            source,
            index: Some(index),
            record: record.clone(),
        }
    }

    /// Attribution to `model`, or "unknown" when no model was supplied.
    pub fn llm(model: Option<&str>) -> Self {
        let source = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("unknown")
            .to_string();
        EvidenceRecord::LlmClassification { source }
    }

    pub fn is_discovery_record(&self) -> bool {
        matches!(self, EvidenceRecord::OsqueryRecord { .. })
    }
}
