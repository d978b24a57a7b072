//! Workload record types - the canonical output of the workload builder.

use crate::evidence::EvidenceRecord;
use crate::host_spec::{HostSpec, HostSpecField};
use autoblueprint_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by this release.
pub const WORKLOAD_SCHEMA_VERSION: &str = "1.0.0";
/// Schema version of artifacts predating eligibility gating and wrapped host specs.
pub const LEGACY_SCHEMA_VERSION: &str = "0";
/// Components below this confidence are kept out of generated templates.
pub const DEFAULT_MIN_COMPONENT_CONFIDENCE: f64 = 0.6;

/// The complete workload record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    /// Schema version.
    pub schema_version: String,
    /// Provenance of this record.
    pub metadata: WorkloadMetadata,
    /// Host attributes, keyed by attribute name.
    pub host_spec: BTreeMap<String, HostSpecField>,
    /// Every classified component, eligible or not.
    pub software_components: Vec<WorkloadComponent>,
    /// Compute sizing decision.
    pub sizing: Sizing,
    /// What the template generator should produce.
    pub iac_intent: IacIntent,
    /// Points needing a human decision.
    #[serde(default)]
    pub open_questions: Vec<OpenQuestion>,
}

impl WorkloadRecord {
    /// Host attributes with evidence wrappers removed.
    pub fn host_spec(&self) -> HostSpec {
        HostSpec::from_fields(&self.host_spec)
    }

    /// Components that pass the eligibility gate and the intent's floor.
    pub fn eligible_components(&self) -> impl Iterator<Item = &WorkloadComponent> {
        let floor = self.iac_intent.min_component_confidence;
        self.software_components
            .iter()
            .filter(move |c| c.eligible_for_iac && c.confidence >= floor)
    }

    /// Fill fields that schema "0" records did not carry.
    pub fn upgrade_legacy(&mut self) {
        if self.schema_version != LEGACY_SCHEMA_VERSION {
            return;
        }
        let floor = self.iac_intent.min_component_confidence;
        for component in &mut self.software_components {
            component.eligible_for_iac = component.confidence >= floor;
        }
    }
}

/// Workload provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadMetadata {
    /// Input file stem, or "workload".
    pub workload_id: String,
    pub generated_at: Timestamp,
    pub input_files: Vec<InputFile>,
    pub llm: LlmProvenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub path: String,
    pub sha256: String,
}

/// Which model classified the components, and with what prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmProvenance {
    pub provider: String,
    pub model: Option<String>,
    pub prompt_hash: Option<String>,
}

/// A classified software component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadComponent {
    /// `cmp_` + 12 hex chars of a hash over name, version and type.
    pub component_id: String,
    #[serde(rename = "type")]
    pub component_type: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub eligible_for_iac: bool,
    /// Never empty: the classifier attribution is always last.
    pub evidence: Vec<EvidenceRecord>,
}

impl WorkloadComponent {
    /// Whether any discovery row corroborates this component.
    pub fn has_discovery_evidence(&self) -> bool {
        self.evidence.iter().any(EvidenceRecord::is_discovery_record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingBasis {
    HostSpecs,
    Unknown,
}

/// Compute sizing decision. The builder leaves the instance type unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sizing {
    pub recommended_instance_type: Option<String>,
    pub basis: SizingBasis,
    pub confidence: f64,
}

/// Target and policy for template generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IacIntent {
    pub target_platform: String,
    pub generator: String,
    pub migration_strategy: String,
    pub allowed_resource_types: Vec<String>,
    pub blocked_resource_types: Vec<String>,
    #[serde(default = "default_min_component_confidence")]
    pub min_component_confidence: f64,
}

impl Default for IacIntent {
    fn default() -> Self {
        Self {
            target_platform: "aws".to_string(),
            generator: "cloudformation".to_string(),
            migration_strategy: "rehost".to_string(),
            allowed_resource_types: Vec::new(),
            blocked_resource_types: Vec::new(),
            min_component_confidence: DEFAULT_MIN_COMPONENT_CONFIDENCE,
        }
    }
}

fn default_min_component_confidence() -> f64 {
    DEFAULT_MIN_COMPONENT_CONFIDENCE
}

/// Something the builder could not decide on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub component_ids: Vec<String>,
}
