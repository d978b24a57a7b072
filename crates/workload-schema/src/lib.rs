//! Workload schema definitions for autoblueprint.
//!
//! This crate defines the decoded discovery export, the evidence-annotated
//! workload record persisted between classification and template
//! generation, and the sizing catalog.

pub mod catalog;
pub mod discovery;
pub mod evidence;
pub mod host_spec;
pub mod schema;
pub mod validation;
pub mod workload;

pub use catalog::{InstanceCatalogEntry, SizingCatalog};
pub use discovery::{DiscoveryDump, DiscoveryTable, Row};
pub use evidence::EvidenceRecord;
pub use host_spec::{HostAttribute, HostSpec, HostSpecField};
pub use validation::validate_workload;
pub use workload::{
    IacIntent, InputFile, LlmProvenance, OpenQuestion, Sizing, SizingBasis, WorkloadComponent,
    WorkloadMetadata, WorkloadRecord, DEFAULT_MIN_COMPONENT_CONFIDENCE, LEGACY_SCHEMA_VERSION,
    WORKLOAD_SCHEMA_VERSION,
};
