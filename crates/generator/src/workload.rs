//! Workload builder - merges discovery evidence, host specs and classifier
//! output into one canonical record.

use crate::confidence::{self, ComponentSignals};
use crate::fields;
use crate::specs;
use autoblueprint_common::{hash, Result, Timestamp};
use autoblueprint_workload_schema::{
    DiscoveryDump, DiscoveryTable, EvidenceRecord, HostAttribute, HostSpec, HostSpecField,
    IacIntent, InputFile, LlmProvenance, OpenQuestion, Row, Sizing, SizingBasis,
    WorkloadComponent, WorkloadMetadata, WorkloadRecord, WORKLOAD_SCHEMA_VERSION,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Raw discovery rows cited per component.
pub const MAX_COMPONENT_EVIDENCE: usize = 3;

/// Everything the builder consumes.
pub struct WorkloadInputs<'a> {
    pub raw_programs: &'a [Row],
    pub classified: &'a [Row],
    pub specs: Option<&'a HostSpec>,
    pub dump: Option<&'a DiscoveryDump>,
    pub input_path: &'a Path,
    pub llm: LlmProvenance,
}

/// Raw programs grouped by normalized name, in first-seen order.
pub struct ProgramIndex<'a> {
    by_name: HashMap<String, Vec<(usize, &'a Row)>>,
}

impl<'a> ProgramIndex<'a> {
    pub fn new(programs: &'a [Row]) -> Self {
        let mut by_name: HashMap<String, Vec<(usize, &'a Row)>> = HashMap::new();
        for (index, program) in programs.iter().enumerate() {
            let key = fields::normalize_name(&fields::component_name(program));
            if key.is_empty() {
                continue;
            }
            by_name.entry(key).or_default().push((index, program));
        }
        Self { by_name }
    }

    /// Rows whose name matches, with their position in the program table.
    pub fn matches(&self, name: &str) -> &[(usize, &'a Row)] {
        self.by_name
            .get(&fields::normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Build the canonical component for one classifier entry.
pub fn build_component(
    classified: &Row,
    index: &ProgramIndex<'_>,
    model: Option<&str>,
) -> WorkloadComponent {
    let name = fields::component_name(classified);
    let version = fields::COMPONENT_VERSION.first_text(classified);
    let component_type = fields::COMPONENT_TYPE.first_text(classified);
    let raw_matches = index.matches(&name);

    let mut evidence: Vec<EvidenceRecord> = raw_matches
        .iter()
        .take(MAX_COMPONENT_EVIDENCE)
        .map(|(i, row)| EvidenceRecord::osquery(DiscoveryTable::Programs, *i, row))
        .collect();
    evidence.push(EvidenceRecord::llm(model));

    let confidence = confidence::component_confidence(ComponentSignals {
        discovery_matches: raw_matches.len(),
        has_version: version.is_some(),
        has_type: component_type.is_some(),
    });

    WorkloadComponent {
        component_id: confidence::component_id(
            &name,
            version.as_deref(),
            component_type.as_deref(),
        ),
        component_type,
        name,
        version,
        confidence,
        eligible_for_iac: confidence::is_eligible(confidence),
        evidence,
    }
}

/// Wrap each host attribute with its confidence and the discovery row it
/// came from. The first row of the source table is cited whenever that
/// table is non-empty, even if the attribute's column was missing.
pub fn build_host_spec(
    spec: &HostSpec,
    dump: Option<&DiscoveryDump>,
) -> BTreeMap<String, HostSpecField> {
    HostAttribute::ALL
        .iter()
        .map(|attribute| {
            let value = attribute.value(spec);
            let evidence = dump
                .and_then(|dump| {
                    let table = specs::source_table(*attribute, dump);
                    dump.first_row(table)
                        .map(|row| EvidenceRecord::osquery(table, 0, row))
                })
                .into_iter()
                .collect();
            (
                attribute.as_str().to_string(),
                HostSpecField::new(value, evidence),
            )
        })
        .collect()
}

/// Input file stem, or "workload" when there is none.
pub fn workload_id(input_path: &Path) -> String {
    input_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "workload".to_string())
}

/// Build the workload record.
///
/// Hashes the input file, so the path must still point at the discovery
/// export.
pub fn build_workload(inputs: WorkloadInputs<'_>) -> Result<WorkloadRecord> {
    let sha256 = hash::sha256_file(inputs.input_path)?;

    let index = ProgramIndex::new(inputs.raw_programs);
    let model = inputs.llm.model.as_deref();
    let components: Vec<WorkloadComponent> = inputs
        .classified
        .iter()
        .map(|c| build_component(c, &index, model))
        .collect();

    let specs = inputs.specs.filter(|s| !s.is_empty());
    let host_spec = specs
        .map(|s| build_host_spec(s, inputs.dump))
        .unwrap_or_default();

    let mut open_questions = Vec::new();
    if specs.is_none() {
        open_questions.push(OpenQuestion {
            code: "no_host_specs".to_string(),
            message: "No host specs were discovered; instance sizing uses template defaults"
                .to_string(),
            component_ids: vec![],
        });
    }
    let intent = IacIntent::default();
    for component in components.iter().filter(|c| !c.eligible_for_iac) {
        open_questions.push(OpenQuestion {
            code: "below_iac_threshold".to_string(),
            message: format!(
                "{} ({:.2}) is below the IaC confidence floor {:.2}; confirm it before adding it to the template",
                component.name, component.confidence, intent.min_component_confidence
            ),
            component_ids: vec![component.component_id.clone()],
        });
    }

    debug!(
        "Built {} components ({} eligible)",
        components.len(),
        components.iter().filter(|c| c.eligible_for_iac).count()
    );

    Ok(WorkloadRecord {
        schema_version: WORKLOAD_SCHEMA_VERSION.to_string(),
        metadata: WorkloadMetadata {
            workload_id: workload_id(inputs.input_path),
            generated_at: Timestamp::now(),
            input_files: vec![InputFile {
                path: inputs.input_path.to_string_lossy().to_string(),
                sha256,
            }],
            llm: inputs.llm,
        },
        host_spec,
        software_components: components,
        sizing: Sizing {
            recommended_instance_type: None,
            basis: if specs.is_some() {
                SizingBasis::HostSpecs
            } else {
                SizingBasis::Unknown
            },
            confidence: 0.0,
        },
        iac_intent: intent,
        open_questions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_dump;
    use crate::specs::extract_specs;
    use autoblueprint_workload_schema::host_spec::{EVIDENCED_CONFIDENCE, UNEVIDENCED_CONFIDENCE};
    use serde_json::{json, Value};

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn provenance() -> LlmProvenance {
        LlmProvenance {
            provider: "openai".to_string(),
            model: Some("gpt-4".to_string()),
            prompt_hash: None,
        }
    }

    #[test]
    fn test_component_with_discovery_match() {
        let programs = rows(json!([
            {"name": "Apache Tomcat 9", "version": "9.0.80"},
            {"name": "7-Zip"},
            {"name": " apache tomcat 9 ", "version": "9.0.75"}
        ]));
        let index = ProgramIndex::new(&programs);
        let classified = rows(json!([
            {"program": "Apache Tomcat 9", "product_version": "9.0.80", "category": "app_server"}
        ]));

        let component = build_component(&classified[0], &index, Some("gpt-4"));
        assert_eq!(component.name, "Apache Tomcat 9");
        assert_eq!(component.version.as_deref(), Some("9.0.80"));
        assert_eq!(component.component_type.as_deref(), Some("app_server"));
        assert_eq!(component.confidence, 0.95);
        assert!(component.eligible_for_iac);

        assert_eq!(component.evidence.len(), 3);
        assert_eq!(
            component.evidence[0],
            EvidenceRecord::osquery(DiscoveryTable::Programs, 0, &programs[0])
        );
        assert_eq!(
            component.evidence[1],
            EvidenceRecord::osquery(DiscoveryTable::Programs, 2, &programs[2])
        );
        assert_eq!(component.evidence[2], EvidenceRecord::llm(Some("gpt-4")));
    }

    #[test]
    fn test_component_evidence_capped() {
        let programs = rows(json!([
            {"name": "Java"}, {"name": "Java"}, {"name": "Java"}, {"name": "Java"}, {"name": "Java"}
        ]));
        let index = ProgramIndex::new(&programs);
        let classified = rows(json!([{"name": "Java"}]));

        let component = build_component(&classified[0], &index, None);
        assert_eq!(component.evidence.len(), MAX_COMPONENT_EVIDENCE + 1);
        assert_eq!(component.evidence.last(), Some(&EvidenceRecord::llm(None)));
    }

    #[test]
    fn test_unmatched_component_keeps_llm_evidence() {
        let index = ProgramIndex::new(&[]);
        let classified = rows(json!([{"type": "database"}]));

        let component = build_component(&classified[0], &index, Some("gpt-4"));
        assert_eq!(component.name, "unknown");
        assert_eq!(component.confidence, 0.45);
        assert!(!component.eligible_for_iac);
        assert_eq!(component.evidence, vec![EvidenceRecord::llm(Some("gpt-4"))]);
    }

    #[test]
    fn test_workload_id() {
        assert_eq!(workload_id(Path::new("input/web01.json")), "web01");
        assert_eq!(workload_id(Path::new("dumps/host.tar.gz")), "host.tar");
        assert_eq!(workload_id(Path::new("")), "workload");
    }

    #[test]
    fn test_host_spec_fields_cite_first_rows() {
        let dump = parse_dump(
            r#"[{"name": "Ubuntu", "version": "22.04", "platform": "ubuntu"}]
               [{"cpu_brand": "Xeon", "cpu_logical_cores": "4"}]
               []"#,
        )
        .unwrap();
        let spec = extract_specs(&dump);
        let fields = build_host_spec(&spec, Some(&dump));

        assert_eq!(fields.len(), HostAttribute::ALL.len());
        let os_name = &fields["os_name"];
        assert_eq!(os_name.value, Some(json!("Ubuntu")));
        assert_eq!(os_name.confidence, EVIDENCED_CONFIDENCE);
        assert!(matches!(
            &os_name.evidence[0],
            EvidenceRecord::OsqueryRecord { source: DiscoveryTable::OsVersion, index: Some(0), .. }
        ));

        let memory = &fields["memory_bytes"];
        assert_eq!(memory.value, None);
        assert_eq!(memory.confidence, 0.0);
        assert!(memory.evidence.is_empty());

        let cores = &fields["cpu_physical_cores"];
        assert_eq!(cores.value, None);
        assert_eq!(cores.evidence.len(), 1);
        assert_eq!(cores.confidence, 0.0);
    }

    #[test]
    fn test_missing_column_keeps_row_citation() {
        let dump = parse_dump(r#"[{"name": "Ubuntu"}] [{"cpu_brand": "Xeon"}] []"#).unwrap();
        let fields = build_host_spec(&extract_specs(&dump), Some(&dump));

        let platform = &fields["platform"];
        assert_eq!(platform.value, None);
        assert_eq!(platform.confidence, 0.0);
        assert_eq!(
            platform.evidence,
            vec![EvidenceRecord::osquery(
                DiscoveryTable::OsVersion,
                0,
                &dump.table(DiscoveryTable::OsVersion)[0]
            )]
        );
    }

    #[test]
    fn test_supplied_specs_without_dump() {
        let spec = HostSpec {
            platform: Some("windows".to_string()),
            ..Default::default()
        };
        let fields = build_host_spec(&spec, None);
        assert_eq!(fields["platform"].confidence, UNEVIDENCED_CONFIDENCE);
    }

    #[test]
    fn test_build_workload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web01.json");
        let text = r#"[{"name": "Ubuntu", "platform": "ubuntu"}] [{"cpu_logical_cores": "2"}] [] [] []
[{"name": "nginx", "version": "1.24.0"}, {"name": "openssl"}]"#;
        std::fs::write(&path, text).unwrap();

        let dump = parse_dump(text).unwrap();
        let spec = extract_specs(&dump);
        let classified = rows(json!([
            {"name": "nginx", "version": "1.24.0", "type": "middleware"},
            {"name": "Redis", "type": "database"}
        ]));

        let workload = build_workload(WorkloadInputs {
            raw_programs: dump.programs(),
            classified: &classified,
            specs: Some(&spec),
            dump: Some(&dump),
            input_path: &path,
            llm: provenance(),
        })
        .unwrap();

        assert_eq!(workload.schema_version, WORKLOAD_SCHEMA_VERSION);
        assert_eq!(workload.metadata.workload_id, "web01");
        assert_eq!(workload.metadata.input_files[0].sha256, hash::sha256_str(text));
        assert_eq!(workload.sizing.basis, SizingBasis::HostSpecs);
        assert_eq!(workload.sizing.recommended_instance_type, None);
        assert_eq!(workload.iac_intent.min_component_confidence, 0.6);
        assert_eq!(workload.iac_intent.migration_strategy, "rehost");

        assert_eq!(workload.software_components.len(), 2);
        assert!(workload.software_components[0].eligible_for_iac);
        assert!(!workload.software_components[1].eligible_for_iac);
        assert_eq!(workload.open_questions.len(), 1);
        assert_eq!(
            workload.open_questions[0].component_ids,
            vec![workload.software_components[1].component_id.clone()]
        );
    }

    #[test]
    fn test_build_workload_without_specs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("programs.json");
        std::fs::write(&path, r#"[{"name": "Java 8"}]"#).unwrap();
        let programs = rows(json!([{"name": "Java 8"}]));

        let workload = build_workload(WorkloadInputs {
            raw_programs: &programs,
            classified: &programs,
            specs: None,
            dump: None,
            input_path: &path,
            llm: provenance(),
        })
        .unwrap();

        assert!(workload.host_spec.is_empty());
        assert_eq!(workload.sizing.basis, SizingBasis::Unknown);
        assert_eq!(workload.open_questions[0].code, "no_host_specs");
    }

    #[test]
    fn test_build_workload_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_workload(WorkloadInputs {
            raw_programs: &[],
            classified: &[],
            specs: None,
            dump: None,
            input_path: &dir.path().join("moved.json"),
            llm: provenance(),
        });
        assert!(matches!(
            result,
            Err(autoblueprint_common::Error::MissingInput(_))
        ));
    }
}
