//! AutoBlueprint generator - turn an OSQuery export into an evidence-annotated
//! workload record and a CloudFormation template.

pub mod classifier;
pub mod confidence;
pub mod fields;
pub mod parser;
pub mod sizing;
pub mod specs;
pub mod template;
pub mod workload;

use autoblueprint_common::{Error, Result, Timestamp};
use autoblueprint_workload_schema::{validate_workload, SizingCatalog, WorkloadRecord};
use classifier::{ClassificationOracle, Classifier};
use std::path::{Path, PathBuf};
use template::TemplateSynthesizer;
use tracing::{info, warn};
use workload::WorkloadInputs;

pub const WORKLOAD_FILE_NAME: &str = "workload.json";
pub const TEMPLATE_FILE_NAME: &str = "autoblueprint_template.yaml";

/// Settings for one `generate` run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    /// Each run writes into a timestamped directory below this one.
    pub output_root: PathBuf,
    pub catalog: SizingCatalog,
    /// Template file replacing the built-in one.
    pub template: Option<PathBuf>,
    /// Render straight from classifier output, skipping the workload record.
    pub components_only: bool,
}

/// Files written by a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArtifacts {
    pub run_dir: PathBuf,
    pub workload_path: Option<PathBuf>,
    pub template_path: PathBuf,
    pub component_count: usize,
    pub rendered_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The classifier found nothing worth migrating; nothing was written.
    NothingDetected,
    Generated(GeneratedArtifacts),
}

/// Load the synthesizer for an optional template override.
pub fn load_synthesizer(template: Option<&Path>) -> Result<TemplateSynthesizer> {
    match template {
        Some(path) => TemplateSynthesizer::from_file(path),
        None => TemplateSynthesizer::new(),
    }
}

/// Discover, classify, build the workload record and render the template.
pub async fn run_pipeline<O: ClassificationOracle>(
    config: &PipelineConfig,
    classifier: &Classifier<O>,
) -> Result<PipelineOutcome> {
    let synthesizer = load_synthesizer(config.template.as_deref())?;

    let input = parser::load_discovery(&config.input)?;
    let dump = input.dump();
    let host_spec = dump.map(specs::extract_specs).filter(|s| !s.is_empty());
    match &host_spec {
        Some(spec) => info!("Host specs: {}", specs::describe(spec)),
        None => warn!("No host specs found in {:?}", config.input),
    }
    info!("Discovered {} programs", input.programs().len());

    let classification = classifier.classify(input.programs()).await;
    if classification.is_empty() {
        info!("No relevant components detected; nothing to generate");
        return Ok(PipelineOutcome::NothingDetected);
    }

    // Nothing is created on disk until every fallible input step succeeded.
    let run_dir = config
        .output_root
        .join(Timestamp::now().to_run_dir_name());
    let template_path = run_dir.join(TEMPLATE_FILE_NAME);

    if config.components_only {
        let rendered = synthesizer.render_components(
            &workload::workload_id(&config.input),
            &classification.components,
            host_spec.as_ref(),
            &config.catalog,
        )?;
        std::fs::create_dir_all(&run_dir)?;
        std::fs::write(&template_path, rendered)?;
        info!("Template written to {:?}", template_path);
        return Ok(PipelineOutcome::Generated(GeneratedArtifacts {
            run_dir,
            workload_path: None,
            template_path,
            component_count: classification.components.len(),
            rendered_count: classification.components.len(),
        }));
    }

    let record = workload::build_workload(WorkloadInputs {
        raw_programs: input.programs(),
        classified: &classification.components,
        specs: host_spec.as_ref(),
        dump,
        input_path: &config.input,
        llm: classifier.provenance(&classification),
    })?;

    std::fs::create_dir_all(&run_dir)?;
    let workload_path = run_dir.join(WORKLOAD_FILE_NAME);
    write_workload(&workload_path, &record)?;
    info!("Workload written to {:?}", workload_path);

    // Render from the persisted form so the template reflects what was saved.
    let persisted = read_workload(&workload_path)?;
    let rendered = synthesizer.render_workload(&persisted, &config.catalog)?;
    std::fs::write(&template_path, rendered)?;
    info!("Template written to {:?}", template_path);

    Ok(PipelineOutcome::Generated(GeneratedArtifacts {
        run_dir,
        workload_path: Some(workload_path),
        template_path,
        component_count: persisted.software_components.len(),
        rendered_count: persisted.eligible_components().count(),
    }))
}

pub fn write_workload(path: &Path, record: &WorkloadRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read and validate a persisted workload. Schema "0" records are upgraded.
pub fn read_workload(path: &Path) -> Result<WorkloadRecord> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let result =
        validate_workload(&value).map_err(|e| Error::SchemaValidation(e.to_string()))?;
    for warning in &result.warnings {
        warn!("{}", warning);
    }
    if !result.valid {
        let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
        return Err(Error::SchemaValidation(errors.join("; ")));
    }

    let mut record: WorkloadRecord = serde_json::from_value(value)?;
    record.upgrade_legacy();
    Ok(record)
}

/// Render the template for an existing workload file into `out`.
pub fn render_workload_file(
    workload_path: &Path,
    out: &Path,
    catalog: &SizingCatalog,
    template: Option<&Path>,
) -> Result<usize> {
    let synthesizer = load_synthesizer(template)?;
    let record = read_workload(workload_path)?;
    let rendered = synthesizer.render_workload(&record, catalog)?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, rendered)?;
    Ok(record.eligible_components().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::CannedOracle;
    use crate::classifier::SamplingPolicy;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const DUMP: &str = r#"[{"name": "Microsoft Windows Server 2019 Standard", "version": "10.0.17763", "platform": "windows"}]
[{"cpu_brand": "Intel(R) Xeon(R)", "cpu_physical_cores": "2", "cpu_logical_cores": "4", "physical_memory": "17179869184"}]
[]
[]
[]
[{"name": "Apache Tomcat 9", "version": "9.0.80", "publisher": "Apache"},
 {"name": "Microsoft SQL Server 2019", "version": "15.0", "publisher": "Microsoft Corporation"},
 {"name": "Notepad++", "publisher": "Notepad++ Team"}]"#;

    const REPLY: &str = r#"Here you go:
[{"name": "Apache Tomcat 9", "version": "9.0.80", "type": "app_server"},
 {"name": "Legacy Billing Agent", "type": "application"}]"#;

    fn config(dir: &Path, input: PathBuf) -> PipelineConfig {
        PipelineConfig {
            input,
            output_root: dir.join("output"),
            catalog: SizingCatalog::default(),
            template: None,
            components_only: false,
        }
    }

    fn write_input(dir: &Path) -> PathBuf {
        let path = dir.join("web01.json");
        std::fs::write(&path, DUMP).unwrap();
        path
    }

    #[tokio::test]
    async fn test_empty_classification_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), write_input(dir.path()));
        let classifier = Classifier::new(
            CannedOracle::replying("I could not find anything relevant."),
            SamplingPolicy::default(),
        );

        let outcome = run_pipeline(&config, &classifier).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::NothingDetected);
        assert!(!config.output_root.exists());
    }

    #[tokio::test]
    async fn test_oracle_failure_is_nothing_detected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), write_input(dir.path()));
        let classifier = Classifier::new(
            CannedOracle {
                reply: Err(Error::Other("connection refused".to_string())),
            },
            SamplingPolicy::default(),
        );

        let outcome = run_pipeline(&config, &classifier).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::NothingDetected);
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), dir.path().join("absent.json"));
        let classifier = Classifier::new(CannedOracle::replying(REPLY), SamplingPolicy::default());

        let result = run_pipeline(&config, &classifier).await;
        assert!(matches!(result, Err(Error::MissingInput(_))));
    }

    /// Oracle that moves the input away while "thinking".
    struct RelocatingOracle {
        input: PathBuf,
    }

    #[async_trait::async_trait]
    impl ClassificationOracle for RelocatingOracle {
        fn provenance(&self) -> autoblueprint_workload_schema::LlmProvenance {
            CannedOracle::replying(REPLY).provenance()
        }

        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
            std::fs::remove_file(&self.input)?;
            Ok(REPLY.to_string())
        }
    }

    #[tokio::test]
    async fn test_relocated_input_leaves_no_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path());
        let config = config(dir.path(), input.clone());
        let classifier = Classifier::new(RelocatingOracle { input }, SamplingPolicy::default());

        let result = run_pipeline(&config, &classifier).await;
        assert!(matches!(result, Err(Error::MissingInput(_))));
        assert!(!config.output_root.exists());
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), write_input(dir.path()));
        let classifier = Classifier::new(CannedOracle::replying(REPLY), SamplingPolicy::default());

        let outcome = run_pipeline(&config, &classifier).await.unwrap();
        let PipelineOutcome::Generated(artifacts) = outcome else {
            panic!("expected artifacts");
        };
        assert_eq!(artifacts.component_count, 2);
        assert_eq!(artifacts.rendered_count, 1);
        assert!(artifacts.run_dir.starts_with(&config.output_root));

        let workload_path = artifacts.workload_path.unwrap();
        let record = read_workload(&workload_path).unwrap();
        assert_eq!(record.metadata.workload_id, "web01");
        assert_eq!(record.metadata.llm.model.as_deref(), Some("canned-1"));
        assert!(record.metadata.llm.prompt_hash.is_some());
        assert_eq!(record.host_spec().memory_bytes, Some(17_179_869_184));
        assert!(record
            .software_components
            .iter()
            .all(|c| !c.evidence.is_empty()));

        // Gated components stay in the workload but not in the template.
        let template = std::fs::read_to_string(&artifacts.template_path).unwrap();
        assert!(template.contains("ApacheTomcat9Component:"));
        assert!(!template.contains("LegacyBillingAgentComponent"));
        assert!(record
            .software_components
            .iter()
            .any(|c| c.name == "Legacy Billing Agent"));
        assert!(template.contains(sizing::WINDOWS_2019_IMAGE));
        assert!(template.contains("\"m5.xlarge\""));
        assert!(template.contains("Default: 60"));
    }

    #[tokio::test]
    async fn test_workload_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), write_input(dir.path()));
        let classifier = Classifier::new(CannedOracle::replying(REPLY), SamplingPolicy::default());

        let PipelineOutcome::Generated(artifacts) =
            run_pipeline(&config, &classifier).await.unwrap()
        else {
            panic!("expected artifacts");
        };
        let path = artifacts.workload_path.unwrap();
        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let record = read_workload(&path).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), on_disk);

        let copy = dir.path().join("copy.json");
        write_workload(&copy, &record).unwrap();
        assert_eq!(read_workload(&copy).unwrap(), record);
    }

    #[tokio::test]
    async fn test_components_only_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), write_input(dir.path()));
        config.components_only = true;
        let classifier = Classifier::new(CannedOracle::replying(REPLY), SamplingPolicy::default());

        let PipelineOutcome::Generated(artifacts) =
            run_pipeline(&config, &classifier).await.unwrap()
        else {
            panic!("expected artifacts");
        };
        assert_eq!(artifacts.workload_path, None);
        assert!(!artifacts.run_dir.join(WORKLOAD_FILE_NAME).exists());
        let template = std::fs::read_to_string(&artifacts.template_path).unwrap();
        assert!(template.contains("LegacyBillingAgentComponent:"));
    }

    #[test]
    fn test_read_workload_rejects_missing_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.json");
        let doc = json!({
            "schema_version": "1.0.0",
            "metadata": {
                "workload_id": "host01",
                "generated_at": "2024-05-01T10:00:00Z",
                "input_files": [],
                "llm": {"provider": "openai", "model": "gpt-4", "prompt_hash": null}
            },
            "host_spec": {},
            "software_components": [{
                "component_id": "cmp_0123456789ab",
                "type": "database",
                "name": "PostgreSQL",
                "version": "15",
                "confidence": 0.9,
                "eligible_for_iac": true,
                "evidence": []
            }],
            "sizing": {"recommended_instance_type": null, "basis": "unknown", "confidence": 0.0},
            "iac_intent": {
                "target_platform": "aws",
                "generator": "cloudformation",
                "migration_strategy": "rehost",
                "allowed_resource_types": [],
                "blocked_resource_types": [],
                "min_component_confidence": 0.6
            },
            "open_questions": []
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        assert!(matches!(
            read_workload(&path),
            Err(Error::SchemaValidation(_))
        ));
    }

    #[test]
    fn test_render_legacy_workload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.json");
        let doc = json!({
            "schema_version": "0",
            "metadata": {
                "workload_id": "legacy",
                "generated_at": "2024-05-01T10:00:00Z",
                "input_files": [],
                "llm": {"provider": "openai", "model": "gpt-4", "prompt_hash": null}
            },
            "host_spec": {"os_name": "Ubuntu 20.04.6 LTS", "cpu_logical_cores": 2},
            "software_components": [
                {
                    "component_id": "cmp_0123456789ab",
                    "type": "middleware",
                    "name": "nginx",
                    "version": "1.18",
                    "confidence": 0.8,
                    "evidence": [
                        {"type": "osquery_record", "source": "programs", "record": {"name": "nginx"}},
                        {"type": "llm_classification", "source": "gpt-4"}
                    ]
                },
                {
                    "component_id": "cmp_ba9876543210",
                    "name": "toolbar",
                    "confidence": 0.4,
                    "evidence": [{"type": "llm_classification", "source": "gpt-4"}]
                }
            ],
            "sizing": {"recommended_instance_type": null, "basis": "host_specs", "confidence": 0.0},
            "iac_intent": {
                "target_platform": "aws",
                "generator": "cloudformation",
                "migration_strategy": "rehost",
                "allowed_resource_types": [],
                "blocked_resource_types": []
            }
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        let out = dir.path().join("rendered").join("template.yaml");
        let rendered = render_workload_file(&path, &out, &SizingCatalog::default(), None).unwrap();
        assert_eq!(rendered, 1);

        let template = std::fs::read_to_string(&out).unwrap();
        assert!(template.contains("nginxComponent:"));
        assert!(!template.contains("toolbarComponent"));
        assert!(template.contains(sizing::UBUNTU_2004_IMAGE));
        assert!(template.contains("\"t3.micro\""));
    }
}
