//! CloudFormation template synthesis.

use crate::fields;
use crate::sizing;
use autoblueprint_common::{Error, Result};
use autoblueprint_workload_schema::{HostSpec, Row, SizingCatalog, WorkloadRecord};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const TEMPLATE_NAME: &str = "cloudformation";
const EMBEDDED_TEMPLATE: &str = include_str!("../templates/cloudformation.yaml.hbs");

/// A component as the template sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateComponent {
    pub name: String,
    pub resource_name: String,
    pub version: Option<String>,
    pub component_type: Option<String>,
    pub confidence: Option<f64>,
}

/// Everything the template is rendered with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateContext {
    pub workload_id: String,
    pub components: Vec<TemplateComponent>,
    pub specs: HostSpec,
    pub instance_type_default: Option<String>,
    pub ami_param_default: String,
    pub volume_size_default: u32,
    pub root_device_name: String,
}

impl TemplateContext {
    fn new(
        workload_id: String,
        components: Vec<TemplateComponent>,
        specs: Option<&HostSpec>,
        instance_type_default: Option<String>,
    ) -> Self {
        let ami = sizing::recommend_image_parameter(specs);
        Self {
            workload_id,
            components,
            specs: specs.cloned().unwrap_or_default(),
            instance_type_default,
            ami_param_default: ami.to_string(),
            volume_size_default: sizing::recommend_volume_size(specs),
            root_device_name: sizing::root_device_name(ami).to_string(),
        }
    }
}

/// Template-safe identifier: ASCII letters and digits only.
pub fn resource_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.is_empty() {
        "Component".to_string()
    } else {
        cleaned
    }
}

/// Resource names for `names`, with numeric suffixes on repeats. Every
/// returned name is unique, including against names that already end in a
/// digit.
pub fn assign_resource_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let base = resource_name(name);
            let mut candidate = base.clone();
            let mut suffix = 1;
            while used.contains(&candidate) {
                suffix += 1;
                candidate = format!("{}{}", base, suffix);
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

// Values land inside double-quoted YAML scalars.
fn yaml_escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Renders workloads (or bare component lists) into CloudFormation YAML.
pub struct TemplateSynthesizer {
    registry: Handlebars<'static>,
}

impl TemplateSynthesizer {
    /// Synthesizer using the built-in template.
    pub fn new() -> Result<Self> {
        Self::from_source(EMBEDDED_TEMPLATE)
    }

    /// Synthesizer using a template file in place of the built-in one.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_source(&source)
    }

    pub fn from_source(source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(yaml_escape);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| Error::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        debug!(
            "Rendering template with {} components, instance type {:?}",
            context.components.len(),
            context.instance_type_default
        );
        self.registry
            .render(TEMPLATE_NAME, context)
            .map_err(|e| Error::Template(e.to_string()))
    }

    /// Render the components of `workload` that pass the eligibility gate.
    ///
    /// A pre-computed `sizing.recommended_instance_type` wins over the
    /// catalog heuristic.
    pub fn render_workload(
        &self,
        workload: &WorkloadRecord,
        catalog: &SizingCatalog,
    ) -> Result<String> {
        let eligible: Vec<_> = workload.eligible_components().collect();
        let names = assign_resource_names(eligible.iter().map(|c| c.name.as_str()));
        let components = eligible
            .iter()
            .zip(names)
            .map(|(c, resource_name)| TemplateComponent {
                name: c.name.clone(),
                resource_name,
                version: c.version.clone(),
                component_type: c.component_type.clone(),
                confidence: Some(c.confidence),
            })
            .collect();

        let specs = workload.host_spec();
        let specs = (!specs.is_empty()).then_some(&specs);
        let instance_type = workload.sizing.recommended_instance_type.clone().or_else(|| {
            sizing::recommend_instance_type(specs, catalog).map(|e| e.name.clone())
        });

        let context = TemplateContext::new(
            workload.metadata.workload_id.clone(),
            components,
            specs,
            instance_type,
        );
        self.render(&context)
    }

    /// Render raw classifier output directly. No eligibility gate applies.
    pub fn render_components(
        &self,
        workload_id: &str,
        components: &[Row],
        specs: Option<&HostSpec>,
        catalog: &SizingCatalog,
    ) -> Result<String> {
        let names: Vec<String> = components.iter().map(fields::component_name).collect();
        let resource_names = assign_resource_names(names.iter().map(String::as_str));
        let components = components
            .iter()
            .zip(names)
            .zip(resource_names)
            .map(|((row, name), resource_name)| TemplateComponent {
                name,
                resource_name,
                version: fields::COMPONENT_VERSION.first_text(row),
                component_type: fields::COMPONENT_TYPE.first_text(row),
                confidence: None,
            })
            .collect();

        let instance_type =
            sizing::recommend_instance_type(specs, catalog).map(|e| e.name.clone());
        let context =
            TemplateContext::new(workload_id.to_string(), components, specs, instance_type);
        self.render(&context)
    }
}
