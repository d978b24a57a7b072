//! Workload validation utilities.

use crate::schema;
use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;

/// Validation error type.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Component without evidence: {0}")]
    ComponentWithoutEvidence(String),

    #[error("Component {component_id} eligible below confidence floor ({confidence:.2} < {floor:.2})")]
    EligibleBelowFloor {
        component_id: String,
        confidence: f64,
        floor: f64,
    },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result of workload validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a workload document against the JSON schema and the
/// component invariants the schema cannot express.
pub fn validate_workload(workload: &Value) -> Result<ValidationResult, ValidationError> {
    let mut result = ValidationResult::new();

    let schema_value = schema::workload_schema();
    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|e| ValidationError::SchemaError(e.to_string()))?;

    let validation = compiled.validate(workload);
    if let Err(errors) = validation {
        for error in errors {
            result.add_error(ValidationError::SchemaError(format!(
                "{} at {}",
                error, error.instance_path
            )));
        }
    }

    let floor = workload
        .pointer("/iac_intent/min_component_confidence")
        .and_then(Value::as_f64)
        .unwrap_or(crate::DEFAULT_MIN_COMPONENT_CONFIDENCE);

    if let Some(components) = workload
        .get("software_components")
        .and_then(|c| c.as_array())
    {
        for component in components {
            let component_id = component
                .get("component_id")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown")
                .to_string();

            let evidence_empty = component
                .get("evidence")
                .and_then(|e| e.as_array())
                .map(|e| e.is_empty())
                .unwrap_or(true);
            if evidence_empty {
                result.add_error(ValidationError::ComponentWithoutEvidence(
                    component_id.clone(),
                ));
            }

            let eligible = component
                .get("eligible_for_iac")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let confidence = component
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            if eligible && confidence < floor {
                result.add_warning(
                    ValidationError::EligibleBelowFloor {
                        component_id,
                        confidence,
                        floor,
                    }
                    .to_string(),
                );
            }
        }
    }

    Ok(result)
}
