//! JSON schema definitions for workload validation.

/// JSON Schema for workload.json.
pub const WORKLOAD_SCHEMA: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "$id": "https://autoblueprint.dev/schemas/workload.json",
  "title": "AutoBlueprint Workload",
  "type": "object",
  "required": ["schema_version", "metadata", "host_spec", "software_components", "sizing", "iac_intent"],
  "definitions": {
    "evidence": {
      "type": "object",
      "required": ["type", "source"],
      "properties": {
        "type": { "type": "string", "enum": ["osquery_record", "llm_classification"] },
        "source": { "type": "string" },
        "index": { "type": ["integer", "null"], "minimum": 0 },
        "record": { "type": "object" }
      }
    },
    "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
  },
  "properties": {
    "schema_version": {
      "type": "string",
      "pattern": "^(0|\\d+\\.\\d+\\.\\d+)$"
    },
    "metadata": {
      "type": "object",
      "required": ["workload_id", "generated_at", "input_files", "llm"],
      "properties": {
        "workload_id": { "type": "string", "minLength": 1 },
        "generated_at": { "type": "string", "format": "date-time" },
        "input_files": {
          "type": "array",
          "items": {
            "type": "object",
            "required": ["path", "sha256"],
            "properties": {
              "path": { "type": "string" },
              "sha256": { "type": "string", "pattern": "^[0-9a-f]{64}$" }
            }
          }
        },
        "llm": {
          "type": "object",
          "required": ["provider"],
          "properties": {
            "provider": { "type": "string" },
            "model": { "type": ["string", "null"] },
            "prompt_hash": { "type": ["string", "null"] }
          }
        }
      }
    },
    "host_spec": {
      "type": "object",
      "additionalProperties": {
        "anyOf": [
          {
            "type": "object",
            "required": ["value", "confidence", "evidence"],
            "properties": {
              "confidence": { "$ref": "#/definitions/confidence" },
              "evidence": { "type": "array", "items": { "$ref": "#/definitions/evidence" } }
            }
          },
          { "type": ["string", "integer", "null"] }
        ]
      }
    },
    "software_components": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["component_id", "name", "confidence", "evidence"],
        "properties": {
          "component_id": { "type": "string", "pattern": "^cmp_[0-9a-f]{12}$" },
          "type": { "type": ["string", "null"] },
          "name": { "type": "string" },
          "version": { "type": ["string", "null"] },
          "confidence": { "$ref": "#/definitions/confidence" },
          "eligible_for_iac": { "type": "boolean" },
          "evidence": {
            "type": "array",
            "minItems": 1,
            "items": { "$ref": "#/definitions/evidence" }
          }
        }
      }
    },
    "sizing": {
      "type": "object",
      "required": ["recommended_instance_type", "basis", "confidence"],
      "properties": {
        "recommended_instance_type": { "type": ["string", "null"] },
        "basis": { "type": "string", "enum": ["host_specs", "unknown"] },
        "confidence": { "$ref": "#/definitions/confidence" }
      }
    },
    "iac_intent": {
      "type": "object",
      "required": ["target_platform", "generator", "migration_strategy", "allowed_resource_types", "blocked_resource_types"],
      "properties": {
        "target_platform": { "type": "string" },
        "generator": { "type": "string" },
        "migration_strategy": { "type": "string" },
        "allowed_resource_types": { "type": "array", "items": { "type": "string" } },
        "blocked_resource_types": { "type": "array", "items": { "type": "string" } },
        "min_component_confidence": { "$ref": "#/definitions/confidence" }
      }
    },
    "open_questions": { "type": "array" }
  }
}"##;

/// Get the workload schema as a parsed JSON value.
pub fn workload_schema() -> serde_json::Value {
    serde_json::from_str(WORKLOAD_SCHEMA).expect("Invalid workload schema")
}
