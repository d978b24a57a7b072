//! Common error types for autoblueprint.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for autoblueprint operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed discovery dump. `offset` is the byte position of the value
    /// that failed to decode.
    #[error("Failed to decode discovery dump near byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("No structured data found in classifier response")]
    NoStructuredDataFound,

    #[error("Template error: {0}")]
    Template(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_offset() {
        let err = Error::Parse {
            offset: 42,
            message: "expected value".to_string(),
        };
        assert!(err.to_string().contains("byte 42"));
    }

    #[test]
    fn test_missing_input_names_path() {
        let err = Error::MissingInput(PathBuf::from("input/programs.json"));
        assert!(err.to_string().contains("input/programs.json"));
    }
}
