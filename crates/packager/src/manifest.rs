//! Data manifest - which paths to package and which to leave out.

use autoblueprint_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_PATH: &str = "data_manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataManifest {
    /// Files or directories to package.
    #[serde(default)]
    pub include: Vec<String>,
    /// Shell-style globs matched against paths relative to their include.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl DataManifest {
    /// Load a manifest written as JSON or YAML.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: DataManifest = serde_yaml::from_str(content)?;
        if manifest.include.is_empty() {
            return Err(Error::Config("manifest has no 'include' paths".to_string()));
        }
        Ok(manifest)
    }

    /// Include paths with a leading `~/` expanded to the home directory.
    pub fn include_paths(&self) -> Vec<PathBuf> {
        let home = home::home_dir();
        self.include
            .iter()
            .map(|p| match (p.strip_prefix("~/"), &home) {
                (Some(rest), Some(home)) => home.join(rest),
                _ => PathBuf::from(p),
            })
            .collect()
    }
}
