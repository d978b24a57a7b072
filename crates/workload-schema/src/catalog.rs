//! Instance catalog - the candidate compute classes for sizing.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One candidate compute class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCatalogEntry {
    pub name: String,
    pub vcpus: u32,
    pub memory_gib: u32,
    /// Burstable classes lose ties against general-purpose ones.
    #[serde(default)]
    pub burstable: bool,
}

impl InstanceCatalogEntry {
    pub fn new(name: impl Into<String>, vcpus: u32, memory_gib: u32, burstable: bool) -> Self {
        Self {
            name: name.into(),
            vcpus,
            memory_gib,
            burstable,
        }
    }
}

/// Ordered catalog. Declaration order is the final tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingCatalog {
    pub instances: Vec<InstanceCatalogEntry>,
}

impl Default for SizingCatalog {
    fn default() -> Self {
        Self {
            instances: vec![
                InstanceCatalogEntry::new("t3.micro", 2, 1, true),
                InstanceCatalogEntry::new("t3.small", 2, 2, true),
                InstanceCatalogEntry::new("t3.medium", 2, 4, true),
                InstanceCatalogEntry::new("t3.large", 2, 8, true),
                InstanceCatalogEntry::new("t3.xlarge", 4, 16, true),
                InstanceCatalogEntry::new("m5.large", 2, 8, false),
                InstanceCatalogEntry::new("m5.xlarge", 4, 16, false),
                InstanceCatalogEntry::new("m5.2xlarge", 8, 32, false),
                InstanceCatalogEntry::new("m5.4xlarge", 16, 64, false),
            ],
        }
    }
}

impl SizingCatalog {
    /// Load a catalog from a YAML or JSON file.
    ///
    /// Accepts either `{instances: [...]}` or a bare list of entries.
    pub fn load(path: &Path) -> autoblueprint_common::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                autoblueprint_common::Error::MissingInput(path.to_path_buf())
            }
            _ => autoblueprint_common::Error::Io(e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> autoblueprint_common::Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum CatalogFile {
            Wrapped(SizingCatalog),
            Bare(Vec<InstanceCatalogEntry>),
        }

        let catalog = match serde_yaml::from_str::<CatalogFile>(content)? {
            CatalogFile::Wrapped(catalog) => catalog,
            CatalogFile::Bare(instances) => SizingCatalog { instances },
        };
        if catalog.instances.is_empty() {
            return Err(autoblueprint_common::Error::Config(
                "sizing catalog has no instances".to_string(),
            ));
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let catalog = SizingCatalog::default();
        assert_eq!(catalog.instances.first().unwrap().name, "t3.micro");
        assert_eq!(catalog.instances.last().unwrap().name, "m5.4xlarge");
    }

    #[test]
    fn test_load_yaml_catalog() {
        let yaml = r#"
instances:
  - name: c6i.large
    vcpus: 2
    memory_gib: 4
  - name: t4g.small
    vcpus: 2
    memory_gib: 2
    burstable: true
"#;
        let catalog = SizingCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.instances.len(), 2);
        assert!(!catalog.instances[0].burstable);
        assert!(catalog.instances[1].burstable);
    }

    #[test]
    fn test_load_bare_json_list() {
        let json = r#"[{"name": "m5.large", "vcpus": 2, "memory_gib": 8}]"#;
        let catalog = SizingCatalog::from_yaml_str(json).unwrap();
        assert_eq!(catalog.instances[0].name, "m5.large");
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(SizingCatalog::from_yaml_str("instances: []").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, "- {name: m5.large, vcpus: 2, memory_gib: 8}\n").unwrap();
        assert_eq!(SizingCatalog::load(&path).unwrap().instances.len(), 1);
        assert!(SizingCatalog::load(&dir.path().join("missing.yaml")).is_err());
    }
}
