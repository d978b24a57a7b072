//! AutoBlueprint packager - bundle site data named by a data manifest into a
//! gzip tarball for the upload step.

pub mod archive;
pub mod manifest;

pub use archive::{build_archive, ArchiveSummary, ExcludeSet};
pub use manifest::{DataManifest, DEFAULT_MANIFEST_PATH};
