//! Site archive writing.

use crate::manifest::DataManifest;
use autoblueprint_common::{hash, Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: usize,
    /// Include paths that did not exist.
    pub missing: Vec<PathBuf>,
    pub sha256: String,
}

/// Compiled exclude globs.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    set: GlobSet,
}

impl ExcludeSet {
    pub fn new(globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let compiled = GlobBuilder::new(&shell_glob(glob))
                .literal_separator(false)
                .backslash_escape(false)
                .build()
                .map_err(|e| Error::Config(format!("invalid exclude pattern '{}': {}", glob, e)))?;
            builder.add(compiled);
        }
        let set = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid exclude patterns: {}", e)))?;
        Ok(Self { set })
    }

    /// Whether `rel_path` (forward-slash separated) matches any glob.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Rewrite a shell glob so globset reads it the way a shell does: an
/// unclosed `[` and braces are literal, and a leading `^` in a class is a
/// plain caret (only `!` negates).
fn shell_glob(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '[' => {
                let mut j = i + 1;
                if chars.get(j) == Some(&'!') {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                match chars[j.min(chars.len())..].iter().position(|c| *c == ']') {
                    Some(p) => {
                        let end = j + p;
                        out.push_str(&class(&chars[i + 1..end]));
                        i = end;
                    }
                    None => out.push_str("[[]"),
                }
            }
            '{' => out.push_str("[{]"),
            '}' => out.push_str("[}]"),
            c => out.push(c),
        }
        i += 1;
    }
    out
}

fn class(body: &[char]) -> String {
    let mut body: Vec<char> = body.to_vec();
    if body.first() == Some(&'^') {
        body.remove(0);
        if body.is_empty() {
            return "^".to_string();
        }
        // a trailing `-` must stay last to remain literal
        if body.len() > 1 && body.last() == Some(&'-') {
            body.insert(body.len() - 1, '^');
        } else {
            body.push('^');
        }
    }
    let mut out = String::from("[");
    out.extend(body);
    out.push(']');
    out
}

fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|e| Error::Archive(e.to_string()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Regular files below `dir`, sorted by name, as (absolute path, path
/// relative to `dir`). Symlinked directories are not descended.
fn collect_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Archive(e.to_string()))?;
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }
        let rel = relative_name(dir, entry.path())?;
        out.push((entry.into_path(), rel));
    }
    Ok(out)
}

fn append_include<W: Write>(
    archive: &mut Builder<W>,
    include: &Path,
    excludes: &ExcludeSet,
) -> Result<usize> {
    let include = std::fs::canonicalize(include)?;
    let top = include
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if include.is_file() {
        if excludes.is_excluded(&top) {
            debug!("Excluded {}", top);
            return Ok(0);
        }
        archive.append_path_with_name(&include, &top)?;
        return Ok(1);
    }

    let files = collect_files(&include)?;
    let mut count = 0;
    for (path, rel) in files {
        if excludes.is_excluded(&rel) {
            debug!("Excluded {}", rel);
            continue;
        }
        let name = if top.is_empty() {
            rel
        } else {
            format!("{}/{}", top, rel)
        };
        archive.append_path_with_name(&path, &name)?;
        count += 1;
    }
    Ok(count)
}

/// Write every included file not matched by an exclude glob into a gzip
/// tarball at `out`.
///
/// Directory entries are prefixed with the include's own directory name so
/// two includes cannot collide. Missing includes are skipped with a warning.
pub fn build_archive(manifest: &DataManifest, out: &Path) -> Result<ArchiveSummary> {
    if manifest.include.is_empty() {
        return Err(Error::Config("manifest has no 'include' paths".to_string()));
    }
    let excludes = ExcludeSet::new(&manifest.exclude)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(out)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = Builder::new(encoder);

    let mut files = 0;
    let mut missing = Vec::new();
    for include in manifest.include_paths() {
        if !include.exists() {
            warn!("Include path not found: {:?}", include);
            missing.push(include);
            continue;
        }
        let added = append_include(&mut archive, &include, &excludes)?;
        debug!("Added {} files from {:?}", added, include);
        files += added;
    }

    archive.into_inner()?.finish()?;
    let sha256 = hash::sha256_file(out)?;
    info!("Archive written to {:?} ({} files)", out, files);

    Ok(ArchiveSummary {
        path: out.to_path_buf(),
        files,
        missing,
        sha256,
    })
}
