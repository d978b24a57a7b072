//! Discovery export parsing.

use autoblueprint_common::{Error, Result};
use autoblueprint_workload_schema::{DiscoveryDump, Row};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Decode back-to-back top-level JSON values.
///
/// At each position whitespace is skipped and exactly one value is decoded.
/// A malformed value fails with the byte offset where it starts.
pub fn decode_blocks(text: &str) -> Result<Vec<Value>> {
    let mut blocks = Vec::new();
    let mut offset = 0;

    while offset < text.len() {
        let rest = &text[offset..];
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            break;
        }

        let mut stream = serde_json::Deserializer::from_str(trimmed).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                offset += stream.byte_offset();
                blocks.push(value);
            }
            Some(Err(e)) => {
                return Err(Error::Parse {
                    offset,
                    message: e.to_string(),
                })
            }
            None => break,
        }
    }

    Ok(blocks)
}

/// Parse an OSQuery export into its tables.
pub fn parse_dump(text: &str) -> Result<DiscoveryDump> {
    let blocks = decode_blocks(text)?;
    debug!("Decoded {} discovery blocks", blocks.len());
    Ok(DiscoveryDump::from_blocks(blocks))
}

/// What a discovery input file turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryInput {
    /// A multi-table OSQuery export.
    Dump(DiscoveryDump),
    /// A single plain array of program rows; no host specs available.
    ProgramList(Vec<Row>),
}

impl DiscoveryInput {
    /// The raw program rows to classify.
    pub fn programs(&self) -> &[Row] {
        match self {
            DiscoveryInput::Dump(dump) => dump.programs(),
            DiscoveryInput::ProgramList(programs) => programs,
        }
    }

    pub fn dump(&self) -> Option<&DiscoveryDump> {
        match self {
            DiscoveryInput::Dump(dump) => Some(dump),
            DiscoveryInput::ProgramList(_) => None,
        }
    }
}

/// Read a discovery file, accepting either a multi-table export or a plain
/// program list.
///
/// A file holding exactly one block is read as a program list. A file that
/// fails to decode as an export is retried as a single JSON array before the
/// parse error is returned.
pub fn load_discovery(path: &Path) -> Result<DiscoveryInput> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;

    match parse_dump(&text) {
        Ok(dump) if dump.block_count() == 1 => {
            let programs = rows_of(&dump.raw_blocks()[0]);
            info!("Loaded {} programs from plain JSON list", programs.len());
            Ok(DiscoveryInput::ProgramList(programs))
        }
        Ok(dump) => {
            info!(
                "Parsed OSQuery dump with {} programs discovered",
                dump.programs().len()
            );
            Ok(DiscoveryInput::Dump(dump))
        }
        Err(parse_error) => {
            warn!("Could not parse as OSQuery dump ({parse_error}); trying plain JSON list");
            match serde_json::from_str::<Vec<Value>>(&text) {
                Ok(items) => {
                    let programs = rows_of(&Value::Array(items));
                    info!("Loaded {} programs from plain JSON list", programs.len());
                    Ok(DiscoveryInput::ProgramList(programs))
                }
                Err(_) => Err(parse_error),
            }
        }
    }
}

fn rows_of(block: &Value) -> Vec<Row> {
    block
        .as_array()
        .map(|items| items.iter().filter_map(|i| i.as_object().cloned()).collect())
        .unwrap_or_default()
}
