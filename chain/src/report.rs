//! Output of merged documents.
//!
//! Only the document is written; the provenance index stays internal (see
//! [`ProvenanceManifest`](crate::ProvenanceManifest) for that). Each group is
//! written as one complete unit: a pretty-printed JSON value followed by a
//! newline, or a YAML document opened with `---`.

use std::io::Write;

use serde::{Deserialize, Serialize};
use spec_history_core::{Document, Snapshot};

use crate::chain::MigrationRun;
use crate::error::Result;

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Formats a document in the requested output format.
pub fn format_document(document: &Document, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(document)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Yaml => {
            let body = serde_yaml::to_string(document)?;
            Ok(format!("---\n{body}"))
        }
    }
}

/// Writes one group's merged document to `out`.
///
/// # Errors
///
/// Returns [`JsonError`](crate::HistoryError::JsonError) or
/// [`YamlError`](crate::HistoryError::YamlError) if serialization fails, or
/// [`IoError`](crate::HistoryError::IoError) if writing fails.
pub fn emit<W: Write>(
    out: &mut W,
    group: &str,
    snapshot: &Snapshot,
    format: OutputFormat,
) -> Result<()> {
    let raw = format_document(snapshot.document(), format)?;
    out.write_all(raw.as_bytes())?;
    tracing::debug!(group, version = %snapshot.version(), bytes = raw.len(), "emitted group");
    Ok(())
}

/// Writes every merged group of `run` to `out`, in group-name order.
pub fn emit_all<W: Write>(out: &mut W, run: &MigrationRun, format: OutputFormat) -> Result<()> {
    for (group, snapshot) in &run.snapshots {
        emit(out, group, snapshot, format)?;
    }
    out.flush()?;
    Ok(())
}
