//! Enriched output file
//!
//! The output is either a bare array of rows or the wrapped form
//! `{ "videos": [...], "metadata": { "last_updated": "..." } }`.
//! `last_updated` only moves when the rows actually change, so re-running on
//! unchanged input produces a byte-identical file.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::models::{AppResult, OutputFormat, Row};
use crate::utils::file_utils::write_json_atomic;

/// Timestamp format of `metadata.last_updated`
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// What a previous run left on disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviousOutput {
    pub rows: Vec<Value>,
    pub last_updated: Option<String>,
}

/// Result of [`write_output`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    pub rows: usize,
    pub last_updated: String,
    /// Whether the rows differ from the previous output
    pub changed: bool,
}

/// Read the previous output, in either form. Missing or unreadable files give
/// `None`; the next write simply starts fresh.
pub fn read_previous_output(path: &Path) -> Option<PreviousOutput> {
    let content = fs::read_to_string(path).ok()?;

    let value: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            warn!("Ignoring unreadable previous output {}: {}", path.display(), err);
            return None;
        }
    };

    match value {
        Value::Array(rows) => Some(PreviousOutput {
            rows,
            last_updated: None,
        }),
        Value::Object(mut object) => {
            let rows = match object.remove("videos") {
                Some(Value::Array(rows)) => rows,
                _ => {
                    warn!("Previous output {} has no 'videos' array", path.display());
                    return None;
                }
            };
            let last_updated = object
                .get("metadata")
                .and_then(|metadata| metadata.get("last_updated"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(PreviousOutput { rows, last_updated })
        }
        _ => {
            warn!("Ignoring previous output {}: unexpected shape", path.display());
            None
        }
    }
}

/// Decide `last_updated` for `rows`: keep the previous value when the rows are
/// unchanged, otherwise stamp `now`. Returns the value and whether rows changed.
pub fn resolve_last_updated(
    rows: &[Value],
    previous: Option<&PreviousOutput>,
    now: DateTime<Utc>,
) -> (String, bool) {
    match previous {
        Some(prev) if prev.rows.as_slice() == rows => match &prev.last_updated {
            Some(stamp) => (stamp.clone(), false),
            None => (now.format(LAST_UPDATED_FORMAT).to_string(), false),
        },
        _ => (now.format(LAST_UPDATED_FORMAT).to_string(), true),
    }
}

/// Write `rows` to `path` in `format`, replacing the file atomically.
pub fn write_output(
    path: &Path,
    rows: &[Row],
    format: OutputFormat,
    now: DateTime<Utc>,
) -> AppResult<OutputSummary> {
    let values: Vec<Value> = rows.iter().map(Row::to_value).collect();
    let previous = read_previous_output(path);
    let (last_updated, changed) = resolve_last_updated(&values, previous.as_ref(), now);

    match format {
        OutputFormat::Rows => write_json_atomic(path, &values)?,
        OutputFormat::Wrapped => {
            let document = json!({
                "videos": values,
                "metadata": { "last_updated": last_updated },
            });
            write_json_atomic(path, &document)?;
        }
    }

    debug!(
        "Wrote {} rows to {} (changed: {})",
        rows.len(),
        path.display(),
        changed
    );

    Ok(OutputSummary {
        rows: rows.len(),
        last_updated,
        changed,
    })
}
