//! JSON row input
//!
//! The flattened sheet export is a JSON array of flat objects. Shape is checked
//! here once, so the rest of the pipeline works on typed [`Row`]s.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::core::models::{AppResult, EnrichError, Row};

/// Load rows from a JSON file. A missing file yields no rows.
pub fn load_rows_json(path: &Path) -> AppResult<Vec<Row>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Input {} not found, treating as empty", path.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let value: Value = serde_json::from_str(&content).map_err(|e| {
        EnrichError::InvalidInput(format!("{} is not valid JSON: {}", path.display(), e))
    })?;

    let rows = rows_from_value(value)?;
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Validate a parsed document as a list of rows.
pub fn rows_from_value(value: Value) -> AppResult<Vec<Row>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Row::from_value(index, item))
            .collect(),
        _ => Err(EnrichError::InvalidInput(
            "input must be a JSON array of row objects".to_string(),
        )),
    }
}
