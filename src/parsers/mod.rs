//! File parsing modules
//!
//! Row input (JSON and CSV exports) and markup field extraction.

pub mod csv_parser;
pub mod json_rows;
pub mod meta_tags;

// Re-export commonly used parsers
pub use csv_parser::*;
pub use json_rows::*;
pub use meta_tags::*;

use std::path::Path;

use crate::core::models::{AppResult, Row};
use crate::utils::file_utils::get_file_extension;

/// Load rows, picking the parser from the file extension (`.csv`, otherwise JSON).
/// A missing file yields no rows for either format.
pub fn load_rows(path: &Path) -> AppResult<Vec<Row>> {
    match get_file_extension(path).as_deref() {
        Some("csv") if path.exists() => load_rows_csv(path),
        Some("csv") => Ok(Vec::new()),
        _ => load_rows_json(path),
    }
}
