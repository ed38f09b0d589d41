//! Core data models for the video link enricher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One spreadsheet record: column name -> scalar value, in column order.
///
/// Rows only ever hold strings, numbers, booleans or null. Anything else is
/// rejected by [`Row::from_value`] at the load boundary.

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Validate a raw JSON value as a row. `index` is only used for the error message.
    pub fn from_value(index: usize, value: Value) -> AppResult<Self> {
        match value {
            Value::Object(fields) => {
                if let Some((column, _)) = fields
                    .iter()
                    .find(|(_, cell)| cell.is_array() || cell.is_object())
                {
                    return Err(EnrichError::InvalidInput(format!(
                        "row {}: column '{}' must hold a scalar value",
                        index, column
                    )));
                }
                Ok(Self(fields))
            }
            other => Err(EnrichError::InvalidInput(format!(
                "row {}: expected an object, found {}",
                index,
                json_kind(&other)
            ))),
        }
    }

    /// Build a row of text cells, keeping the given column order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Cell rendered as text; missing and null cells are empty.
    pub fn text(&self, column: &str) -> String {
        match self.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Insert or overwrite a text cell. New columns are appended.
    pub fn set_text(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), Value::String(value.into()));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn is_blank(&self) -> bool {
        self.0.values().all(|cell| match cell {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Where a cached metadata record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    /// Title from oEmbed (thumbnail checked as well)
    YoutubeOembed,
    /// Thumbnail only, oEmbed gave no title
    YoutubeThumb,
    /// Marked by hand as removed/private; written by maintenance, never by a fetch
    YoutubeUnavailable,
    /// Open Graph tags scraped from the page
    TwitchOg,
    /// Host not recognised, nothing fetched
    Unknown,
    /// The fetch failed; see `error`
    Error,
}

impl MetadataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YoutubeOembed => "youtube_oembed",
            Self::YoutubeThumb => "youtube_thumb",
            Self::YoutubeUnavailable => "youtube_unavailable",
            Self::TwitchOg => "twitch_og",
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the fetch capability hands back for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedMetadata {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub source: MetadataSource,
}

impl FetchedMetadata {
    pub fn empty(source: MetadataSource) -> Self {
        Self {
            title: None,
            thumbnail: None,
            source,
        }
    }
}

/// Timestamp format written into new records
pub const FETCHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Cached metadata for one canonical URL.
///
/// Fields are declared in alphabetical order so freshly written records keep
/// sorted keys. `fetched_at` is kept exactly as read, and fields this crate
/// does not know about are carried in `extra`, so an entry that is loaded and
/// saved again comes back unchanged. Entries marked by hand may lack
/// `fetched_at` altogether.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,

    #[serde(default)]
    pub source: Option<MetadataSource>,

    #[serde(default)]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataRecord {
    pub fn fetched(metadata: FetchedMetadata, fetched_at: DateTime<Utc>) -> Self {
        Self {
            error: None,
            fetched_at: Some(fetched_at.format(FETCHED_AT_FORMAT).to_string()),
            source: Some(metadata.source),
            thumbnail: metadata.thumbnail,
            title: metadata.title,
            extra: Map::new(),
        }
    }

    pub fn failed(message: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            error: Some(message.into()),
            fetched_at: Some(fetched_at.format(FETCHED_AT_FORMAT).to_string()),
            source: Some(MetadataSource::Error),
            thumbnail: None,
            title: None,
            extra: Map::new(),
        }
    }

    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn thumbnail_or_empty(&self) -> &str {
        self.thumbnail.as_deref().unwrap_or("")
    }

    pub fn is_error(&self) -> bool {
        self.source == Some(MetadataSource::Error)
    }
}

/// Shape of the enriched output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A bare JSON array of rows
    Rows,
    /// `{ "videos": [...], "metadata": { "last_updated": ... } }`
    #[default]
    Wrapped,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rows" | "list" => Ok(Self::Rows),
            "wrapped" => Ok(Self::Wrapped),
            other => Err(format!(
                "unknown output format '{}': expected 'rows' or 'wrapped'",
                other
            )),
        }
    }
}

/// Fatal errors: anything that stops a run
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid cache: {0}")]
    InvalidCache(String),
}

/// Result type alias for enrichment operations
pub type AppResult<T> = Result<T, EnrichError>;

/// Why a single metadata fetch failed. Never aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}
