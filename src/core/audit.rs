//! Cache audit: which cached URLs are still missing a title or a thumbnail.
//! Read-only; nothing here touches the network or the cache file.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::cache::MetadataCache;
use crate::core::enricher::LinkIndex;
use crate::core::models::{MetadataSource, Row};
use crate::core::staleness::StalenessRule;

/// Shown instead of media types when no row references the URL
pub const NO_ROW: &str = "NO_ROW";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub url: String,
    /// `"title"` and/or `"thumbnail"`
    pub missing: Vec<&'static str>,
    pub source: String,
    /// Link cells referencing the URL, counted per link field
    pub rows: usize,
    /// Distinct non-empty media types of those rows, sorted
    pub media_types: Vec<String>,
}

impl AuditEntry {
    pub fn media_types_label(&self) -> String {
        if self.media_types.is_empty() {
            NO_ROW.to_string()
        } else {
            self.media_types.join(", ")
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- [{}] {} | missing: {} | source: {} | rows: {}",
            self.media_types_label(),
            self.url,
            self.missing.join(", "),
            self.source,
            self.rows
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Cache entries looked at
    pub checked: usize,
    /// Entries skipped as unavailable or stale
    pub skipped: usize,
    pub flagged: Vec<AuditEntry>,
}

/// Walk the cache and flag entries with a blank title or thumbnail.
///
/// Entries recorded as unavailable videos are skipped, as are URLs whose
/// referencing rows are all stale.
pub fn audit_cache(
    rows: &[Row],
    cache: &MetadataCache,
    link_fields: &[String],
    staleness: &StalenessRule,
    today: NaiveDate,
) -> AuditReport {
    let index = LinkIndex::build(rows, link_fields);
    let media_type_field = &staleness.config().media_type_field;
    let mut report = AuditReport {
        checked: cache.len(),
        ..AuditReport::default()
    };

    for (url, record) in cache.iter() {
        if record.source == Some(MetadataSource::YoutubeUnavailable) {
            report.skipped += 1;
            continue;
        }

        let linked: Vec<&Row> = index.rows_for(url).iter().map(|&i| &rows[i]).collect();
        if staleness.is_url_stale(linked.iter().copied(), url, today) {
            report.skipped += 1;
            continue;
        }

        let mut missing = Vec::new();
        if record.title_or_empty().trim().is_empty() {
            missing.push("title");
        }
        if record.thumbnail_or_empty().trim().is_empty() {
            missing.push("thumbnail");
        }
        if missing.is_empty() {
            continue;
        }

        let media_types: BTreeSet<String> = linked
            .iter()
            .map(|row| row.text(media_type_field).trim().to_string())
            .filter(|media_type| !media_type.is_empty())
            .collect();

        report.flagged.push(AuditEntry {
            url: url.to_string(),
            missing,
            source: record.source.map(|s| s.to_string()).unwrap_or_default(),
            rows: index.occurrences(url),
            media_types: media_types.into_iter().collect(),
        });
    }

    report
}
