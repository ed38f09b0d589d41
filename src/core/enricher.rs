//! Enrichment orchestrator
//!
//! Walks the rows, canonicalizes every link field, decides per URL whether it
//! is stale, a cache hit or needs a fetch, fetches the misses one at a time
//! and writes `<base> title` / `<base> thumbnail` columns next to each link.
//!
//! Per URL and run the states are:
//! `unseen -> dropped` (empty or unusable link), `unseen -> stale-skipped`,
//! `unseen -> cache-hit`, or `unseen -> fetched-ok | fetched-error`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::cache::MetadataCache;
use crate::core::canonicalizer::canonicalize;
use crate::core::config::EnrichConfig;
use crate::core::fetcher::MetadataFetcher;
use crate::core::models::{MetadataRecord, Row};
use crate::core::staleness::StalenessRule;
use crate::utils::validation::is_fetchable_url;

/// Counters for one enrichment run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    /// Distinct usable canonical URLs across all rows
    pub distinct_urls: usize,
    /// Link cells that were not empty but could not be used as a URL
    pub invalid_links: usize,
    /// URLs skipped because every referencing row is stale
    pub stale_skipped: usize,
    /// URLs already present in the cache
    pub cache_hits: usize,
    /// Fetches that returned metadata
    pub fetched_ok: usize,
    /// Fetches that failed and were recorded as errors
    pub fetched_errors: usize,
}

impl EnrichStats {
    pub fn fetch_attempts(&self) -> usize {
        self.fetched_ok + self.fetched_errors
    }
}

/// Result of [`Enricher::enrich`]
#[derive(Debug, Clone)]
pub struct EnrichOutcome {
    pub rows: Vec<Row>,
    pub stats: EnrichStats,
}

/// Canonical links of a row set, and which rows reference each URL.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    /// `links[row][field]`: canonical URL, or "" when empty/unusable
    links: Vec<Vec<String>>,
    /// Distinct URLs in first-seen order
    order: Vec<String>,
    referencing: HashMap<String, Vec<usize>>,
    invalid_links: usize,
}

impl LinkIndex {
    pub fn build(rows: &[Row], link_fields: &[String]) -> Self {
        let mut index = Self::default();

        for (row_index, row) in rows.iter().enumerate() {
            let mut row_links = Vec::with_capacity(link_fields.len());

            for field in link_fields {
                let url = canonicalize(&row.text(field));
                if url.is_empty() {
                    row_links.push(String::new());
                    continue;
                }
                if !is_fetchable_url(&url) {
                    warn!("Row {}: ignoring unusable link in '{}': {}", row_index, field, url);
                    index.invalid_links += 1;
                    row_links.push(String::new());
                    continue;
                }

                let rows_for_url = index.referencing.entry(url.clone()).or_insert_with(|| {
                    index.order.push(url.clone());
                    Vec::new()
                });
                if rows_for_url.last() != Some(&row_index) {
                    rows_for_url.push(row_index);
                }
                row_links.push(url);
            }

            index.links.push(row_links);
        }

        index
    }

    /// Canonical link of `field_index` in `row_index` ("" when absent).
    pub fn link(&self, row_index: usize, field_index: usize) -> &str {
        self.links
            .get(row_index)
            .and_then(|links| links.get(field_index))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Distinct URLs, in the order they first appear.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Indices of the rows referencing `url`.
    pub fn rows_for(&self, url: &str) -> &[usize] {
        self.referencing.get(url).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Link cells holding `url`; a row linking it twice counts twice.
    pub fn occurrences(&self, url: &str) -> usize {
        self.rows_for(url)
            .iter()
            .filter_map(|&row_index| self.links.get(row_index))
            .map(|links| links.iter().filter(|link| *link == url).count())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn invalid_links(&self) -> usize {
        self.invalid_links
    }
}

/// `"timestamp 1 link"` -> `"timestamp 1"`. A trailing `link` (any case,
/// with or without a separating space) is removed.
pub fn base_name_from_link_field(field: &str) -> String {
    let trimmed = field.trim();
    let split = trimmed.len().saturating_sub(4);

    match (trimmed.get(..split), trimmed.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case("link") => {
            let head = head.trim_end();
            if head.is_empty() {
                trimmed.to_string()
            } else {
                head.to_string()
            }
        }
        _ => trimmed.to_string(),
    }
}

/// Runs the enrichment pipeline over one row set
pub struct Enricher<F> {
    fetcher: F,
    link_fields: Vec<String>,
    staleness: StalenessRule,
    fetch_delay: Duration,
}

impl<F: MetadataFetcher> Enricher<F> {
    pub fn new(fetcher: F, link_fields: Vec<String>, staleness: StalenessRule) -> Self {
        Self {
            fetcher,
            link_fields,
            staleness,
            fetch_delay: Duration::ZERO,
        }
    }

    pub fn from_config(fetcher: F, config: &EnrichConfig) -> Self {
        Self::new(
            fetcher,
            config.link_fields.clone(),
            StalenessRule::new(config.staleness.clone()),
        )
        .with_fetch_delay(config.fetch.delay())
    }

    /// Pause between consecutive fetches.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Enrich `rows`, fetching cache misses into `cache`.
    ///
    /// Each distinct URL is fetched at most once. URLs already cached are never
    /// refetched, URLs whose every referencing row is stale are neither fetched
    /// nor cached. A failed fetch is stored as an error record and the run goes on.
    pub async fn enrich(
        &self,
        rows: &[Row],
        cache: &mut MetadataCache,
        today: NaiveDate,
    ) -> EnrichOutcome {
        let index = LinkIndex::build(rows, &self.link_fields);
        let mut stats = EnrichStats {
            distinct_urls: index.len(),
            invalid_links: index.invalid_links(),
            ..EnrichStats::default()
        };

        let mut wanted = Vec::new();

        for url in index.urls() {
            let referencing = index.rows_for(url).iter().map(|&i| &rows[i]);
            if self.staleness.is_url_stale(referencing, url, today) {
                debug!("Skipping stale URL {}", url);
                stats.stale_skipped += 1;
            } else if cache.contains(url) {
                stats.cache_hits += 1;
            } else {
                wanted.push(url);
            }
        }

        info!(
            "Found {} unique URLs, {} new to fetch ({} stale skipped, {} cached)",
            stats.distinct_urls,
            wanted.len(),
            stats.stale_skipped,
            stats.cache_hits
        );

        for (position, url) in wanted.iter().enumerate() {
            if position > 0 && !self.fetch_delay.is_zero() {
                sleep(self.fetch_delay).await;
            }

            info!("[{}/{}] Fetching: {}", position + 1, wanted.len(), url);
            let fetched_at = Utc::now();

            let record = match self.fetcher.fetch(url).await {
                Ok(metadata) => {
                    stats.fetched_ok += 1;
                    MetadataRecord::fetched(metadata, fetched_at)
                }
                Err(err) => {
                    warn!("Fetch failed for {}: {}", url, err);
                    stats.fetched_errors += 1;
                    MetadataRecord::failed(err.to_string(), fetched_at)
                }
            };
            cache.put(url, record);
        }

        let enriched = rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| self.enrich_row(row_index, row, &index, cache, today))
            .collect();

        EnrichOutcome {
            rows: enriched,
            stats,
        }
    }

    fn enrich_row(
        &self,
        row_index: usize,
        row: &Row,
        index: &LinkIndex,
        cache: &MetadataCache,
        today: NaiveDate,
    ) -> Row {
        let mut out = row.clone();

        for (field_index, field) in self.link_fields.iter().enumerate() {
            let base = base_name_from_link_field(field);
            let url = index.link(row_index, field_index);

            let record = if url.is_empty() || self.staleness.is_stale(row, url, today) {
                None
            } else {
                cache.get(url)
            };

            out.set_text(
                format!("{} title", base),
                record.map(MetadataRecord::title_or_empty).unwrap_or(""),
            );
            out.set_text(
                format!("{} thumbnail", base),
                record.map(MetadataRecord::thumbnail_or_empty).unwrap_or(""),
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_from_link_field() {
        assert_eq!(base_name_from_link_field("timestamp 1 link"), "timestamp 1");
        assert_eq!(base_name_from_link_field("ts 2 Link "), "ts 2");
        assert_eq!(base_name_from_link_field("videolink"), "video");
        assert_eq!(base_name_from_link_field("url"), "url");
        assert_eq!(base_name_from_link_field("link"), "link");
        assert_eq!(base_name_from_link_field("clip ⏳"), "clip ⏳");
    }

    #[test]
    fn test_link_index_groups_rows() {
        let fields = vec!["a link".to_string(), "b link".to_string()];
        let rows = vec![
            Row::from_pairs([("a link", "https://youtu.be/abc123"), ("b link", "")]),
            Row::from_pairs([
                ("a link", "https://www.youtube.com/watch?v=abc123&si=x"),
                ("b link", "https://www.twitch.tv/videos/9/"),
            ]),
            Row::from_pairs([("a link", "garbage text"), ("b link", "https://youtu.be/abc123")]),
        ];

        let index = LinkIndex::build(&rows, &fields);

        let urls: Vec<&str> = index.urls().collect();
        assert_eq!(
            urls,
            vec![
                "https://www.youtube.com/watch?v=abc123",
                "https://www.twitch.tv/videos/9"
            ]
        );
        assert_eq!(index.rows_for("https://www.youtube.com/watch?v=abc123"), &[0, 1, 2]);
        assert_eq!(index.rows_for("https://www.twitch.tv/videos/9"), &[1]);
        assert_eq!(index.link(0, 1), "");
        assert_eq!(index.link(2, 0), "");
        assert_eq!(index.invalid_links(), 1);
        assert!(index.rows_for("https://nowhere.example/").is_empty());
    }

    #[test]
    fn test_same_row_listed_once_per_url() {
        let fields = vec!["a link".to_string(), "b link".to_string()];
        let rows = vec![Row::from_pairs([
            ("a link", "https://youtu.be/abc123"),
            ("b link", "https://youtu.be/abc123"),
        ])];

        let index = LinkIndex::build(&rows, &fields);
        assert_eq!(index.rows_for("https://www.youtube.com/watch?v=abc123"), &[0]);
        assert_eq!(index.occurrences("https://www.youtube.com/watch?v=abc123"), 2);
        assert_eq!(index.occurrences("https://nowhere.example/"), 0);
    }
}
