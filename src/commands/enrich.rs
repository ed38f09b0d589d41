//! `enrich` command: load rows, fill in metadata, save cache and output

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::core::cache::MetadataCache;
use crate::core::config::EnrichConfig;
use crate::core::enricher::{EnrichStats, Enricher};
use crate::core::fetcher::{HttpMetadataFetcher, MetadataFetcher};
use crate::core::output::{write_output, OutputSummary};
use crate::parsers::load_rows;
use crate::utils::file_utils::ensure_dir_exists;

/// What one `enrich` run did
#[derive(Debug, Clone, Serialize)]
pub struct EnrichSummary {
    pub input_rows: usize,
    pub cache_entries: usize,
    pub stats: EnrichStats,
    pub output: OutputSummary,
}

/// Run the whole pipeline against the files named by `config`.
///
/// The cache is written before the output so that an interrupted run never
/// loses fetched metadata.
pub async fn enrich_files<F: MetadataFetcher>(
    config: &EnrichConfig,
    fetcher: F,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<EnrichSummary> {
    let input_path = config.input_path();
    let cache_path = config.cache_path();
    let output_path = config.output_path();

    let rows = load_rows(&input_path)
        .with_context(|| format!("Failed to load rows from {:?}", input_path))?;
    let mut cache = MetadataCache::load(&cache_path)
        .with_context(|| format!("Failed to load cache from {:?}", cache_path))?;

    info!(
        "Loaded {} rows and {} cached URLs",
        rows.len(),
        cache.len()
    );

    let enricher = Enricher::from_config(fetcher, config);
    let outcome = enricher.enrich(&rows, &mut cache, today).await;

    for path in [&cache_path, &output_path] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    cache
        .save(&cache_path)
        .with_context(|| format!("Failed to write cache {:?}", cache_path))?;
    let output = write_output(&output_path, &outcome.rows, config.output_format, now)
        .with_context(|| format!("Failed to write output {:?}", output_path))?;

    Ok(EnrichSummary {
        input_rows: rows.len(),
        cache_entries: cache.len(),
        stats: outcome.stats,
        output,
    })
}

/// `enrich` with the HTTP fetcher and the local calendar date
pub async fn run_enrich(config: &EnrichConfig) -> Result<EnrichSummary> {
    let fetcher = HttpMetadataFetcher::new(config.fetch.clone())
        .context("Failed to create HTTP client")?;

    let summary = enrich_files(config, fetcher, Local::now().date_naive(), Utc::now()).await?;
    let stats = &summary.stats;

    info!(
        "✅ Enriched {} rows: {} URLs, {} cached, {} fetched ({} failed), {} stale skipped, {} invalid links",
        summary.input_rows,
        stats.distinct_urls,
        stats.cache_hits,
        stats.fetch_attempts(),
        stats.fetched_errors,
        stats.stale_skipped,
        stats.invalid_links
    );
    info!(
        "Wrote {:?} (last_updated {}{}) and {:?} ({} entries)",
        config.output_path(),
        summary.output.last_updated,
        if summary.output.changed { "" } else { ", unchanged" },
        config.cache_path(),
        summary.cache_entries
    );

    Ok(summary)
}
