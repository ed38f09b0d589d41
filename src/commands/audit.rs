//! `audit` command: report cached URLs that still lack a title or thumbnail

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use crate::core::audit::{audit_cache, AuditReport};
use crate::core::cache::MetadataCache;
use crate::core::config::EnrichConfig;
use crate::core::staleness::StalenessRule;
use crate::parsers::load_rows;

/// Build the audit report for the files named by `config`.
pub fn audit_files(config: &EnrichConfig, today: NaiveDate) -> Result<AuditReport> {
    let input_path = config.input_path();
    let cache_path = config.cache_path();

    let rows = load_rows(&input_path)
        .with_context(|| format!("Failed to load rows from {:?}", input_path))?;
    let cache = MetadataCache::load(&cache_path)
        .with_context(|| format!("Failed to load cache from {:?}", cache_path))?;

    Ok(audit_cache(
        &rows,
        &cache,
        &config.link_fields,
        &StalenessRule::new(config.staleness.clone()),
        today,
    ))
}

/// Printable report, one flagged URL per line after the totals.
pub fn format_report(config: &EnrichConfig, report: &AuditReport) -> String {
    let mut lines = vec![
        format!(
            "Checked {} cached URLs in {}",
            report.checked,
            config.cache_path().display()
        ),
        format!(
            "Skipped {} URLs by old {} rule ({} months)",
            report.skipped, config.staleness.stale_media_type, config.staleness.cutoff_months
        ),
        format!(
            "Found {} URLs missing title and/or thumbnail",
            report.flagged.len()
        ),
    ];
    lines.extend(report.flagged.iter().map(ToString::to_string));
    lines.join("\n")
}

pub fn run_audit(config: &EnrichConfig) -> Result<AuditReport> {
    let report = audit_files(config, Local::now().date_naive())?;
    println!("{}", format_report(config, &report));
    Ok(report)
}
