//! Video Enricher - Core Library
//!
//! Adds video titles and thumbnails to spreadsheet-exported rows. Links are
//! canonicalized, looked up in a persistent metadata cache and fetched only
//! when missing; old VOD links are skipped.

pub mod commands;
pub mod core;
pub mod parsers;
pub mod utils;

// Re-export commonly used types
pub use core::{
    cache::MetadataCache,
    canonicalizer::canonicalize,
    config::{ConfigOverrides, EnrichConfig},
    enricher::{EnrichOutcome, EnrichStats, Enricher},
    fetcher::{HttpMetadataFetcher, MetadataFetcher},
    models::{
        AppResult, EnrichError, FetchError, FetchedMetadata, MetadataRecord, MetadataSource,
        OutputFormat, Row,
    },
    staleness::StalenessRule,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the library with default settings
pub fn init() -> anyhow::Result<()> {
    // 初始化日志系统（重复调用无副作用）
    utils::logging::init_tracing();

    tracing::debug!("📚 {} v{} initialized", NAME, VERSION);
    Ok(())
}
