//! Core business logic module
//!
//! URL canonicalization, the staleness rule, the metadata cache and fetcher,
//! and the orchestrator that ties them together over a row set.

pub mod audit;
pub mod cache;
pub mod canonicalizer;
pub mod config;
pub mod enricher;
pub mod fetcher;
pub mod models;
pub mod output;
pub mod staleness;


pub use audit::{audit_cache, AuditEntry, AuditReport};
pub use cache::MetadataCache;
pub use canonicalizer::canonicalize;
pub use config::{ConfigOverrides, EnrichConfig};
pub use enricher::{EnrichOutcome, EnrichStats, Enricher, LinkIndex};
pub use fetcher::{FetchConfig, HttpMetadataFetcher, MetadataFetcher};
pub use models::{
    AppResult, EnrichError, FetchError, FetchedMetadata, MetadataRecord, MetadataSource,
    OutputFormat, Row,
};
pub use output::{write_output, OutputSummary};
pub use staleness::{StalenessConfig, StalenessRule};
