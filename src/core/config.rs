//! Enrichment configuration
//!
//! Built in three layers: compiled defaults, then an optional JSON config
//! file, then [`ConfigOverrides`] collected from the environment and the
//! command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::fetcher::FetchConfig;
use super::models::OutputFormat;
use super::staleness::StalenessConfig;
use crate::utils::file_utils::resolve_path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Directory the relative file names below are resolved against
    pub out_dir: PathBuf,
    pub input_file: String,
    pub output_file: String,
    pub cache_file: String,
    /// Row columns holding video links, in order
    pub link_fields: Vec<String>,
    pub output_format: OutputFormat,
    pub fetch: FetchConfig,
    pub staleness: StalenessConfig,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("/out"),
            input_file: "out.json".to_string(),
            output_file: "out.enriched.json".to_string(),
            cache_file: "video_info.json".to_string(),
            link_fields: vec!["timestamp 1 link".to_string(), "ts 2 link".to_string()],
            output_format: OutputFormat::default(),
            fetch: FetchConfig::default(),
            staleness: StalenessConfig::default(),
        }
    }
}

/// Values that replace whatever the defaults and config file said
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub out_dir: Option<PathBuf>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub cache_file: Option<String>,
    pub link_fields: Option<Vec<String>>,
    pub output_format: Option<OutputFormat>,
    /// Pause between fetches, in (possibly fractional) seconds
    pub sleep_secs: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub cutoff_months: Option<u32>,
    pub stale_media_type: Option<String>,
}

impl EnrichConfig {
    /// Load configuration from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: EnrichConfig =
            serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

        tracing::info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Defaults, or the given file when there is one
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Saved configuration to: {:?}", path);
        Ok(())
    }

    pub fn input_path(&self) -> PathBuf {
        resolve_path(&self.out_dir, &self.input_file)
    }

    pub fn output_path(&self) -> PathBuf {
        resolve_path(&self.out_dir, &self.output_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        resolve_path(&self.out_dir, &self.cache_file)
    }

    /// Apply overrides, keeping current values where an override is unset
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref out_dir) = overrides.out_dir {
            self.out_dir = out_dir.clone();
        }
        if let Some(ref input_file) = overrides.input_file {
            self.input_file = input_file.clone();
        }
        if let Some(ref output_file) = overrides.output_file {
            self.output_file = output_file.clone();
        }
        if let Some(ref cache_file) = overrides.cache_file {
            self.cache_file = cache_file.clone();
        }
        if let Some(ref link_fields) = overrides.link_fields {
            let fields: Vec<String> = link_fields
                .iter()
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect();
            if !fields.is_empty() {
                self.link_fields = fields;
            }
        }
        if let Some(output_format) = overrides.output_format {
            self.output_format = output_format;
        }

        // Fetch config
        if let Some(sleep_secs) = overrides.sleep_secs {
            self.fetch.delay_ms = (sleep_secs.max(0.0) * 1000.0).round() as u64;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.fetch.timeout_secs = timeout_secs;
        }
        if let Some(ref user_agent) = overrides.user_agent {
            if !user_agent.trim().is_empty() {
                self.fetch.user_agent = user_agent.clone();
            }
        }

        // Staleness config
        if let Some(cutoff_months) = overrides.cutoff_months {
            self.staleness.cutoff_months = cutoff_months;
        }
        if let Some(ref stale_media_type) = overrides.stale_media_type {
            self.staleness.stale_media_type = stale_media_type.clone();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.link_fields.is_empty() {
            anyhow::bail!("At least one link field must be configured");
        }

        if self.link_fields.iter().any(|field| field.trim().is_empty()) {
            anyhow::bail!("Link field names must not be blank");
        }

        for (name, value) in [
            ("input", &self.input_file),
            ("output", &self.output_file),
            ("cache", &self.cache_file),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("The {} file name must not be empty", name);
            }
        }

        if self.input_path() == self.cache_path() || self.output_path() == self.cache_path() {
            anyhow::bail!("The cache file must differ from the input and output files");
        }

        if self.fetch.timeout_secs == 0 || self.fetch.timeout_secs > 300 {
            anyhow::bail!("Timeout should be between 1 and 300 seconds");
        }

        if self.fetch.user_agent.trim().is_empty() {
            anyhow::bail!("User agent must not be empty");
        }

        if self.staleness.cutoff_months > 120 {
            anyhow::bail!("Cutoff should not exceed 120 months");
        }

        if self.staleness.date_fields.is_empty() {
            anyhow::bail!("At least one date field must be configured");
        }

        Ok(())
    }
}
