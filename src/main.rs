//! video-enrich - command-line entry point
//!
//! Resolves configuration (defaults, optional config file, environment and
//! flags) and dispatches to the command handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use video_enricher::commands::{run_audit, run_canonicalize, run_enrich};
use video_enricher::{ConfigOverrides, EnrichConfig, OutputFormat};

/// Command-line arguments for video-enrich
#[derive(Parser, Debug)]
#[command(name = "video-enrich")]
#[command(about = "Add video titles and thumbnails to exported sheet rows")]
#[command(version)]
struct Cli {
    /// JSON config file; values in it replace the defaults
    #[arg(short, long, env = "ENRICH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input, output and cache files
    #[arg(long, env = "OUT_DIR", global = true)]
    out_dir: Option<PathBuf>,

    /// Input rows (.json or .csv), relative to the out dir
    #[arg(long, env = "IN_JSON", global = true)]
    input: Option<String>,

    /// Enriched output file, relative to the out dir
    #[arg(long, env = "OUT_JSON", global = true)]
    output: Option<String>,

    /// Metadata cache file, relative to the out dir
    #[arg(long, env = "CACHE_JSON", global = true)]
    cache: Option<String>,

    /// Comma-separated link columns
    #[arg(long, env = "VIDEO_LINK_FIELDS", value_delimiter = ',', global = true)]
    link_fields: Option<Vec<String>>,

    /// Output shape: `rows` or `wrapped`
    #[arg(long, env = "OUTPUT_FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Seconds to wait between fetches
    #[arg(long, env = "SLEEP_SECS", global = true)]
    sleep_secs: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long, env = "TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    #[arg(long, env = "USER_AGENT", global = true)]
    user_agent: Option<String>,

    /// Age in months after which VOD links are skipped
    #[arg(long, env = "CUTOFF_MONTHS", global = true)]
    cutoff_months: Option<u32>,

    /// Media type tag eligible for skipping
    #[arg(long, env = "SKIP_MEDIA_TYPE", global = true)]
    skip_media_type: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich the input rows and update the cache
    Enrich,
    /// List cached URLs missing a title or thumbnail
    Audit,
    /// Print the canonical form of each URL
    Canonicalize {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            out_dir: self.out_dir.clone(),
            input_file: self.input.clone(),
            output_file: self.output.clone(),
            cache_file: self.cache.clone(),
            link_fields: self.link_fields.clone(),
            output_format: self.format,
            sleep_secs: self.sleep_secs,
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone(),
            cutoff_months: self.cutoff_months,
            stale_media_type: self.skip_media_type.clone(),
        }
    }

    fn resolve_config(&self) -> Result<EnrichConfig> {
        let mut config = EnrichConfig::load_or_default(self.config.as_deref())?;
        config.apply_overrides(&self.overrides());
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    video_enricher::init()?;

    let cli = Cli::parse();

    match &cli.command {
        Command::Canonicalize { urls } => run_canonicalize(urls),
        Command::Enrich => {
            let config = cli.resolve_config()?;
            info!("🚀 Enriching {:?}", config.input_path());
            run_enrich(&config).await?;
        }
        Command::Audit => {
            let config = cli.resolve_config()?;
            run_audit(&config)?;
        }
    }

    Ok(())
}
