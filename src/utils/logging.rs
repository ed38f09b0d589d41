/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "video_enricher=info";

/// Install the global tracing subscriber. Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
