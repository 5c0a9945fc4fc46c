//! Initialization helpers for the application startup.

use crate::config::{Config, IngestConfig, LoggingConfig};
use crate::engine::CdnFilter;
use crate::pipeline::AssetIngestPipeline;
use crate::store::{create_store, Store};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

/// Sets up the tracing subscriber. `RUST_LOG` overrides the configured level.
/// Output goes to stderr, stdout is reserved for command results.
pub fn setup_logging(config: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if config.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Opens the configured store and builds the ingest pipeline on top of it.
pub fn init_store(config: &Config) -> Result<(Arc<dyn Store>, AssetIngestPipeline)> {
    let store = create_store(&config.store)?;
    info!("Using {} store", config.store.backend);
    let pipeline = AssetIngestPipeline::new(store.clone())
        .with_embedded_domain_blacklist(config.ingest.blacklist_embedded_domains);
    Ok((store, pipeline))
}

/// Reads the CDN range list named by `ingest.cdn_filter_path`.
pub async fn load_cdn_filter(config: &IngestConfig) -> Result<CdnFilter> {
    let path = config
        .cdn_filter_path
        .as_deref()
        .context("ingest.cdn_filter_path is not set, cannot filter CDN IPs")?;
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read CDN filter list {}", path))?;
    let filter = CdnFilter::from_lines(&contents);
    info!("Loaded {} CDN ranges from {}", filter.range_count(), path);
    Ok(filter)
}
