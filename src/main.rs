mod catalog;
mod commands;
mod config;
mod formatter;
mod platform;
mod router;
mod tracker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::http::HttpCatalog;
use crate::catalog::CatalogProvider;
use crate::config::Config;
use crate::router::Router;
use crate::tracker::{HttpTracker, NoopTracker, UsageTracker};

/// Upper bound for a tracker call when no `[tracker]` section is configured
const NOOP_TRACKER_TIMEOUT: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,filmbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Catalog: {}", config.catalog.api_url);
    info!("  Detail pages: {}", config.catalog.detail_base_url);
    info!(
        "  Plain-http posters: {}",
        config.formatting.enforce_plain_http_for_images
    );
    info!("  Webhook: {}", config.uses_webhook());

    // One catalog client for the whole process
    let provider: Arc<dyn CatalogProvider> = Arc::new(HttpCatalog::new(&config.catalog));

    let (tracker, tracker_timeout): (Arc<dyn UsageTracker>, Duration) = match &config.tracker {
        Some(tracker_config) => {
            info!("  Usage tracker: {}", tracker_config.url);
            (
                Arc::new(HttpTracker::new(tracker_config)),
                tracker_config.timeout(),
            )
        }
        None => {
            info!("  Usage tracker: disabled");
            (Arc::new(NoopTracker), NOOP_TRACKER_TIMEOUT)
        }
    };

    let router = Arc::new(Router::new(
        provider,
        tracker,
        config.formatting.enforce_plain_http_for_images,
        config.catalog.request_timeout(),
        tracker_timeout,
    ));

    info!("Bot is starting...");
    platform::telegram::run(router, &config.telegram).await?;

    Ok(())
}
