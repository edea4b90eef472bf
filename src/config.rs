use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub formatting: FormattingConfig,
    #[serde(default)]
    pub tracker: Option<TrackerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Falls back to the `TOKEN` environment variable when empty
    #[serde(default)]
    pub bot_token: String,
    /// Public base URL for webhook delivery. Long polling is used when absent.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub api_url: String,
    #[serde(default = "default_detail_base_url")]
    pub detail_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormattingConfig {
    /// Rewrite poster URLs from https to http before handing them to Telegram
    #[serde(default = "default_enforce_plain_http")]
    pub enforce_plain_http_for_images: bool,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            enforce_plain_http_for_images: default_enforce_plain_http(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    pub url: String,
    #[serde(default = "default_tracker_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_listen_port() -> u16 {
    5000
}

fn default_detail_base_url() -> String {
    "https://www.filmaffinity.com/es/film".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_enforce_plain_http() -> bool {
    true
}

fn default_tracker_timeout_ms() -> u64 {
    2000
}

impl CatalogConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TrackerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.telegram.bot_token.is_empty() {
            config.telegram.bot_token = std::env::var("TOKEN")
                .context("No bot_token in [telegram] and TOKEN is not set")?;
        }

        // Hosting platforms hand out the listen port through PORT
        if let Ok(port) = std::env::var("PORT") {
            config.telegram.listen_port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        if config.catalog.api_url.trim().is_empty() {
            anyhow::bail!("[catalog] api_url must not be empty");
        }
        if config.catalog.request_timeout_secs == 0 {
            anyhow::bail!("[catalog] request_timeout_secs must be greater than zero");
        }
        if let Some(tracker) = &config.tracker {
            if tracker.timeout_ms == 0 {
                anyhow::bail!("[tracker] timeout_ms must be greater than zero");
            }
        }

        Ok(config)
    }

    /// Whether updates arrive through a webhook rather than long polling
    pub fn uses_webhook(&self) -> bool {
        self.telegram
            .webhook_url
            .as_deref()
            .is_some_and(|url| !url.is_empty())
    }
}
