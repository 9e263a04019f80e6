/// Configuration management for the Snapgram client
///
/// Loads configuration from environment variables (and a `.env` file when
/// present).
use anyhow::{Context, Result};
use feed_pagination::{PagerConfig, DEFAULT_PAGE_SIZE};
use remote_ops::PlatformConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application settings
    pub app: AppConfig,
    /// Hosted platform endpoints and collection ids
    pub platform: PlatformConfig,
    /// Infinite feed settings
    pub feed: FeedConfig,
    /// Session flag persistence
    pub session: SessionConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
    /// Register query cache metrics with the context registry
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl FeedConfig {
    pub fn pager_config(&self) -> PagerConfig {
        PagerConfig {
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File holding the session flag; kept in memory when unset
    pub flag_path: Option<PathBuf>,
}

// Default values
fn default_metrics_enabled() -> bool {
    true
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_metrics_enabled),
        };

        let platform =
            PlatformConfig::from_env().context("Failed to load platform configuration")?;

        let page_size = match std::env::var("FEED_PAGE_SIZE") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("FEED_PAGE_SIZE is not a number: {}", raw))?,
            Err(_) => default_page_size(),
        };
        anyhow::ensure!(page_size > 0, "FEED_PAGE_SIZE must be positive");

        let session = SessionConfig {
            flag_path: std::env::var("SESSION_FLAG_PATH").ok().map(PathBuf::from),
        };

        Ok(ClientConfig {
            app,
            platform,
            feed: FeedConfig { page_size },
            session,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}
