//! Crawler configuration loaded from a YAML file.
//!
//! Every key is optional. A missing file, or an empty one, yields the defaults:
//!
//! ```yaml
//! database_url: sqlite://news_crawler.db
//! crawl:
//!   source_concurrency: 4
//!   article_concurrency: 8
//!   max_concurrent_fetches: 16
//!   request_timeout_secs: 30
//!   user_agent: news_crawler/0.1
//! default_selectors:
//!   title_selector: "article h1, article h2, article h3"
//!   author_selector: "article .author"
//!   content_selector: "article p"
//! ```

use crate::error::ConfigError;
use crate::models::SelectorConfig;
use crate::scrapers::extract::CompiledSelectors;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, instrument};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://news_crawler.db";

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub crawl: CrawlSettings,
    /// Selectors for sources that don't carry their own.
    pub default_selectors: SelectorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            crawl: CrawlSettings::default(),
            default_selectors: SelectorConfig::default(),
        }
    }
}

/// Concurrency caps and HTTP client settings for one crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Source workers running at once.
    pub source_concurrency: usize,
    /// Article tasks running at once within a single source.
    pub article_concurrency: usize,
    /// Page fetches in flight at once across the whole run.
    pub max_concurrent_fetches: usize,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            source_concurrency: 4,
            article_concurrency: 8,
            max_concurrent_fetches: 16,
            request_timeout_secs: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CrawlSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("crawl.source_concurrency", self.source_concurrency),
            ("crawl.article_concurrency", self.article_concurrency),
            ("crawl.max_concurrent_fetches", self.max_concurrent_fetches),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroLimit(name));
            }
            // Every limit becomes a semaphore size.
            if value > Semaphore::MAX_PERMITS {
                return Err(ConfigError::LimitTooLarge {
                    name,
                    max: Semaphore::MAX_PERMITS,
                });
            }
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroLimit("crawl.request_timeout_secs"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Load and validate the config at `path`, or the defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not an empty map.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crawl.validate()?;
        CompiledSelectors::compile(&self.default_selectors)?;
        Ok(())
    }
}
