//! # News Crawler
//!
//! Crawls configured news sites, pulls article fields out of each discovered
//! article page, and stores every article exactly once by URL.
//!
//! ## Pipeline
//!
//! 1. **Snapshot**: read the configured [`Source`]s from a [`SourceCatalog`]
//! 2. **Discovery**: fetch each source's root page and keep the links matching its pattern
//! 3. **Extraction**: fetch each article page and apply the source's CSS selectors
//! 4. **Storage**: insert through [`ArticleStore::insert_if_absent`], so re-crawls and
//!    links shared between sources never produce duplicates
//!
//! Sources and articles are crawled concurrently under configurable limits; see
//! [`crawl`] for the task structure and cancellation rules.
//!
//! ```no_run
//! use news_crawler::{AppConfig, Crawler, HttpFetcher, SqliteStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
//! let fetcher = HttpFetcher::new(&config.crawl)?;
//! let crawler = Crawler::from_config(fetcher, store.clone(), &config)?;
//!
//! let handle = crawler.start(&*store).await?;
//! let report = handle.wait().await?;
//! println!("stored {} new articles", report.totals.stored);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawl;
pub mod error;
pub mod models;
pub mod outputs;
pub mod report;
pub mod scrapers;
pub mod store;
pub mod utils;

pub use config::{AppConfig, CrawlSettings};
pub use crawl::{CrawlHandle, CrawlStarted, Crawler};
pub use error::{ConfigError, FetchError, StoreError};
pub use models::{Article, LinkPattern, LinkScope, NewArticle, NewSource, SelectorConfig, Source};
pub use report::{RunReport, SourceReport};
pub use scrapers::fetch::{ConcurrencyLimit, Fetcher, HttpFetcher};
pub use store::{ArticleStore, DeletePolicy, InsertOutcome, MemoryStore, SourceCatalog, SqliteStore};
