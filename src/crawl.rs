//! Concurrent crawl-and-extract pipeline.
//!
//! # Architecture
//!
//! ```text
//! Crawler::start ──► coordinator ──► SourceWorker × N ──► ArticleTask × M ──► store
//!        │          (≤ source_concurrency)   (≤ article_concurrency per source)
//!        └─► CrawlHandle (returned immediately)
//! ```
//!
//! 1. **Snapshot**: the source list is read once when the crawl starts
//! 2. **Sources**: each source runs in its own task: fetch root → discover links
//! 3. **Articles**: each discovered URL runs in its own task: fetch → extract → store
//! 4. **Report**: every task is joined and its outcome lands in a [`RunReport`]
//!
//! Spawns at both levels are gated by a semaphore, and every fetch passes
//! through a [`ConcurrencyLimit`] shared by the whole run. A failure only ends
//! its own unit of work: a failed root page abandons that source, a failed
//! article page or insert abandons that article.
//!
//! Cancelling stops new sources and articles from launching and abandons
//! in-flight fetches. An insert that has started always runs to completion.

use crate::config::{AppConfig, CrawlSettings};
use crate::error::{ConfigError, StoreError};
use crate::models::{NewArticle, SelectorConfig, Source, SourceId};
use crate::report::{ArticleOutcome, FailureStage, RunReport, SourceReport, SourceStatus};
use crate::scrapers::extract::{CompiledSelectors, extract};
use crate::scrapers::fetch::{ConcurrencyLimit, Fetcher};
use crate::scrapers::links::{LinkMatcher, discover};
use crate::store::{ArticleStore, InsertOutcome, SourceCatalog};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use itertools::Itertools;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Acknowledgement returned by [`Crawler::start`].
///
/// It only says the crawl has begun. Progress is observed through the store,
/// and the outcome through [`CrawlHandle::wait`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlStarted {
    pub started_at: DateTime<Utc>,
    /// Number of sources in the snapshot taken at start.
    pub sources: usize,
}

/// A running crawl.
#[derive(Debug)]
pub struct CrawlHandle {
    started: CrawlStarted,
    cancel: CancellationToken,
    join: JoinHandle<RunReport>,
}

impl CrawlHandle {
    pub fn started(&self) -> &CrawlStarted {
        &self.started
    }

    /// Stop launching work and abandon in-flight fetches.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for every source worker to finish.
    pub async fn wait(self) -> Result<RunReport, JoinError> {
        self.join.await
    }
}

/// Crawl coordinator. Cheap to clone; clones share the fetcher, store and fetch limit.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArticleStore>,
    settings: Arc<CrawlSettings>,
    default_selectors: Arc<SelectorConfig>,
}

impl Crawler {
    /// Build a crawler. `fetcher` is wrapped so that at most
    /// `settings.max_concurrent_fetches` fetches run at once.
    pub fn new<F>(
        fetcher: F,
        store: Arc<dyn ArticleStore>,
        settings: CrawlSettings,
        default_selectors: SelectorConfig,
    ) -> Result<Self, ConfigError>
    where
        F: Fetcher + 'static,
    {
        settings.validate()?;
        CompiledSelectors::compile(&default_selectors)?;
        let fetcher = ConcurrencyLimit::new(fetcher, settings.max_concurrent_fetches);
        Ok(Self {
            fetcher: Arc::new(fetcher),
            store,
            settings: Arc::new(settings),
            default_selectors: Arc::new(default_selectors),
        })
    }

    pub fn from_config<F>(
        fetcher: F,
        store: Arc<dyn ArticleStore>,
        config: &AppConfig,
    ) -> Result<Self, ConfigError>
    where
        F: Fetcher + 'static,
    {
        Self::new(
            fetcher,
            store,
            config.crawl.clone(),
            config.default_selectors.clone(),
        )
    }

    /// Snapshot the catalog's sources and start crawling them in the background.
    ///
    /// Returns as soon as the snapshot is taken. Sources added or removed
    /// afterwards do not affect this run.
    #[instrument(level = "info", skip_all)]
    pub async fn start(&self, catalog: &dyn SourceCatalog) -> Result<CrawlHandle, StoreError> {
        let sources = catalog.list_sources().await?;
        Ok(self.spawn(sources))
    }

    /// Start crawling `sources` in the background.
    pub fn spawn(&self, sources: Vec<Source>) -> CrawlHandle {
        let cancel = CancellationToken::new();
        let started = CrawlStarted {
            started_at: Utc::now(),
            sources: sources.len(),
        };
        info!(sources = started.sources, "Crawl started");

        let crawler = self.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move { crawler.run(sources, token).await });
        CrawlHandle {
            started,
            cancel,
            join,
        }
    }

    /// Crawl `sources` to completion (or cancellation) and report what happened.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run(&self, sources: Vec<Source>, cancel: CancellationToken) -> RunReport {
        let started_at = Utc::now();
        let permits = Arc::new(Semaphore::new(self.settings.source_concurrency));
        let mut workers = FuturesUnordered::new();
        let mut reports = Vec::with_capacity(sources.len());
        let mut pending = sources.into_iter();

        for source in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = permits.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                reports.push(SourceReport::new(&source).with_status(SourceStatus::Cancelled));
                break;
            };

            let fallback = SourceReport::new(&source);
            let worker = SourceWorker {
                crawler: self.clone(),
                source,
                cancel: cancel.clone(),
            };
            let handle = tokio::spawn(async move {
                let _permit = permit;
                worker.run().await
            });
            workers.push(async move {
                handle.await.unwrap_or_else(|e| {
                    error!(source = %fallback.name, error = %e, "Source worker aborted");
                    fallback.with_status(SourceStatus::Aborted {
                        reason: e.to_string(),
                    })
                })
            });
        }
        for source in pending {
            reports.push(SourceReport::new(&source).with_status(SourceStatus::Cancelled));
        }

        while let Some(report) = workers.next().await {
            reports.push(report);
        }

        let report = RunReport::new(started_at, cancel.is_cancelled(), reports);
        let totals = &report.totals;
        info!(
            sources = totals.sources,
            sources_failed = totals.sources_failed,
            discovered = totals.discovered,
            stored = totals.stored,
            duplicates = totals.duplicates,
            skipped = totals.skipped,
            failed = totals.failed,
            cancelled = report.cancelled,
            "Crawl finished"
        );
        report
    }
}

/// Crawls one source: root page, link discovery, then one task per article.
struct SourceWorker {
    crawler: Crawler,
    source: Source,
    cancel: CancellationToken,
}

impl SourceWorker {
    #[instrument(
        level = "info",
        skip_all,
        fields(source = %self.source.name, root_url = %self.source.root_url)
    )]
    async fn run(self) -> SourceReport {
        let report = SourceReport::new(&self.source);

        let (matcher, selectors) = match self.compile_rules() {
            Ok(rules) => rules,
            Err(e) => {
                warn!(error = %e, "Source has invalid rules; skipping");
                return report.with_status(SourceStatus::InvalidConfig {
                    reason: e.to_string(),
                });
            }
        };

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return report.with_status(SourceStatus::Cancelled),
            fetched = self.crawler.fetcher.fetch(&self.source.root_url) => fetched,
        };
        let root_html = match fetched {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "Root page fetch failed; abandoning source for this run");
                return report.with_status(SourceStatus::RootFetchFailed {
                    reason: e.to_string(),
                });
            }
        };

        let urls: Vec<Url> = discover(
            &root_html,
            &self.source.root_url,
            &matcher,
            self.source.link_scope,
        )
        .into_iter()
        .unique()
        .collect();
        info!(count = urls.len(), "Discovered article links");
        debug!(urls = ?urls, "Article URLs");

        self.crawl_articles(urls, Arc::new(selectors), report).await
    }

    fn compile_rules(&self) -> Result<(LinkMatcher, CompiledSelectors), ConfigError> {
        let matcher = LinkMatcher::compile(&self.source.link_pattern)?;
        let selectors = self
            .source
            .selectors
            .as_ref()
            .unwrap_or(&*self.crawler.default_selectors);
        Ok((matcher, CompiledSelectors::compile(selectors)?))
    }

    async fn crawl_articles(
        &self,
        urls: Vec<Url>,
        selectors: Arc<CompiledSelectors>,
        mut report: SourceReport,
    ) -> SourceReport {
        report.discovered = urls.len();
        let permits = Arc::new(Semaphore::new(self.crawler.settings.article_concurrency));
        let mut tasks = FuturesUnordered::new();
        let mut pending = urls.into_iter();

        for url in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = permits.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                report.record(url.as_str(), ArticleOutcome::Cancelled);
                break;
            };

            let task = ArticleTask {
                fetcher: self.crawler.fetcher.clone(),
                store: self.crawler.store.clone(),
                selectors: selectors.clone(),
                source_id: self.source.id,
                url: url.clone(),
                cancel: self.cancel.clone(),
            };
            let handle = tokio::spawn(async move {
                let _permit = permit;
                task.run().await
            });
            tasks.push(async move { (url, handle.await) });
        }
        for url in pending {
            report.record(url.as_str(), ArticleOutcome::Cancelled);
        }

        while let Some((url, joined)) = tasks.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                error!(%url, error = %e, "Article task aborted");
                ArticleOutcome::Failed {
                    stage: FailureStage::Task,
                    reason: e.to_string(),
                }
            });
            report.record(url.as_str(), outcome);
        }

        info!(
            discovered = report.discovered,
            stored = report.stored,
            duplicates = report.duplicates,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            "Source crawl finished"
        );
        report
    }
}

/// Fetch → extract → store for one discovered URL.
struct ArticleTask {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArticleStore>,
    selectors: Arc<CompiledSelectors>,
    source_id: SourceId,
    url: Url,
    cancel: CancellationToken,
}

impl ArticleTask {
    #[instrument(level = "debug", skip_all, fields(url = %self.url))]
    async fn run(self) -> ArticleOutcome {
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ArticleOutcome::Cancelled,
            fetched = self.fetcher.fetch(&self.url) => fetched,
        };
        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "Article fetch failed");
                return ArticleOutcome::Failed {
                    stage: FailureStage::Fetch,
                    reason: e.to_string(),
                };
            }
        };

        let Some(fields) = extract(&html, &self.selectors) else {
            debug!("No title found; not an article");
            return ArticleOutcome::Skipped;
        };
        let title = truncate_for_log(&fields.title, 80);
        let article = NewArticle::from_fields(fields, self.source_id, &self.url);

        match self.store.insert_if_absent(article).await {
            Ok(InsertOutcome::Inserted(id)) => {
                debug!(id, %title, "Stored article");
                ArticleOutcome::Stored
            }
            Ok(InsertOutcome::AlreadyExists) => {
                debug!(%title, "Article already stored");
                ArticleOutcome::Duplicate
            }
            Err(e) => {
                error!(error = %e, "Failed to store article");
                ArticleOutcome::Failed {
                    stage: FailureStage::Store,
                    reason: e.to_string(),
                }
            }
        }
    }
}
