//! Typed outcomes of a crawl run.
//!
//! Each article task ends in an [`ArticleOutcome`], each source worker in a
//! [`SourceReport`], and the coordinator aggregates them into a [`RunReport`].
//! Failures are still logged where they happen, and they are also counted here
//! so a caller can see what a run achieved without reading the logs.

use crate::models::{Source, SourceId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where an article task gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Store,
    /// The task itself panicked or was aborted.
    Task,
}

/// Result of one fetch → extract → store unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArticleOutcome {
    Stored,
    /// The store already had an article at this URL.
    Duplicate,
    /// The page had no title, so it is not an article.
    Skipped,
    Failed { stage: FailureStage, reason: String },
    /// Not started, or its fetch was abandoned, because the run was cancelled.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedArticle {
    pub url: String,
    pub stage: FailureStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Crawled,
    RootFetchFailed { reason: String },
    InvalidConfig { reason: String },
    /// Cancelled before the root page was processed.
    Cancelled,
    /// The source worker itself panicked or was aborted.
    Aborted { reason: String },
}

/// What one source worker did during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source_id: SourceId,
    pub name: String,
    pub root_url: String,
    pub status: SourceStatus,
    /// Distinct article URLs found on the root page.
    pub discovered: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub failures: Vec<FailedArticle>,
}

impl SourceReport {
    pub fn new(source: &Source) -> Self {
        Self {
            source_id: source.id,
            name: source.name.clone(),
            root_url: source.root_url.to_string(),
            status: SourceStatus::Crawled,
            discovered: 0,
            stored: 0,
            duplicates: 0,
            skipped: 0,
            failed: 0,
            cancelled: 0,
            failures: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: SourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn record(&mut self, url: &str, outcome: ArticleOutcome) {
        match outcome {
            ArticleOutcome::Stored => self.stored += 1,
            ArticleOutcome::Duplicate => self.duplicates += 1,
            ArticleOutcome::Skipped => self.skipped += 1,
            ArticleOutcome::Cancelled => self.cancelled += 1,
            ArticleOutcome::Failed { stage, reason } => {
                self.failed += 1;
                self.failures.push(FailedArticle {
                    url: url.to_string(),
                    stage,
                    reason,
                });
            }
        }
    }

    /// Whether the source's root page was processed at all.
    pub fn succeeded(&self) -> bool {
        self.status == SourceStatus::Crawled
    }
}

/// Counters summed over every source of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub sources: usize,
    pub sources_failed: usize,
    pub discovered: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunTotals {
    fn from_sources(sources: &[SourceReport]) -> Self {
        sources.iter().fold(Self::default(), |mut totals, s| {
            totals.sources += 1;
            if !s.succeeded() {
                totals.sources_failed += 1;
            }
            totals.discovered += s.discovered;
            totals.stored += s.stored;
            totals.duplicates += s.duplicates;
            totals.skipped += s.skipped;
            totals.failed += s.failed;
            totals.cancelled += s.cancelled;
            totals
        })
    }
}

/// Aggregate of one coordinator invocation. Source order is completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub totals: RunTotals,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, cancelled: bool, sources: Vec<SourceReport>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            cancelled,
            totals: RunTotals::from_sources(&sources),
            sources,
        }
    }

    pub fn source(&self, source_id: SourceId) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }
}
