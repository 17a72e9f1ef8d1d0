//! Persistence boundary for sources and articles.
//!
//! The crawl never queries before it inserts: it calls
//! [`ArticleStore::insert_if_absent`] and treats both [`InsertOutcome`]s as
//! success. Uniqueness by article URL is the store's job, so every
//! implementation must stay correct when many tasks insert the same URL at once.
//!
//! # Implementations
//!
//! | Store | Module | Uniqueness |
//! |-------|--------|------------|
//! | In-process | [`memory`] | checked under a single lock |
//! | SQLite | [`sqlite`] | `UNIQUE(url)` with `ON CONFLICT DO NOTHING` |

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::models::{Article, ArticleId, NewArticle, NewSource, Source};
use async_trait::async_trait;
use url::Url;

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ArticleId),
    /// An article with the same URL is already stored; nothing changed.
    AlreadyExists,
}

/// What happens to a source's articles when the source is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Keep the articles; their `source_id` then refers to a removed source.
    #[default]
    RetainArticles,
    /// Delete the source's articles together with it.
    CascadeArticles,
}

/// A source removed from a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSource {
    pub source: Source,
    pub articles_deleted: u64,
}

/// Idempotent article persistence.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert `article` unless one with the same URL exists.
    async fn insert_if_absent(&self, article: NewArticle) -> Result<InsertOutcome, StoreError>;

    /// Every stored article, unfiltered and unpaginated.
    async fn list_articles(&self) -> Result<Vec<Article>, StoreError>;
}

/// Registry of sources to crawl.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError>;

    /// Register a source. Root URLs are unique.
    async fn add_source(&self, source: NewSource) -> Result<Source, StoreError>;

    async fn remove_source(
        &self,
        root_url: &Url,
        policy: DeletePolicy,
    ) -> Result<RemovedSource, StoreError>;
}
