//! SQLite-backed store using `sqlx`.
//!
//! Article uniqueness is the `UNIQUE(url)` constraint: inserts use
//! `ON CONFLICT(url) DO NOTHING` and a zero row count means the URL was
//! already stored. Source link and selector rules live in a JSON column.

use super::{ArticleStore, DeletePolicy, InsertOutcome, RemovedSource, SourceCatalog};
use crate::error::StoreError;
use crate::models::{Article, LinkPattern, LinkScope, NewArticle, NewSource, SelectorConfig, Source};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS news_sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    rules TEXT NOT NULL
);

-- source_id is deliberately not a foreign key: removing a source may keep its articles.
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scraped_at TEXT NOT NULL,
    title TEXT NOT NULL,
    author TEXT,
    content TEXT NOT NULL,
    source_id INTEGER NOT NULL,
    url TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id);
"#;

/// Per-source crawl rules stored in `news_sources.rules`.
#[derive(Serialize, Deserialize)]
struct SourceRules {
    link_pattern: LinkPattern,
    #[serde(default)]
    link_scope: LinkScope,
    #[serde(default)]
    selectors: Option<SelectorConfig>,
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_url` and apply the schema.
    ///
    /// `sqlite::memory:` gives a private database held by a single pooled
    /// connection that is never recycled.
    #[instrument(level = "info")]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        info!("Database schema ready");
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn source_from_row(row: &SqliteRow) -> Result<Source, StoreError> {
    let root_url: String = row.try_get("root_url")?;
    let root_url = Url::parse(&root_url)
        .map_err(|e| StoreError::InvalidRow(format!("root_url '{root_url}': {e}")))?;
    let rules: SourceRules = serde_json::from_str(row.try_get("rules")?)?;
    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        root_url,
        link_pattern: rules.link_pattern,
        link_scope: rules.link_scope,
        selectors: rules.selectors,
    })
}

fn article_from_row(row: &SqliteRow) -> Result<Article, StoreError> {
    Ok(Article {
        id: row.try_get("id")?,
        scraped_at: row.try_get::<DateTime<Utc>, _>("scraped_at")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        content: row.try_get("content")?,
        source_id: row.try_get("source_id")?,
        url: row.try_get("url")?,
    })
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn insert_if_absent(&self, article: NewArticle) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            "INSERT INTO articles (scraped_at, title, author, content, source_id, url) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(url) DO NOTHING",
        )
        .bind(article.scraped_at)
        .bind(&article.title)
        .bind(article.author.as_deref())
        .bind(&article.content)
        .bind(article.source_id)
        .bind(&article.url)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
        }
    }

    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        sqlx::query(
            "SELECT id, scraped_at, title, author, content, source_id, url \
             FROM articles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(article_from_row)
        .collect()
    }
}

#[async_trait]
impl SourceCatalog for SqliteStore {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        sqlx::query("SELECT id, root_url, name, rules FROM news_sources ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(source_from_row)
            .collect()
    }

    async fn add_source(&self, source: NewSource) -> Result<Source, StoreError> {
        let rules = serde_json::to_string(&SourceRules {
            link_pattern: source.link_pattern.clone(),
            link_scope: source.link_scope,
            selectors: source.selectors.clone(),
        })?;

        let result = sqlx::query(
            "INSERT INTO news_sources (root_url, name, rules) VALUES (?, ?, ?) \
             ON CONFLICT(root_url) DO NOTHING",
        )
        .bind(source.root_url.as_str())
        .bind(&source.name)
        .bind(rules)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SourceExists {
                root_url: source.root_url.to_string(),
            });
        }
        Ok(source.into_source(result.last_insert_rowid()))
    }

    async fn remove_source(
        &self,
        root_url: &Url,
        policy: DeletePolicy,
    ) -> Result<RemovedSource, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row =
            sqlx::query("SELECT id, root_url, name, rules FROM news_sources WHERE root_url = ?")
                .bind(root_url.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(row) = row else {
            return Err(StoreError::SourceNotFound {
                root_url: root_url.to_string(),
            });
        };
        let source = source_from_row(&row)?;

        let articles_deleted = match policy {
            DeletePolicy::RetainArticles => 0,
            DeletePolicy::CascadeArticles => sqlx::query("DELETE FROM articles WHERE source_id = ?")
                .bind(source.id)
                .execute(&mut *tx)
                .await?
                .rows_affected(),
        };
        sqlx::query("DELETE FROM news_sources WHERE id = ?")
            .bind(source.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(RemovedSource {
            source,
            articles_deleted,
        })
    }
}
