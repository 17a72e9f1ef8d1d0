//! Data models for sources, selector rules and stored articles.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`Source`] / [`NewSource`]: a configured website and the rules used to crawl it
//! - [`LinkPattern`] and [`LinkScope`]: which anchors on a root page count as articles
//! - [`SelectorConfig`]: CSS selectors used to pull fields out of an article page
//! - [`ArticleFields`], [`NewArticle`], [`Article`]: extraction output and persisted rows
//!
//! Sources and selector rules are plain serde structs so they can be written in the
//! YAML config file, stored as JSON in the database, and passed explicitly through the
//! crawl instead of living in global state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifier assigned to a [`Source`] by the catalog.
pub type SourceId = i64;

/// Identifier assigned to an [`Article`] by the store.
pub type ArticleId = i64;

/// Matcher deciding whether a discovered link points at an article.
///
/// In YAML and JSON a bare string is a path prefix, while `{ regex: "..." }`
/// is a regular expression tested against the absolute URL.
///
/// ```yaml
/// link_pattern: /news/
/// # or
/// link_pattern:
///   regex: "^https://example\\.com/\\d{4}/"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkPattern {
    /// The resolved URL's path must start with this prefix.
    Prefix(String),
    /// The resolved absolute URL must match this regular expression.
    Regex { regex: String },
}

impl LinkPattern {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        LinkPattern::Prefix(prefix.into())
    }

    pub fn regex(regex: impl Into<String>) -> Self {
        LinkPattern::Regex {
            regex: regex.into(),
        }
    }
}

/// Which hosts a discovered link may point at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkScope {
    /// Only links on the same host as the source's root page.
    #[default]
    SameHost,
    /// Links on any host, as long as they match the pattern.
    AnyHost,
}

/// CSS selectors used to extract article fields from a page.
///
/// Missing keys fall back to the defaults, which only look inside `<article>`:
/// its first heading is the title, its `.author` is the byline and each of its
/// `<p>` contributes to the body. A page without an `<article>` has no title and
/// is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Selector for the headline. An empty match means "not an article".
    pub title_selector: String,
    /// Selector for the byline. An empty match leaves the author unset.
    pub author_selector: String,
    /// Selector for body nodes. All matches are joined with newlines.
    pub content_selector: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title_selector: "article h1, article h2, article h3".to_string(),
            author_selector: "article .author".to_string(),
            content_selector: "article p".to_string(),
        }
    }
}

/// A configured website to crawl for articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    /// Entry page from which article links are discovered.
    pub root_url: Url,
    pub link_pattern: LinkPattern,
    #[serde(default)]
    pub link_scope: LinkScope,
    /// Per-source selectors; `None` uses the crawler's defaults.
    #[serde(default)]
    pub selectors: Option<SelectorConfig>,
}

/// A source that has not been registered with a catalog yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub root_url: Url,
    pub link_pattern: LinkPattern,
    #[serde(default)]
    pub link_scope: LinkScope,
    #[serde(default)]
    pub selectors: Option<SelectorConfig>,
}

impl NewSource {
    pub fn new(name: impl Into<String>, root_url: Url, link_pattern: LinkPattern) -> Self {
        Self {
            name: name.into(),
            root_url,
            link_pattern,
            link_scope: LinkScope::default(),
            selectors: None,
        }
    }

    pub fn with_scope(mut self, link_scope: LinkScope) -> Self {
        self.link_scope = link_scope;
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorConfig) -> Self {
        self.selectors = Some(selectors);
        self
    }

    /// Attach the identifier handed out by a catalog.
    pub fn into_source(self, id: SourceId) -> Source {
        Source {
            id,
            name: self.name,
            root_url: self.root_url,
            link_pattern: self.link_pattern,
            link_scope: self.link_scope,
            selectors: self.selectors,
        }
    }
}

/// Fields extracted from one article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFields {
    /// Never empty.
    pub title: String,
    pub author: Option<String>,
    pub content: String,
}

/// An extracted article ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewArticle {
    pub scraped_at: DateTime<Utc>,
    pub title: String,
    pub author: Option<String>,
    pub content: String,
    pub source_id: SourceId,
    /// Uniqueness key in every store.
    pub url: String,
}

impl NewArticle {
    pub fn from_fields(fields: ArticleFields, source_id: SourceId, url: &Url) -> Self {
        Self {
            scraped_at: Utc::now(),
            title: fields.title,
            author: fields.author,
            content: fields.content,
            source_id,
            url: url.to_string(),
        }
    }

    pub fn into_article(self, id: ArticleId) -> Article {
        Article {
            id,
            scraped_at: self.scraped_at,
            title: self.title,
            author: self.author,
            content: self.content,
            source_id: self.source_id,
            url: self.url,
        }
    }
}

/// A persisted article as returned by the read surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub scraped_at: DateTime<Utc>,
    pub title: String,
    pub author: Option<String>,
    pub content: String,
    pub source_id: SourceId,
    pub url: String,
}
