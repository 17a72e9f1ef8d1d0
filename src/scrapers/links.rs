//! Article link discovery on a source's root page.
//!
//! Walks every `a[href]` in document order, resolves the href against the
//! root page's URL, and keeps the links that match the source's
//! [`LinkPattern`] and [`LinkScope`]. Nothing is fetched here and nothing is
//! deduplicated; the source worker decides what to do with repeats.

use crate::error::ConfigError;
use crate::models::{LinkPattern, LinkScope};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static anchor selector"));

/// A compiled [`LinkPattern`].
#[derive(Debug, Clone)]
pub enum LinkMatcher {
    Prefix(String),
    Regex(Regex),
}

impl LinkMatcher {
    pub fn compile(pattern: &LinkPattern) -> Result<Self, ConfigError> {
        Ok(match pattern {
            LinkPattern::Prefix(prefix) => LinkMatcher::Prefix(prefix.clone()),
            LinkPattern::Regex { regex } => LinkMatcher::Regex(Regex::new(regex)?),
        })
    }

    /// Prefixes are tested against the path, regexes against the whole URL.
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            LinkMatcher::Prefix(prefix) => url.path().starts_with(prefix.as_str()),
            LinkMatcher::Regex(regex) => regex.is_match(url.as_str()),
        }
    }
}

/// A parsed root page that can be walked for article links any number of times.
pub struct LinkDiscovery<'a> {
    document: Html,
    base: &'a Url,
    matcher: &'a LinkMatcher,
    scope: LinkScope,
}

impl<'a> LinkDiscovery<'a> {
    pub fn parse(html: &str, base: &'a Url, matcher: &'a LinkMatcher, scope: LinkScope) -> Self {
        Self {
            document: Html::parse_document(html),
            base,
            matcher,
            scope,
        }
    }

    /// Lazily yield matching absolute URLs in document order.
    pub fn links(&self) -> impl Iterator<Item = Url> + '_ {
        self.document
            .select(&ANCHOR_SELECTOR)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| self.resolve(href))
            .filter(|url| self.in_scope(url) && self.matcher.matches(url))
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        let mut url = self.base.join(href.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_fragment(None);
        Some(url)
    }

    fn in_scope(&self, url: &Url) -> bool {
        match self.scope {
            LinkScope::AnyHost => true,
            LinkScope::SameHost => {
                url.host_str() == self.base.host_str()
                    && url.port_or_known_default() == self.base.port_or_known_default()
            }
        }
    }
}

/// Collect every matching link on `html`.
///
/// The parsed document is dropped before this returns, so callers running
/// inside spawned tasks never hold it across an await point.
pub fn discover(html: &str, base: &Url, matcher: &LinkMatcher, scope: LinkScope) -> Vec<Url> {
    LinkDiscovery::parse(html, base, matcher, scope).links().collect()
}
