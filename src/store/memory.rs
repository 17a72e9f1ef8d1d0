//! In-process store for tests and one-off runs.
//!
//! All state sits behind one `tokio::sync::Mutex`, so the URL check and the
//! insert happen atomically.

use super::{ArticleStore, DeletePolicy, InsertOutcome, RemovedSource, SourceCatalog};
use crate::error::StoreError;
use crate::models::{Article, ArticleId, NewArticle, NewSource, Source, SourceId};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;
use url::Url;

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    sources: Vec<Source>,
    articles: Vec<Article>,
    urls: HashSet<String>,
    last_source_id: SourceId,
    last_article_id: ArticleId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn article_count(&self) -> usize {
        self.state.lock().await.articles.len()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_if_absent(&self, article: NewArticle) -> Result<InsertOutcome, StoreError> {
        let mut state = self.state.lock().await;
        if !state.urls.insert(article.url.clone()) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.last_article_id += 1;
        let id = state.last_article_id;
        state.articles.push(article.into_article(id));
        Ok(InsertOutcome::Inserted(id))
    }

    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        Ok(self.state.lock().await.articles.clone())
    }
}

#[async_trait]
impl SourceCatalog for MemoryStore {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        Ok(self.state.lock().await.sources.clone())
    }

    async fn add_source(&self, source: NewSource) -> Result<Source, StoreError> {
        let mut state = self.state.lock().await;
        if state.sources.iter().any(|s| s.root_url == source.root_url) {
            return Err(StoreError::SourceExists {
                root_url: source.root_url.to_string(),
            });
        }
        state.last_source_id += 1;
        let source = source.into_source(state.last_source_id);
        state.sources.push(source.clone());
        Ok(source)
    }

    async fn remove_source(
        &self,
        root_url: &Url,
        policy: DeletePolicy,
    ) -> Result<RemovedSource, StoreError> {
        let mut state = self.state.lock().await;
        let position = state
            .sources
            .iter()
            .position(|s| &s.root_url == root_url)
            .ok_or_else(|| StoreError::SourceNotFound {
                root_url: root_url.to_string(),
            })?;
        let source = state.sources.remove(position);

        let mut articles_deleted = 0;
        if policy == DeletePolicy::CascadeArticles {
            let State { articles, urls, .. } = &mut *state;
            articles.retain(|article| {
                if article.source_id != source.id {
                    return true;
                }
                urls.remove(&article.url);
                articles_deleted += 1;
                false
            });
        }

        Ok(RemovedSource {
            source,
            articles_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        contract::insert_is_idempotent(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_concurrent_inserts_store_one_row() {
        contract::concurrent_inserts_store_one_row(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn test_round_trips_article_fields() {
        contract::round_trips_article_fields(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_duplicate_source_is_rejected() {
        contract::duplicate_source_is_rejected(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_sources_keep_their_rules() {
        contract::sources_keep_their_rules(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_removal_retains_articles_by_default() {
        contract::removal_retains_articles_by_default(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_cascade_removal() {
        contract::cascade_removal_deletes_only_that_sources_articles(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_removing_unknown_source_fails() {
        contract::removing_unknown_source_fails(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryStore::new();
        let a = store
            .insert_if_absent(contract::article(1, "https://a.test/news/1", "a"))
            .await
            .unwrap();
        let b = store
            .insert_if_absent(contract::article(1, "https://a.test/news/2", "b"))
            .await
            .unwrap();
        assert_eq!(a, InsertOutcome::Inserted(1));
        assert_eq!(b, InsertOutcome::Inserted(2));
        assert_eq!(store.article_count().await, 2);
    }
}
