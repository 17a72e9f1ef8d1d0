//! Page fetching over HTTP.
//!
//! The crawl only needs "give me the HTML at this URL", so that is the whole
//! [`Fetcher`] trait. Behaviour is layered with decorators:
//! - [`HttpFetcher`]: a single `GET` through a shared `reqwest::Client`, no retries
//! - [`ConcurrencyLimit`]: caps how many fetches of the wrapped fetcher are in flight
//!
//! Test doubles implement [`Fetcher`] directly.

use crate::config::CrawlSettings;
use crate::error::FetchError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use url::Url;

/// Retrieves the HTML body behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` once. Failures are returned, never retried.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

#[async_trait]
impl<F> Fetcher for Arc<F>
where
    F: Fetcher + ?Sized,
{
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// [`Fetcher`] backed by `reqwest`.
///
/// Redirects follow the client's default policy. Requests have no timeout
/// unless `request_timeout_secs` is configured.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &CrawlSettings) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        match settings.request_timeout() {
            Some(timeout) => builder = builder.timeout(timeout),
            None => warn!(
                "No request timeout configured; a stalled server can hold a fetch slot indefinitely"
            ),
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Decorator allowing at most `limit` concurrent fetches through `inner`.
///
/// Callers over the limit wait for a slot in FIFO order.
pub struct ConcurrencyLimit<F> {
    inner: F,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl<F> ConcurrencyLimit<F>
where
    F: Fetcher,
{
    pub fn new(inner: F, limit: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Slots not currently taken by an in-flight fetch.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<F> fmt::Debug for ConcurrencyLimit<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyLimit")
            .field("limit", &self.limit)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

#[async_trait]
impl<F> Fetcher for ConcurrencyLimit<F>
where
    F: Fetcher,
{
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed {
                url: url.to_string(),
            })?;
        self.inner.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records the highest number of simultaneous calls it has seen.
    #[derive(Default)]
    struct GaugeFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for GaugeFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(url.to_string())
        }
    }

    #[tokio::test]
    async fn test_concurrency_limit_caps_in_flight_fetches() {
        let gauge = Arc::new(GaugeFetcher::default());
        let limited = ConcurrencyLimit::new(gauge.clone(), 3);
        let urls: Vec<Url> = (0..12)
            .map(|i| Url::parse(&format!("https://example.com/news/{i}")).unwrap())
            .collect();

        let results = join_all(urls.iter().map(|url| limited.fetch(url))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
        assert_eq!(limited.available(), 3);
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Hello</h1>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&CrawlSettings::default()).unwrap();
        let url = Url::parse(&format!("{}/news/a", server.uri())).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "<h1>Hello</h1>");
    }

    #[tokio::test]
    async fn test_http_fetcher_reports_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&CrawlSettings::default()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.url(), url.as_str());
    }

    #[tokio::test]
    async fn test_http_fetcher_honours_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let settings = CrawlSettings {
            request_timeout_secs: Some(1),
            ..CrawlSettings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}
