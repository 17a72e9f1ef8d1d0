//! Full crawl against a local HTTP server with a SQLite store.

use news_crawler::report::SourceStatus;
use news_crawler::{
    ArticleStore, CrawlSettings, Crawler, HttpFetcher, LinkPattern, NewSource, SelectorConfig,
    SourceCatalog, SqliteStore,
};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<!doctype html><html><body>{body}</body></html>"))
}

fn article(title: &str, author: &str) -> ResponseTemplate {
    html(&format!(
        "<nav><a href=\"/\">Home</a></nav>\
         <article><h2>{title}</h2><span class=\"author\">{author}</span>\
         <p>First paragraph of {title}.</p><p>Second paragraph.</p></article>"
    ))
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn never_requested(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html("not an article"))
        .expect(0)
        .mount(server)
        .await;
}

async fn add_source(store: &SqliteStore, server: &MockServer, name: &str, root: &str) {
    let root_url = Url::parse(&format!("{}{root}", server.uri())).unwrap();
    store
        .add_source(NewSource::new(name, root_url, LinkPattern::prefix("/news/")))
        .await
        .unwrap();
}

fn crawler(store: Arc<SqliteStore>) -> Crawler {
    let settings = CrawlSettings {
        request_timeout_secs: Some(5),
        ..CrawlSettings::default()
    };
    let fetcher = HttpFetcher::new(&settings).unwrap();
    Crawler::new(fetcher, store, settings, SelectorConfig::default()).unwrap()
}

#[tokio::test]
async fn test_two_sources_sharing_an_article() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/world",
        html(concat!(
            r#"<a href="/news/a1">A1</a> <a href="/news/shared">Shared</a> "#,
            r#"<a href="/other/x">X</a>"#,
        )),
    )
    .await;
    serve(
        &server,
        "/politics",
        html(concat!(
            r#"<a href="/news/b1">B1</a> <a href="news/../news/shared">Shared</a> "#,
            r#"<a href="/other/y">Y</a>"#,
        )),
    )
    .await;
    serve(&server, "/news/a1", article("World story", "A. Writer")).await;
    serve(&server, "/news/b1", article("Politics story", "B. Writer")).await;
    serve(&server, "/news/shared", article("Shared story", "Wire")).await;
    never_requested(&server, "/other/x").await;
    never_requested(&server, "/other/y").await;

    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    add_source(&store, &server, "World", "/world").await;
    add_source(&store, &server, "Politics", "/politics").await;

    let handle = crawler(store.clone()).start(&*store).await.unwrap();
    assert_eq!(handle.started().sources, 2);
    let report = handle.wait().await.unwrap();

    assert!(report.sources.iter().all(|s| s.status == SourceStatus::Crawled));
    assert_eq!(report.totals.stored, 3);
    assert_eq!(report.totals.duplicates, 1);

    let articles = store.list_articles().await.unwrap();
    assert_eq!(articles.len(), 3);
    let urls: HashSet<String> = articles.iter().map(|a| a.url.clone()).collect();
    let expected: HashSet<String> = ["/news/a1", "/news/b1", "/news/shared"]
        .iter()
        .map(|p| format!("{}{p}", server.uri()))
        .collect();
    assert_eq!(urls, expected);

    let sources = store.list_sources().await.unwrap();
    let world = sources.iter().find(|s| s.name == "World").unwrap();
    let a1 = articles.iter().find(|a| a.url.ends_with("/news/a1")).unwrap();
    assert_eq!(a1.title, "World story");
    assert_eq!(a1.author.as_deref(), Some("A. Writer"));
    assert_eq!(a1.content, "First paragraph of World story.\nSecond paragraph.");
    assert_eq!(a1.source_id, world.id);
}

#[tokio::test]
async fn test_recrawl_stores_nothing_new() {
    let server = MockServer::start().await;
    serve(&server, "/", html(r#"<a href="/news/1">1</a><a href="/news/2">2</a>"#)).await;
    serve(&server, "/news/1", article("One", "Desk")).await;
    serve(&server, "/news/2", article("Two", "Desk")).await;

    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    add_source(&store, &server, "Front", "/").await;
    let crawler = crawler(store.clone());

    let first = crawler.start(&*store).await.unwrap().wait().await.unwrap();
    let second = crawler.start(&*store).await.unwrap().wait().await.unwrap();

    assert_eq!(first.totals.stored, 2);
    assert_eq!(second.totals.stored, 0);
    assert_eq!(second.totals.duplicates, 2);
    assert_eq!(store.list_articles().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failing_source_and_article_are_isolated() {
    let server = MockServer::start().await;
    serve(&server, "/down", ResponseTemplate::new(503)).await;
    serve(
        &server,
        "/up",
        html(concat!(
            r#"<a href="/news/ok">ok</a><a href="/news/gone">gone</a>"#,
            r#"<a href="/news/index">index</a>"#,
        )),
    )
    .await;
    serve(&server, "/news/ok", article("Still here", "Desk")).await;
    serve(&server, "/news/gone", ResponseTemplate::new(500)).await;
    serve(&server, "/news/index", html("<p>More headlines</p>")).await;

    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    add_source(&store, &server, "Down", "/down").await;
    add_source(&store, &server, "Up", "/up").await;

    let report = crawler(store.clone())
        .start(&*store)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let down = report.sources.iter().find(|s| s.name == "Down").unwrap();
    assert!(matches!(down.status, SourceStatus::RootFetchFailed { .. }));
    let up = report.sources.iter().find(|s| s.name == "Up").unwrap();
    assert_eq!((up.stored, up.failed, up.skipped), (1, 1, 1));
    assert!(up.failures[0].url.ends_with("/news/gone"));

    let articles = store.list_articles().await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Still here");
}
