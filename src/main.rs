//! # News Crawler
//!
//! Command-line front end: manage sources, run a crawl, dump stored articles.
//!
//! ## Usage
//!
//! ```sh
//! news_crawler sources add --name "NPR Text" --root-url https://text.npr.org/ --link-pattern /nx-
//! news_crawler crawl --report-dir ./reports
//! news_crawler articles -o ./articles.json
//! ```
//!
//! Logging goes to stdout via `tracing`; set `RUST_LOG` to change the level.

use clap::Parser;
use news_crawler::models::{LinkPattern, LinkScope, NewSource, SelectorConfig};
use news_crawler::outputs::json;
use news_crawler::scrapers::extract::CompiledSelectors;
use news_crawler::scrapers::links::LinkMatcher;
use news_crawler::utils::ensure_writable_dir;
use news_crawler::{
    AppConfig, ArticleStore, ConfigError, Crawler, DeletePolicy, HttpFetcher, SourceCatalog,
    SqliteStore,
};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod cli;

use cli::{AddSource, Cli, Command, SourcesCommand};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);

    let result = match args.command {
        Command::Crawl { report_dir } => crawl(&config, store.clone(), report_dir.as_deref()).await,
        Command::Articles { output } => {
            let articles = store.list_articles().await?;
            info!(count = articles.len(), "Loaded articles");
            match output {
                Some(path) => json::write_articles(&articles, &path).await,
                None => {
                    println!("{}", serde_json::to_string_pretty(&articles)?);
                    Ok(())
                }
            }
        }
        Command::Sources(command) => sources(&config, &*store, command).await,
    };
    store.close().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result
}

#[instrument(level = "info", skip_all)]
async fn crawl(
    config: &AppConfig,
    store: Arc<SqliteStore>,
    report_dir: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    // Early check: fail before crawling rather than after.
    if let Some(dir) = report_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Report directory is not writable");
            return Err(e.into());
        }
    }

    let fetcher = HttpFetcher::new(&config.crawl)?;
    let crawler = Crawler::from_config(fetcher, store.clone(), config)?;
    let handle = crawler.start(&*store).await?;
    let started = handle.started();
    info!(
        started_at = %started.started_at,
        sources = started.sources,
        "Crawl started; press Ctrl-C to cancel"
    );

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; cancelling crawl");
            cancel.cancel();
        }
    });

    let report = handle.wait().await?;
    for source in report.sources.iter().filter(|s| !s.succeeded()) {
        warn!(source = %source.name, status = ?source.status, "Source was not crawled");
    }

    if let Some(dir) = report_dir {
        if let Err(e) = json::write_run_report(&report, dir).await {
            error!(error = %e, "Failed to write crawl report");
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn sources(
    config: &AppConfig,
    catalog: &dyn SourceCatalog,
    command: SourcesCommand,
) -> Result<(), Box<dyn Error>> {
    match command {
        SourcesCommand::List => {
            let sources = catalog.list_sources().await?;
            println!("{}", serde_json::to_string_pretty(&sources)?);
        }
        SourcesCommand::Add(add) => {
            let source = new_source(add, &config.default_selectors)?;
            let added = catalog.add_source(source).await?;
            info!(id = added.id, name = %added.name, root_url = %added.root_url, "Added source");
        }
        SourcesCommand::Remove { root_url, cascade } => {
            let root_url = parse_url(&root_url)?;
            let policy = if cascade {
                DeletePolicy::CascadeArticles
            } else {
                DeletePolicy::RetainArticles
            };
            let removed = catalog.remove_source(&root_url, policy).await?;
            info!(
                name = %removed.source.name,
                articles_deleted = removed.articles_deleted,
                "Removed source"
            );
        }
    }
    Ok(())
}

/// Build a source from CLI flags, rejecting rules the crawl could not compile.
fn new_source(add: AddSource, defaults: &SelectorConfig) -> Result<NewSource, Box<dyn Error>> {
    let has_selectors = add.has_selectors();
    let root_url = parse_url(&add.root_url)?;
    let pattern = if add.regex {
        LinkPattern::regex(add.link_pattern)
    } else {
        LinkPattern::prefix(add.link_pattern)
    };
    LinkMatcher::compile(&pattern)?;

    let mut source = NewSource::new(add.name, root_url, pattern);
    if add.any_host {
        source = source.with_scope(LinkScope::AnyHost);
    }
    if has_selectors {
        let or_default =
            |flag: Option<String>, default: &str| flag.unwrap_or_else(|| default.to_string());
        let selectors = SelectorConfig {
            title_selector: or_default(add.title_selector, &defaults.title_selector),
            author_selector: or_default(add.author_selector, &defaults.author_selector),
            content_selector: or_default(add.content_selector, &defaults.content_selector),
        };
        CompiledSelectors::compile(&selectors)?;
        source = source.with_selectors(selectors);
    }
    Ok(source)
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use news_crawler::models::LinkPattern;

    fn add_source(args: &[&str]) -> AddSource {
        let mut argv = vec!["news_crawler", "sources", "add"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Command::Sources(SourcesCommand::Add(add)) => add,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_root_url_is_config_error() {
        let err = parse_url("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { ref url, .. } if url == "not a url"));
    }

    #[test]
    fn test_new_source_fills_unset_selectors_from_defaults() {
        let add = add_source(&[
            "--name",
            "Lite",
            "--root-url",
            "https://lite.test/",
            "--link-pattern",
            "/2025/",
            "--title-selector",
            ".headline",
        ]);
        let defaults = SelectorConfig::default();

        let source = new_source(add, &defaults).unwrap();
        assert_eq!(source.link_pattern, LinkPattern::prefix("/2025/"));
        let selectors = source.selectors.unwrap();
        assert_eq!(selectors.title_selector, ".headline");
        assert_eq!(selectors.content_selector, defaults.content_selector);
    }

    #[test]
    fn test_new_source_rejects_bad_url_and_regex() {
        let bad_url = add_source(&["--name", "X", "--root-url", "nope", "--link-pattern", "/"]);
        let err = new_source(bad_url, &SelectorConfig::default()).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());

        let bad_regex = add_source(&[
            "--name",
            "X",
            "--root-url",
            "https://x.test/",
            "--link-pattern",
            "(",
            "--regex",
        ]);
        assert!(new_source(bad_regex, &SelectorConfig::default()).is_err());
    }
}
