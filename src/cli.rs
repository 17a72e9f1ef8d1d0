//! Command-line interface definitions for the news crawler.
//!
//! Global options can also come from environment variables.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Crawl news sites and store their articles.
///
/// # Examples
///
/// ```sh
/// news_crawler sources add --name "CNN Lite" --root-url https://lite.cnn.com/ \
///     --link-pattern /2025/
/// news_crawler crawl --report-dir ./reports
/// news_crawler articles --output ./articles.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true, env = "NEWS_CRAWLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database URL; overrides `database_url` from the config file
    #[arg(long, global = true, env = "NEWS_CRAWLER_DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl every configured source once. Ctrl-C cancels the run.
    Crawl {
        /// Write the run report as JSON under this directory
        #[arg(short, long)]
        report_dir: Option<String>,
    },

    /// Dump every stored article as JSON
    Articles {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the sources to crawl
    #[command(subcommand)]
    Sources(SourcesCommand),
}

#[derive(Subcommand, Debug)]
pub enum SourcesCommand {
    /// List configured sources as JSON
    List,

    /// Register a new source
    Add(AddSource),

    /// Remove a source by its root URL
    Remove {
        #[arg(long)]
        root_url: String,

        /// Also delete the articles crawled from this source
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Args, Debug)]
pub struct AddSource {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub root_url: String,

    /// Path prefix article links must start with (or a regex with --regex)
    #[arg(long)]
    pub link_pattern: String,

    /// Treat --link-pattern as a regex over the absolute URL
    #[arg(long)]
    pub regex: bool,

    /// Follow matching links on any host, not just the root page's
    #[arg(long)]
    pub any_host: bool,

    #[arg(long)]
    pub title_selector: Option<String>,

    #[arg(long)]
    pub author_selector: Option<String>,

    #[arg(long)]
    pub content_selector: Option<String>,
}

impl AddSource {
    pub fn has_selectors(&self) -> bool {
        self.title_selector.is_some()
            || self.author_selector.is_some()
            || self.content_selector.is_some()
    }
}
