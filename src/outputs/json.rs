//! JSON output for crawl reports and article exports.
//!
//! # Output Structure
//!
//! Run reports are grouped by the UTC date the run started:
//! ```text
//! report_dir/
//! └── 2025-05-06/
//!     ├── crawl-061502.json
//!     └── crawl-181944.json
//! ```

use crate::models::Article;
use crate::report::RunReport;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path a report lands at: `{report_dir}/{date}/crawl-{HHMMSS}.json`.
pub fn report_path(report: &RunReport, report_dir: &str) -> PathBuf {
    Path::new(report_dir)
        .join(report.started_at.format("%Y-%m-%d").to_string())
        .join(format!("crawl-{}.json", report.started_at.format("%H%M%S")))
}

/// Write a [`RunReport`] as pretty JSON under `report_dir`, returning the file path.
#[instrument(level = "info", skip_all, fields(report_dir = %report_dir))]
pub async fn write_run_report(
    report: &RunReport,
    report_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(report, report_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring report directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create report dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote crawl report");
    Ok(path)
}

/// Write stored articles as a JSON array to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = articles.len()))]
pub async fn write_articles(articles: &[Article], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(articles)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }
    fs::write(path, json).await?;
    info!("Wrote articles");
    Ok(())
}
