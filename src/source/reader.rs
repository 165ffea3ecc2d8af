//! Copy-then-read access to the browser's history database.
//!
//! The browser keeps its `History` file exclusively locked while running, so
//! every read works on a private snapshot that is deleted when the read
//! finishes, whatever the outcome.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row};
use std::collections::BTreeSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use super::error::{RowError, SourceError};
use crate::config::SourceConfig;
use crate::models::{from_source_epoch, to_source_epoch, VisitRecord};

const BROWSER_DIRS: &[&str] = &["google-chrome", "chromium"];
const PROFILES: &[&str] = &["Default", "Profile 1", "Profile 2", "Profile 3"];

const HISTORY_QUERY: &str = r#"
    SELECT url, title, last_visit_time, visit_count, typed_count
    FROM urls
    WHERE last_visit_time > ?
    ORDER BY last_visit_time DESC
"#;

/// Records from one extraction plus what happened while reading them.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<VisitRecord>,
    pub report: ExtractionReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub source: PathBuf,
    pub processed: usize,
    pub errored: usize,
}

/// Outcome of a successful access test against the history file.
#[derive(Debug, Clone, Serialize)]
pub struct AccessProbe {
    pub path: PathBuf,
    pub total_urls: u64,
}

/// Availability summary shown by the diagnostics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryInfo {
    pub accessible: bool,
    pub sample_count: usize,
    pub sample_domains: Vec<String>,
    pub last_collection: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SourceReader {
    candidates: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
}

/// Built-in history locations: container mounts first, then the container's
/// own profile directories, then the current user's.
pub fn default_history_paths() -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from("/host_chrome"),
        PathBuf::from("/host_chromium"),
    ];
    roots.extend(
        BROWSER_DIRS
            .iter()
            .map(|browser| Path::new("/root/.config").join(browser)),
    );

    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        roots.extend(
            BROWSER_DIRS
                .iter()
                .map(|browser| home.join(".config").join(browser)),
        );
        let support = home.join("Library/Application Support");
        roots.push(support.join("Google/Chrome"));
        roots.push(support.join("Chromium"));
    }

    let mut paths = Vec::new();
    for root in roots {
        for profile in PROFILES {
            let path = root.join(profile).join("History");
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

impl SourceReader {
    pub fn new(config: &SourceConfig) -> Self {
        let mut candidates = config.extra_paths.clone();
        if config.include_default_paths {
            candidates.extend(default_history_paths());
        }

        info!(
            candidates = candidates.len(),
            custom = config.extra_paths.len(),
            "History reader initialized"
        );

        Self {
            candidates,
            temp_dir: config.temp_dir.clone(),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that is a readable, non-empty regular file.
    pub async fn locate(&self) -> Option<PathBuf> {
        for path in &self.candidates {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() && meta.len() > 0 => {
                    if let Err(e) = tokio::fs::File::open(path).await {
                        debug!(path = %path.display(), error = %e, "History file not readable");
                        continue;
                    }
                    info!(path = %path.display(), size = meta.len(), "Found history file");
                    return Some(path.clone());
                }
                Ok(_) => debug!(path = %path.display(), "History file empty or not a file"),
                Err(_) => debug!(path = %path.display(), "Path does not exist"),
            }
        }

        warn!("No accessible history file found");
        None
    }

    /// Visits newer than `window_start`, or nothing if the source can't be read.
    pub async fn extract(&self, window_start: DateTime<Utc>) -> Vec<VisitRecord> {
        match self.try_extract(window_start).await {
            Ok(extraction) => extraction.records,
            Err(SourceError::Unavailable { candidates }) => {
                warn!(candidates, "No history file available, returning no visits");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "History extraction failed");
                Vec::new()
            }
        }
    }

    pub async fn try_extract(&self, window_start: DateTime<Utc>) -> Result<Extraction, SourceError> {
        let source = self.locate().await.ok_or(SourceError::Unavailable {
            candidates: self.candidates.len(),
        })?;

        // Dropping the guard removes the copy on every path out of this function
        let snapshot = self.snapshot(&source).await?;
        let mut conn = open_snapshot(snapshot.path()).await?;

        let since = to_source_epoch(window_start);
        debug!(%window_start, since, "Querying history");

        let rows = sqlx::query(HISTORY_QUERY)
            .bind(since)
            .fetch_all(&mut conn)
            .await;
        close_snapshot(conn).await;
        let rows = rows?;

        let mut records = Vec::with_capacity(rows.len());
        let mut errored = 0usize;
        for (index, row) in rows.iter().enumerate() {
            match parse_row(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    errored += 1;
                    warn!(row = index, error = %e, "Skipping malformed history row");
                }
            }
        }

        let report = ExtractionReport {
            source,
            processed: records.len(),
            errored,
        };
        info!(
            source = %report.source.display(),
            processed = report.processed,
            errored = report.errored,
            "History extraction finished"
        );

        Ok(Extraction { records, report })
    }

    /// Snapshot the file and count its rows without reading them.
    pub async fn probe(&self) -> Result<AccessProbe, SourceError> {
        let path = self.locate().await.ok_or(SourceError::Unavailable {
            candidates: self.candidates.len(),
        })?;

        let snapshot = self.snapshot(&path).await?;
        let mut conn = open_snapshot(snapshot.path()).await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM urls")
            .fetch_one(&mut conn)
            .await;
        close_snapshot(conn).await;

        let total_urls = total?.max(0) as u64;
        info!(path = %path.display(), total_urls, "History access test passed");

        Ok(AccessProbe { path, total_urls })
    }

    /// Read the last day of history and summarize what was found.
    pub async fn history_info(&self, last_collection: Option<DateTime<Utc>>) -> HistoryInfo {
        match self.try_extract(Utc::now() - Duration::days(1)).await {
            Ok(extraction) => {
                let sample_domains = extraction
                    .records
                    .iter()
                    .take(5)
                    .map(|r| r.domain.clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();

                HistoryInfo {
                    accessible: !extraction.records.is_empty(),
                    sample_count: extraction.records.len(),
                    sample_domains,
                    last_collection,
                    error: None,
                }
            }
            Err(e) => HistoryInfo {
                accessible: false,
                sample_count: 0,
                sample_domains: Vec::new(),
                last_collection,
                error: Some(e.to_string()),
            },
        }
    }

    /// Copy `source` into a fresh exclusive temp file.
    ///
    /// A permission error gets one retry through an external `cp`; anything
    /// else fails straight away.
    async fn snapshot(&self, source: &Path) -> Result<NamedTempFile, SourceError> {
        let copy_failed = |e: io::Error| SourceError::CopyFailed {
            path: source.to_path_buf(),
            source: e,
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("history-").suffix(".db");
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(copy_failed)?;

        let copied = tokio::fs::copy(source, temp.path()).await;
        copy_or_fallback(source, copied, || raw_copy(source, temp.path()))
            .await
            .map_err(copy_failed)?;

        let size = tokio::fs::metadata(temp.path())
            .await
            .map(|m| m.len())
            .map_err(copy_failed)?;
        if size == 0 {
            return Err(copy_failed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "snapshot is empty",
            )));
        }

        Ok(temp)
    }
}

/// Settle the first copy attempt. A permission error gets exactly one
/// `fallback` attempt; any other error is returned as is.
async fn copy_or_fallback<F, Fut>(source: &Path, copied: io::Result<u64>, fallback: F) -> io::Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    match copied {
        Ok(_) => {
            debug!(path = %source.display(), "Copied history file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %source.display(), "Permission denied, trying raw copy");
            fallback().await?;
            info!(path = %source.display(), "Copied history file with cp");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn raw_copy(source: &Path, dest: &Path) -> io::Result<()> {
    let status = tokio::process::Command::new("cp")
        .arg(source)
        .arg(dest)
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("cp exited with {status}")))
    }
}

async fn close_snapshot(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        debug!(error = %e, "Closing history snapshot connection failed");
    }
}

async fn open_snapshot(path: &Path) -> Result<SqliteConnection, SourceError> {
    let conn = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .immutable(true)
        .connect()
        .await?;
    Ok(conn)
}

fn parse_row(row: &SqliteRow) -> Result<VisitRecord, RowError> {
    let url: String = row.try_get("url")?;
    let title: Option<String> = row.try_get("title")?;
    let last_visit: Option<i64> = row.try_get("last_visit_time")?;
    let visit_count = non_negative("visit_count", row.try_get("visit_count")?)?;
    let typed_count = non_negative("typed_count", row.try_get("typed_count")?)?;

    let visit_time = last_visit.and_then(from_source_epoch);

    Ok(VisitRecord::new(url, title, visit_time, visit_count, typed_count))
}

fn non_negative(column: &'static str, value: Option<i64>) -> Result<u64, RowError> {
    let value = value.unwrap_or(0);
    u64::try_from(value).map_err(|_| RowError::NegativeCount { column, value })
}
