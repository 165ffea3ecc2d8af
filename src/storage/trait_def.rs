use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{Category, DomainStat, VisitRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connecting or provisioning failed
    #[error("metrics backend unreachable: {0}")]
    BackendUnreachable(#[source] sqlx::Error),
    #[error("metrics query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
    #[error("invalid metrics store configuration: {0}")]
    InvalidConfig(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One place visit points can live.
///
/// A point is keyed by `(url, visit_time)`; writing the same key again
/// replaces the earlier point. Window queries include points at or after
/// `since`.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Short name shown in diagnostics
    fn kind(&self) -> &'static str;

    /// Create the points table if missing. Safe to call repeatedly.
    async fn init(&self) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;

    /// Upsert every record that has a visit time, returning how many were written
    async fn write_points(&self, records: &[VisitRecord]) -> StoreResult<u64>;

    /// Per-domain totals, highest visit count first
    async fn domain_stats(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<DomainStat>>;

    /// URL of every point in the window, one entry per point
    async fn visited_urls(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>>;

    async fn category_counts(&self, since: DateTime<Utc>) -> StoreResult<BTreeMap<Category, u64>>;

    /// Point count per UTC hour of day, keyed "0".."23"
    async fn hourly_counts(&self, since: DateTime<Utc>) -> StoreResult<BTreeMap<String, u64>>;

    /// Remove points older than `cutoff`, returning how many were removed
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    async fn point_count(&self) -> StoreResult<u64>;

    async fn close(&self);
}

/// Stored counts are non-negative; clamp anything odd coming back from SQL.
pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub(crate) fn to_sql_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Fold `(label, count)` rows into category totals.
pub(crate) fn fold_categories<I>(rows: I) -> BTreeMap<Category, u64>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut counts = BTreeMap::new();
    for (label, count) in rows {
        let total = counts.entry(Category::from(label.as_str())).or_insert(0u64);
        *total = total.saturating_add(to_count(count));
    }
    counts
}

/// Row shape of the per-domain query, shared by the SQL backends.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DomainRow {
    pub domain: String,
    pub visit_count: i64,
    pub last_visit: i64,
    pub category: Option<String>,
}

impl DomainRow {
    pub fn into_stat(self) -> DomainStat {
        DomainStat {
            domain: self.domain,
            visit_count: to_count(self.visit_count),
            category: self
                .category
                .as_deref()
                .map(Category::from)
                .unwrap_or(Category::Other),
            last_visit: DateTime::from_timestamp(self.last_visit, 0),
        }
    }
}
