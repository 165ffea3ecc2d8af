use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::category::{categorize, Category};

/// Seconds between 1601-01-01 (the history file's epoch) and 1970-01-01.
pub const SOURCE_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

const MICROS_PER_SEC: i64 = 1_000_000;

/// One browsing event read from the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub url: String,
    pub title: Option<String>,
    /// Host of `url` without a leading `www.`, or `"unknown"`
    pub domain: String,
    pub visit_time: Option<DateTime<Utc>>,
    /// Cumulative count as reported by the browser
    pub visit_count: u64,
    pub typed_count: u64,
    pub category: Category,
}

impl VisitRecord {
    /// Build a record, deriving `domain` and `category` from the URL.
    pub fn new(
        url: impl Into<String>,
        title: Option<String>,
        visit_time: Option<DateTime<Utc>>,
        visit_count: u64,
        typed_count: u64,
    ) -> Self {
        let url = url.into();
        let domain = domain_of(&url);
        let category = categorize(&url, title.as_deref());

        Self {
            url,
            title,
            domain,
            visit_time,
            visit_count,
            typed_count,
            category,
        }
    }
}

/// Per-domain aggregate over a query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStat {
    pub domain: String,
    pub visit_count: u64,
    /// Category of the most recent visit
    pub category: Category,
    pub last_visit: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQueryStat {
    pub query: String,
    pub count: u64,
}

/// Extract the host of a URL with any leading `www.` removed.
///
/// Never returns an empty string: unparsable or host-less URLs yield
/// `"unknown"`.
pub fn domain_of(raw: &str) -> String {
    let host = url::Url::parse(raw)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_owned));

    match host {
        Some(host) => {
            let host = host.strip_prefix("www.").unwrap_or(&host);
            if host.is_empty() {
                "unknown".to_string()
            } else {
                host.to_string()
            }
        }
        None => "unknown".to_string(),
    }
}

/// Convert a history timestamp (microseconds since 1601-01-01) to UTC.
///
/// Zero means "never visited" and maps to `None`, as do values outside the
/// range chrono can represent.
pub fn from_source_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw == 0 {
        return None;
    }
    let unix_micros = raw.checked_sub(SOURCE_EPOCH_OFFSET_SECS * MICROS_PER_SEC)?;
    DateTime::from_timestamp_micros(unix_micros)
}

/// Inverse of [`from_source_epoch`].
pub fn to_source_epoch(time: DateTime<Utc>) -> i64 {
    time.timestamp_micros()
        .saturating_add(SOURCE_EPOCH_OFFSET_SECS * MICROS_PER_SEC)
}

/// Start of a window reaching `days` back from `now`, clamped to the
/// earliest representable instant.
pub fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
