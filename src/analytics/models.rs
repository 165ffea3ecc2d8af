//! Data models for analytics

use std::collections::BTreeMap;

use crate::models::{Category, DomainStat, SearchQueryStat, VisitRecord};

use super::search::count_search_queries;
use super::summary;

/// How many search queries a local summary keeps.
pub const LOCAL_SEARCH_LIMIT: usize = 20;

/// The four metric families the dashboard is built from, whether they came
/// from the metrics store or from a fresh extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Sorted by visit count, highest first
    pub domains: Vec<DomainStat>,
    /// Sorted by count, highest first
    pub searches: Vec<SearchQueryStat>,
    pub categories: BTreeMap<Category, u64>,
    /// UTC hour ("0".."23") to visit count
    pub hourly: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Summarize one extraction batch in-process.
    pub fn from_records(records: &[VisitRecord]) -> Self {
        Self {
            domains: summary::domain_stats(records),
            searches: count_search_queries(
                records.iter().map(|r| r.url.as_str()),
                LOCAL_SEARCH_LIMIT,
            ),
            categories: summary::category_counts(records),
            hourly: summary::hourly_activity(records),
        }
    }

    /// Nothing usable for a dashboard: no domains and no searches.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.searches.is_empty()
    }
}
