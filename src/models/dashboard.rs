//! Response shapes served by the dashboard API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub top_domains: Vec<TopDomain>,
    pub top_searches: Vec<TopSearch>,
    pub focus: Focus,
    /// Hour of day ("8".."17") to estimated minutes
    pub golden_hours: BTreeMap<String, u64>,
    pub sessions: Vec<Session>,
    pub trends: Trends,
    pub chains: Vec<Vec<String>>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopDomain {
    pub domain: String,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSearch {
    pub q: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Focus {
    pub docs_min: u64,
    pub social_min: u64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// UTC, minute resolution: `%Y-%m-%dT%H:%M`
    pub start: String,
    pub duration_min: u64,
    pub dominant: String,
    pub path: Vec<String>,
}

/// Period-over-period deltas. No historical comparison is computed, so all
/// three are always zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trends {
    pub docs_min_delta_pct: i64,
    pub social_min_delta_pct: i64,
    pub search_count_delta_pct: i64,
}
