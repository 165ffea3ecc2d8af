//! Dashboard aggregation
//!
//! Turns a [`MetricsSnapshot`] into the fixed [`DashboardPayload`] shape.
//! Everything here is pure: the only clock input is the `now` argument,
//! which anchors the session start offsets.
//!
//! Minutes are estimates (two minutes per visit), not measured dwell time.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use super::models::MetricsSnapshot;
use crate::models::{
    Category, DashboardPayload, DomainStat, Focus, Session, TopDomain, TopSearch, Trends,
};

/// Assumed time spent per recorded visit.
pub const MINUTES_PER_VISIT: u64 = 2;

pub const TOP_DOMAINS: usize = 10;
pub const TOP_SEARCHES: usize = 10;
pub const MAX_SESSIONS: usize = 5;
pub const MAX_CHAINS: usize = 5;
pub const MAX_INTERESTS: usize = 10;

/// Interests are the leading search queries.
const INTEREST_SEARCHES: usize = 5;

/// Working hours reported in `golden_hours`, inclusive.
pub const GOLDEN_HOURS: std::ops::RangeInclusive<u32> = 8..=17;

const SESSION_START_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Placeholder session templates, gated on which domains were seen.
/// Not derived from visit timing.
struct SessionTemplate {
    hours_ago: i64,
    duration_min: u64,
    dominant: &'static str,
    path: &'static [&'static str],
}

const DEVELOPMENT_SESSION: SessionTemplate = SessionTemplate {
    hours_ago: 2,
    duration_min: 45,
    dominant: "development",
    path: &["github", "stackoverflow", "docs"],
};

const RESEARCH_SESSION: SessionTemplate = SessionTemplate {
    hours_ago: 4,
    duration_min: 30,
    dominant: "research",
    path: &["google", "stackoverflow", "github"],
};

const BROWSING_SESSION: SessionTemplate = SessionTemplate {
    hours_ago: 6,
    duration_min: 25,
    dominant: "browsing",
    path: &["reddit", "news", "social"],
};

/// More distinct domains than this adds the generic browsing session.
const BROWSING_DOMAIN_THRESHOLD: usize = 5;

/// Canned interest chains, keyed by the domain that enables them.
const CHAIN_TEMPLATES: &[(&str, &[&str])] = &[
    ("github.com", &["google", "stackoverflow", "github", "docs"]),
    ("google.com", &["google", "stackoverflow", "github"]),
    ("reddit.com", &["google", "reddit", "social"]),
];

fn seen(domains: &[DomainStat], needle: &str) -> bool {
    domains.iter().any(|stat| stat.domain.contains(needle))
}

fn owned_path(path: &[&str]) -> Vec<String> {
    path.iter().map(|step| step.to_string()).collect()
}

impl SessionTemplate {
    fn instantiate(&self, now: DateTime<Utc>) -> Session {
        Session {
            start: (now - Duration::hours(self.hours_ago))
                .format(SESSION_START_FORMAT)
                .to_string(),
            duration_min: self.duration_min,
            dominant: self.dominant.to_string(),
            path: owned_path(self.path),
        }
    }
}

/// Minutes for `visits`, pinned at `u64::MAX` for absurd counts.
fn estimated_minutes(visits: u64) -> u64 {
    visits.saturating_mul(MINUTES_PER_VISIT)
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn focus(categories: &BTreeMap<Category, u64>) -> Focus {
    let docs_min = estimated_minutes(categories.get(&Category::Documentation).copied().unwrap_or(0));
    let social_min = estimated_minutes(categories.get(&Category::Social).copied().unwrap_or(0));

    // minutes may be saturated, so sum in f64
    let total = docs_min as f64 + social_min as f64;
    let score = if total == 0.0 {
        0.0
    } else {
        round2(docs_min as f64 / total)
    };

    Focus {
        docs_min,
        social_min,
        score,
    }
}

/// Always exactly the keys "8".."17"; other hours are dropped.
pub fn golden_hours(hourly: &BTreeMap<String, u64>) -> BTreeMap<String, u64> {
    GOLDEN_HOURS
        .map(|hour| {
            let key = hour.to_string();
            let minutes = estimated_minutes(hourly.get(&key).copied().unwrap_or(0));
            (key, minutes)
        })
        .collect()
}

pub fn sessions(domains: &[DomainStat], now: DateTime<Utc>) -> Vec<Session> {
    let mut sessions = Vec::new();

    if seen(domains, "github.com") {
        sessions.push(DEVELOPMENT_SESSION.instantiate(now));
    }
    if seen(domains, "google.com") {
        sessions.push(RESEARCH_SESSION.instantiate(now));
    }
    if domains.len() > BROWSING_DOMAIN_THRESHOLD {
        sessions.push(BROWSING_SESSION.instantiate(now));
    }

    sessions.truncate(MAX_SESSIONS);
    sessions
}

pub fn chains(domains: &[DomainStat]) -> Vec<Vec<String>> {
    CHAIN_TEMPLATES
        .iter()
        .filter(|(domain, _)| seen(domains, domain))
        .map(|(_, path)| owned_path(path))
        .take(MAX_CHAINS)
        .collect()
}

/// Build the dashboard payload. Empty inputs give a zeroed payload, not the
/// static fallback.
pub fn format_dashboard(snapshot: &MetricsSnapshot, now: DateTime<Utc>) -> DashboardPayload {
    let top_domains = snapshot
        .domains
        .iter()
        .take(TOP_DOMAINS)
        .map(|stat| TopDomain {
            domain: stat.domain.clone(),
            minutes: estimated_minutes(stat.visit_count),
        })
        .collect();

    let top_searches = snapshot
        .searches
        .iter()
        .take(TOP_SEARCHES)
        .map(|stat| TopSearch {
            q: stat.query.clone(),
            count: stat.count,
        })
        .collect();

    let interests = snapshot
        .searches
        .iter()
        .take(INTEREST_SEARCHES.min(MAX_INTERESTS))
        .map(|stat| stat.query.clone())
        .collect();

    DashboardPayload {
        top_domains,
        top_searches,
        focus: focus(&snapshot.categories),
        golden_hours: golden_hours(&snapshot.hourly),
        sessions: sessions(&snapshot.domains, now),
        trends: Trends::default(),
        chains: chains(&snapshot.domains),
        interests,
    }
}

/// Static payload served when no source produced any data.
pub fn fallback_payload() -> DashboardPayload {
    let golden_hours = [
        (8, 10),
        (9, 15),
        (10, 20),
        (11, 25),
        (12, 15),
        (13, 10),
        (14, 20),
        (15, 15),
        (16, 20),
        (17, 10),
    ]
    .into_iter()
    .map(|(hour, minutes): (u32, u64)| (hour.to_string(), minutes))
    .collect();

    DashboardPayload {
        top_domains: vec![
            TopDomain {
                domain: "github.com".to_string(),
                minutes: 30,
            },
            TopDomain {
                domain: "stackoverflow.com".to_string(),
                minutes: 20,
            },
            TopDomain {
                domain: "google.com".to_string(),
                minutes: 15,
            },
        ],
        top_searches: vec![
            TopSearch {
                q: "python tutorial".to_string(),
                count: 2,
            },
            TopSearch {
                q: "react components".to_string(),
                count: 1,
            },
        ],
        focus: Focus {
            docs_min: 60,
            social_min: 20,
            score: 0.75,
        },
        golden_hours,
        sessions: vec![Session {
            start: "2025-01-20T10:00".to_string(),
            duration_min: 30,
            dominant: "development".to_string(),
            path: owned_path(&["google", "github", "docs"]),
        }],
        trends: Trends::default(),
        chains: vec![owned_path(&["google", "github", "docs"])],
        interests: owned_path(&["python", "react", "development"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchQueryStat, VisitRecord};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
    }

    fn stat(domain: &str, visit_count: u64) -> DomainStat {
        DomainStat {
            domain: domain.to_string(),
            visit_count,
            category: Category::Other,
            last_visit: None,
        }
    }

    #[test]
    fn test_top_domains_estimate_minutes() {
        let snapshot = MetricsSnapshot {
            domains: vec![stat("github.com", 3), stat("docs.rs", 1)],
            ..Default::default()
        };
        let payload = format_dashboard(&snapshot, now());
        assert_eq!(payload.top_domains[0].domain, "github.com");
        assert_eq!(payload.top_domains[0].minutes, 6);
        assert_eq!(payload.top_domains[1].minutes, 2);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let records: Vec<VisitRecord> = (0..3)
            .map(|i| {
                VisitRecord::new(
                    format!("https://github.com/{i}"),
                    None,
                    Some(now() - Duration::hours(i)),
                    i64::MAX as u64,
                    0,
                )
            })
            .collect();
        let mut snapshot = MetricsSnapshot::from_records(&records);
        snapshot.categories.insert(Category::Documentation, u64::MAX);
        snapshot.categories.insert(Category::Social, u64::MAX);
        snapshot.hourly.insert("9".to_string(), u64::MAX);

        let payload = format_dashboard(&snapshot, now());
        assert_eq!(payload.top_domains[0].domain, "github.com");
        assert_eq!(payload.top_domains[0].minutes, u64::MAX);
        assert_eq!(payload.focus.docs_min, u64::MAX);
        assert_eq!(payload.focus.score, 0.5);
        assert_eq!(payload.golden_hours.get("9"), Some(&u64::MAX));
    }

    #[test]
    fn test_top_lists_capped() {
        let snapshot = MetricsSnapshot {
            domains: (0..25).map(|i| stat(&format!("d{i}.com"), 25 - i)).collect(),
            searches: (0..25)
                .map(|i| SearchQueryStat {
                    query: format!("query {i}"),
                    count: 1,
                })
                .collect(),
            ..Default::default()
        };
        let payload = format_dashboard(&snapshot, now());
        assert_eq!(payload.top_domains.len(), 10);
        assert_eq!(payload.top_searches.len(), 10);
        assert_eq!(payload.interests.len(), 5);
        assert_eq!(payload.interests[0], "query 0");
    }

    #[test]
    fn test_focus_zero_denominator() {
        let focus = focus(&BTreeMap::new());
        assert_eq!(focus.docs_min, 0);
        assert_eq!(focus.social_min, 0);
        assert_eq!(focus.score, 0.0);
    }

    #[test]
    fn test_focus_score_rounded() {
        let categories = BTreeMap::from([
            (Category::Documentation, 2),
            (Category::Social, 1),
            (Category::Search, 40),
        ]);
        let focus = focus(&categories);
        assert_eq!(focus.docs_min, 4);
        assert_eq!(focus.social_min, 2);
        assert_eq!(focus.score, 0.67);
    }

    #[test]
    fn test_golden_hours_fixed_keys() {
        let hourly = BTreeMap::from([
            ("3".to_string(), 50),
            ("8".to_string(), 2),
            ("17".to_string(), 1),
            ("18".to_string(), 9),
        ]);
        let hours = golden_hours(&hourly);
        let mut keys: Vec<u32> = hours.keys().map(|k| k.parse().unwrap()).collect();
        keys.sort_unstable();
        assert_eq!(keys, (8..=17).collect::<Vec<_>>());
        assert_eq!(hours["8"], 4);
        assert_eq!(hours["17"], 2);
        assert_eq!(hours["12"], 0);
    }

    #[test]
    fn test_sessions_and_chains_gated_by_domains() {
        let domains = vec![stat("github.com", 1), stat("google.com", 1)];
        let sessions = sessions(&domains, now());
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].dominant, "development");
        assert_eq!(sessions[0].start, "2024-05-10T13:30");
        assert_eq!(sessions[0].duration_min, 45);
        assert_eq!(sessions[1].dominant, "research");
        assert_eq!(sessions[1].start, "2024-05-10T11:30");

        let chains = chains(&domains);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0], vec!["google", "stackoverflow", "github", "docs"]);
    }

    #[test]
    fn test_browsing_session_needs_six_domains() {
        let five: Vec<_> = (0..5).map(|i| stat(&format!("d{i}.org"), 1)).collect();
        assert!(sessions(&five, now()).is_empty());

        let six: Vec<_> = (0..6).map(|i| stat(&format!("d{i}.org"), 1)).collect();
        let sessions = sessions(&six, now());
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].dominant, "browsing");
        assert_eq!(sessions[0].path, vec!["reddit", "news", "social"]);
    }

    #[test]
    fn test_empty_snapshot_is_zeroed_not_fallback() {
        let payload = format_dashboard(&MetricsSnapshot::default(), now());
        assert!(payload.top_domains.is_empty());
        assert!(payload.top_searches.is_empty());
        assert!(payload.sessions.is_empty());
        assert!(payload.chains.is_empty());
        assert!(payload.interests.is_empty());
        assert_eq!(payload.focus.score, 0.0);
        assert_eq!(payload.golden_hours.len(), 10);
        assert!(payload.golden_hours.values().all(|m| *m == 0));
        assert_ne!(payload, fallback_payload());
    }

    #[test]
    fn test_format_is_pure() {
        let snapshot = MetricsSnapshot {
            domains: vec![stat("github.com", 3), stat("reddit.com", 2)],
            searches: vec![SearchQueryStat {
                query: "rust ownership".to_string(),
                count: 1,
            }],
            categories: BTreeMap::from([(Category::Social, 2)]),
            hourly: BTreeMap::from([("9".to_string(), 3)]),
        };
        let first = serde_json::to_vec(&format_dashboard(&snapshot, now())).unwrap();
        let second = serde_json::to_vec(&format_dashboard(&snapshot, now())).unwrap();
        assert_eq!(first, second);

        let empty_a = serde_json::to_vec(&format_dashboard(&MetricsSnapshot::default(), now())).unwrap();
        let empty_b = serde_json::to_vec(&format_dashboard(&MetricsSnapshot::default(), now())).unwrap();
        assert_eq!(empty_a, empty_b);
    }

    #[test]
    fn test_trends_always_zero() {
        let payload = format_dashboard(&MetricsSnapshot::default(), now());
        assert_eq!(payload.trends, Trends::default());
        let json = serde_json::to_value(&payload.trends).unwrap();
        assert_eq!(json["docs_min_delta_pct"], 0);
        assert_eq!(json["social_min_delta_pct"], 0);
        assert_eq!(json["search_count_delta_pct"], 0);
    }

    #[test]
    fn test_fallback_shape() {
        let fallback = fallback_payload();
        assert_eq!(fallback.golden_hours.len(), 10);
        assert!(fallback.top_domains.len() <= TOP_DOMAINS);
        assert!(fallback.sessions.len() <= MAX_SESSIONS);
        let json = serde_json::to_value(&fallback).unwrap();
        for key in [
            "top_domains",
            "top_searches",
            "focus",
            "golden_hours",
            "sessions",
            "trends",
            "chains",
            "interests",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
