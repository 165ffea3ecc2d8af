//! Folds over visit records, shared by the local dashboard path and the
//! in-memory metrics backend.

use chrono::Timelike;
use std::collections::{BTreeMap, HashMap};

use crate::models::{Category, DomainStat, VisitRecord};

/// Sum visit counts per domain, most visited first (ties by domain name).
///
/// The category is taken from the most recent visit of each domain.
pub fn domain_stats<'a, I>(records: I) -> Vec<DomainStat>
where
    I: IntoIterator<Item = &'a VisitRecord>,
{
    let mut by_domain: HashMap<&str, DomainStat> = HashMap::new();

    for record in records {
        let stat = by_domain
            .entry(record.domain.as_str())
            .or_insert_with(|| DomainStat {
                domain: record.domain.clone(),
                visit_count: 0,
                category: record.category,
                last_visit: None,
            });

        stat.visit_count = stat.visit_count.saturating_add(record.visit_count);
        if record.visit_time > stat.last_visit {
            stat.last_visit = record.visit_time;
            stat.category = record.category;
        }
    }

    let mut stats: Vec<DomainStat> = by_domain.into_values().collect();
    stats.sort_by(|a, b| {
        b.visit_count
            .cmp(&a.visit_count)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    stats
}

/// One count per record, including records without a visit time.
pub fn category_counts<'a, I>(records: I) -> BTreeMap<Category, u64>
where
    I: IntoIterator<Item = &'a VisitRecord>,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.category).or_insert(0) += 1;
    }
    counts
}

/// Records per UTC hour of day; records without a visit time are skipped.
pub fn hourly_activity<'a, I>(records: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a VisitRecord>,
{
    let mut hours = BTreeMap::new();
    for time in records.into_iter().filter_map(|r| r.visit_time) {
        *hours.entry(time.hour().to_string()).or_insert(0) += 1;
    }
    hours
}
