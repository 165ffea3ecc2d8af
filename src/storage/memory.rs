use crate::analytics::summary;
use crate::models::{Category, DomainStat, VisitRecord};
use crate::storage::{MetricsBackend, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Process-local point store used while no durable backend is connected.
///
/// Points do not survive a restart.
#[derive(Default)]
pub struct MemoryBackend {
    points: DashMap<(String, i64), VisitRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn window(&self, since: DateTime<Utc>) -> Vec<VisitRecord> {
        self.points
            .iter()
            .filter(|entry| entry.value().visit_time.is_some_and(|t| t >= since))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl MetricsBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn write_points(&self, records: &[VisitRecord]) -> StoreResult<u64> {
        let mut written = 0u64;
        for record in records {
            let Some(visit_time) = record.visit_time else {
                continue;
            };
            self.points
                .insert((record.url.clone(), visit_time.timestamp()), record.clone());
            written += 1;
        }
        Ok(written)
    }

    async fn domain_stats(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<DomainStat>> {
        let mut stats = summary::domain_stats(&self.window(since));
        stats.truncate(limit);
        Ok(stats)
    }

    async fn visited_urls(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let mut points = self.window(since);
        points.sort_by(|a, b| b.visit_time.cmp(&a.visit_time));
        Ok(points.into_iter().map(|p| p.url).collect())
    }

    async fn category_counts(&self, since: DateTime<Utc>) -> StoreResult<BTreeMap<Category, u64>> {
        Ok(summary::category_counts(&self.window(since)))
    }

    async fn hourly_counts(&self, since: DateTime<Utc>) -> StoreResult<BTreeMap<String, u64>> {
        Ok(summary::hourly_activity(&self.window(since)))
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.points.len();
        self.points
            .retain(|_, point| point.visit_time.is_some_and(|t| t >= cutoff));
        Ok((before - self.points.len()) as u64)
    }

    async fn point_count(&self) -> StoreResult<u64> {
        Ok(self.points.len() as u64)
    }

    async fn close(&self) {}
}
