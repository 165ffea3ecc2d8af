use crate::analytics::{count_search_queries, MetricsSnapshot};
use crate::config::{StoreBackend, StoreConfig};
use crate::models::{days_before, Category, DomainStat, SearchQueryStat, VisitRecord};
use crate::storage::{MemoryBackend, MetricsBackend, PostgresBackend, SqliteBackend, StoreResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// How many rows the windowed domain and search queries return.
pub const QUERY_LIMIT: usize = 50;

/// Diagnostics for the connected durable backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub backend: &'static str,
    pub table: String,
    pub ping: bool,
    pub point_count: u64,
}

/// Fail-soft front over the metrics backends.
///
/// Reads and writes go to the durable backend while it is connected and to
/// the process-local [`MemoryBackend`] otherwise. No method here returns an
/// error; failures are logged and turned into empty results.
pub struct MetricsStore {
    config: StoreConfig,
    durable: RwLock<Option<Arc<dyn MetricsBackend>>>,
    connected: AtomicBool,
    local: Arc<MemoryBackend>,
}

impl MetricsStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            durable: RwLock::new(None),
            connected: AtomicBool::new(false),
            local: Arc::new(MemoryBackend::new()),
        }
    }

    /// Use `backend` as the durable backend instead of building one from
    /// the configuration. It still has to pass `connect()`.
    pub fn with_backend(config: StoreConfig, backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            durable: RwLock::new(Some(backend)),
            ..Self::new(config)
        }
    }

    async fn build(&self) -> StoreResult<Option<Arc<dyn MetricsBackend>>> {
        let config = &self.config;
        let backend: Arc<dyn MetricsBackend> = match config.backend {
            StoreBackend::Memory => return Ok(None),
            StoreBackend::Sqlite => Arc::new(
                SqliteBackend::new(&config.url, config.max_connections, &config.table).await?,
            ),
            StoreBackend::Postgres => Arc::new(
                PostgresBackend::new(&config.url, config.max_connections, &config.table).await?,
            ),
        };
        Ok(Some(backend))
    }

    /// Connect to the durable backend and provision its table.
    ///
    /// Returns whether the store is now connected. Calling it again once
    /// connected is a no-op.
    pub async fn connect(&self) -> bool {
        if self.is_connected() {
            return true;
        }

        let mut slot = self.durable.write().await;
        let (backend, built) = match slot.as_ref() {
            Some(backend) => (Arc::clone(backend), false),
            None => match self.build().await {
                Ok(Some(backend)) => (backend, true),
                Ok(None) => {
                    tracing::info!("Metrics store running in memory only");
                    return false;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to {} metrics backend: {}",
                        self.config.backend.as_str(),
                        e
                    );
                    return false;
                }
            },
        };

        let provisioned = async {
            backend.init().await?;
            backend.ping().await
        }
        .await;

        if let Err(e) = provisioned {
            tracing::error!(
                "Failed to provision {} metrics table '{}': {}",
                backend.kind(),
                self.config.table,
                e
            );
            if built {
                backend.close().await;
            }
            return false;
        }

        tracing::info!(
            "Connected to {} metrics backend, table '{}'",
            backend.kind(),
            self.config.table
        );
        *slot = Some(backend);
        self.connected.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Name of the backend reads and writes currently go to.
    pub async fn backend_kind(&self) -> &'static str {
        self.active().await.kind()
    }

    async fn active(&self) -> Arc<dyn MetricsBackend> {
        if self.is_connected() {
            if let Some(backend) = self.durable.read().await.as_ref() {
                return Arc::clone(backend);
            }
        }
        self.local.clone()
    }

    /// Store every timed record of the batch. Returns false if the write
    /// failed.
    pub async fn write(&self, records: &[VisitRecord]) -> bool {
        let backend = self.active().await;
        match backend.write_points(records).await {
            Ok(written) => {
                tracing::debug!(
                    backend = backend.kind(),
                    written,
                    skipped = records.len() as u64 - written,
                    "Wrote visit points"
                );
                true
            }
            Err(e) => {
                tracing::error!("Failed to write visit points to {}: {}", backend.kind(), e);
                false
            }
        }
    }

    pub async fn query_domain_stats(&self, window_days: u32) -> Vec<DomainStat> {
        let backend = self.active().await;
        backend
            .domain_stats(window_start(window_days), QUERY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Domain stats query failed: {}", e);
                Vec::new()
            })
    }

    pub async fn query_search_queries(&self, window_days: u32) -> Vec<SearchQueryStat> {
        let backend = self.active().await;
        match backend.visited_urls(window_start(window_days)).await {
            Ok(urls) => count_search_queries(urls.iter().map(String::as_str), QUERY_LIMIT),
            Err(e) => {
                tracing::error!("Search query lookup failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn query_category_stats(&self, window_days: u32) -> BTreeMap<Category, u64> {
        let backend = self.active().await;
        backend
            .category_counts(window_start(window_days))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Category stats query failed: {}", e);
                BTreeMap::new()
            })
    }

    pub async fn query_hourly_activity(&self, window_days: u32) -> BTreeMap<String, u64> {
        let backend = self.active().await;
        backend
            .hourly_counts(window_start(window_days))
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Hourly activity query failed: {}", e);
                BTreeMap::new()
            })
    }

    /// All four metric families for the window.
    pub async fn snapshot(&self, window_days: u32) -> MetricsSnapshot {
        let (domains, searches, categories, hourly) = tokio::join!(
            self.query_domain_stats(window_days),
            self.query_search_queries(window_days),
            self.query_category_stats(window_days),
            self.query_hourly_activity(window_days),
        );

        MetricsSnapshot {
            domains,
            searches,
            categories,
            hourly,
        }
    }

    /// Delete points older than the retention window. Returns how many were
    /// removed, 0 on failure.
    pub async fn cleanup(&self, retention_days: u32) -> u64 {
        let backend = self.active().await;
        match backend.delete_before(window_start(retention_days)).await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::info!(
                        "Removed {} visit points older than {} days",
                        removed,
                        retention_days
                    );
                }
                removed
            }
            Err(e) => {
                tracing::error!("Retention cleanup failed: {}", e);
                0
            }
        }
    }

    /// Diagnostics for the durable backend, `None` while disconnected.
    pub async fn info(&self) -> Option<BackendInfo> {
        if !self.is_connected() {
            return None;
        }
        let backend = self.durable.read().await.as_ref().map(Arc::clone)?;

        Some(BackendInfo {
            backend: backend.kind(),
            table: self.config.table.clone(),
            ping: backend.ping().await.is_ok(),
            point_count: backend.point_count().await.unwrap_or(0),
        })
    }

    /// Close the durable backend. Safe to call more than once.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(backend) = self.durable.write().await.take() {
            backend.close().await;
            tracing::info!("Closed {} metrics backend", backend.kind());
        }
    }
}

fn window_start(days: u32) -> DateTime<Utc> {
    days_before(Utc::now(), days)
}
