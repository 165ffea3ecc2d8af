use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::analytics::{fallback_payload, format_dashboard, MetricsSnapshot};
use crate::config::{CollectionConfig, Config};
use crate::models::{days_before, DashboardPayload};
use crate::source::{HistoryInfo, SourceReader};
use crate::storage::{BackendInfo, MetricsStore};

use super::state::{CollectionState, Phase};

/// What one collection cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub extracted: usize,
    pub written: bool,
    pub removed: u64,
    pub collected_at: Option<DateTime<Utc>>,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            extracted: 0,
            written: false,
            removed: 0,
            collected_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub data_collection_running: bool,
    pub last_collection_time: Option<DateTime<Utc>>,
    /// Whether the durable metrics backend is connected
    pub influxdb_connected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryAccessReport {
    pub access_test: bool,
    pub info: HistoryInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub chrome_history: HistoryAccessReport,
    pub influxdb: Option<BackendInfo>,
    pub timestamp: DateTime<Utc>,
}

/// Everything a cycle or a dashboard read needs, shared with spawned tasks.
struct Collector {
    reader: SourceReader,
    store: MetricsStore,
    state: CollectionState,
    config: CollectionConfig,
    /// Held for the duration of a cycle so on-demand and periodic cycles
    /// never overlap
    cycle_lock: Mutex<()>,
}

impl Collector {
    async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;

        let now = Utc::now();
        let window_start = days_before(now, self.config.window_days);
        let records = self.reader.extract(window_start).await;

        if records.is_empty() {
            info!("No history records in the collection window, skipping cycle");
            return CycleReport::skipped();
        }

        let written = self.store.write(&records).await;
        if !written {
            warn!(records = records.len(), "Visit points were not stored");
        }
        self.state.mark_collected(now);

        let removed = self.store.cleanup(self.config.retention_days).await;

        info!(
            extracted = records.len(),
            written,
            removed,
            "Collection cycle finished"
        );

        CycleReport {
            extracted: records.len(),
            written,
            removed,
            collected_at: Some(now),
        }
    }

    async fn build_dashboard(&self, days: u32) -> DashboardPayload {
        let now = Utc::now();

        let snapshot = self.store.snapshot(days).await;
        if !snapshot.is_empty() {
            return format_dashboard(&snapshot, now);
        }

        debug!(days, "Metrics store has no data for the window, reading history directly");
        let records = self
            .reader
            .extract(days_before(now, days))
            .await;
        if records.is_empty() {
            info!("No browsing data available, serving fallback dashboard");
            return fallback_payload();
        }

        format_dashboard(&MetricsSnapshot::from_records(&records), now)
    }
}

/// Runs collection cycles in the background and answers dashboard reads.
pub struct CollectionScheduler {
    inner: Arc<Collector>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CollectionScheduler {
    pub fn new(reader: SourceReader, store: MetricsStore, config: CollectionConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Collector {
                reader,
                store,
                state: CollectionState::new(),
                config,
                cycle_lock: Mutex::new(()),
            }),
            shutdown_tx,
            worker: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SourceReader::new(&config.source),
            MetricsStore::new(config.store.clone()),
            config.collection.clone(),
        )
    }

    pub fn store(&self) -> &MetricsStore {
        &self.inner.store
    }

    pub fn reader(&self) -> &SourceReader {
        &self.inner.reader
    }

    pub fn state(&self) -> &CollectionState {
        &self.inner.state
    }

    /// Connect the store, run one cycle inline, then keep collecting in the
    /// background. Does nothing unless stopped.
    pub async fn start(&self) {
        if !self.inner.state.begin_start() {
            debug!("Collection already started");
            return;
        }

        info!(
            interval_secs = self.inner.config.interval_secs,
            window_days = self.inner.config.window_days,
            "Starting data collection"
        );

        if !self.inner.store.connect().await {
            warn!("Metrics backend not connected, collecting into process memory");
        }

        if let Err(e) = spawn_cycle(&self.inner).await {
            error!("Initial collection cycle panicked: {}", e);
        }

        if !self.inner.state.finish_start() {
            info!("Collection stopped while starting");
            return;
        }

        self.shutdown_tx.send_replace(false);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(collection_loop(Arc::clone(&self.inner), shutdown_rx));
        *self.worker.lock().await = Some(handle);
    }

    /// Stop the background loop and close the store. Safe to call repeatedly.
    pub async fn stop(&self) {
        let previous = self.inner.state.stop();
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = self.worker.lock().await.take() {
            let timeout = Duration::from_secs(self.inner.config.stop_timeout_secs);
            match time::timeout(timeout, handle).await {
                Ok(Ok(())) => debug!("Collection loop exited"),
                Ok(Err(e)) => error!("Collection loop ended abnormally: {}", e),
                Err(_) => warn!(
                    timeout_secs = timeout.as_secs(),
                    "Collection loop still busy, leaving it to finish on its own"
                ),
            }
        }

        self.inner.store.close().await;
        if previous != Phase::Stopped {
            info!("Data collection stopped");
        }
    }

    /// Run one cycle now. An error means the cycle panicked.
    pub async fn force_refresh(&self) -> Result<CycleReport, JoinError> {
        info!("Manual refresh requested");
        spawn_cycle(&self.inner).await
    }

    /// Dashboard for the last `days` days. Never fails; a panic while
    /// building it yields the fallback payload.
    pub async fn dashboard(&self, days: u32) -> DashboardPayload {
        let collector = Arc::clone(&self.inner);
        match tokio::spawn(async move { collector.build_dashboard(days).await }).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Building the dashboard panicked: {}", e);
                fallback_payload()
            }
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            data_collection_running: self.inner.state.is_running(),
            last_collection_time: self.inner.state.last_collection_time(),
            influxdb_connected: self.inner.store.is_connected(),
        }
    }

    pub async fn chrome_test(&self) -> DiagnosticsReport {
        let access_test = match self.inner.reader.probe().await {
            Ok(probe) => {
                debug!(path = %probe.path.display(), total_urls = probe.total_urls, "History probe");
                true
            }
            Err(e) => {
                warn!(error = %e, "History access test failed");
                false
            }
        };
        let info = self
            .inner
            .reader
            .history_info(self.inner.state.last_collection_time())
            .await;

        DiagnosticsReport {
            chrome_history: HistoryAccessReport { access_test, info },
            influxdb: self.inner.store.info().await,
            timestamp: Utc::now(),
        }
    }
}

async fn spawn_cycle(collector: &Arc<Collector>) -> Result<CycleReport, JoinError> {
    let collector = Arc::clone(collector);
    tokio::spawn(async move { collector.run_cycle().await }).await
}

async fn collection_loop(collector: Arc<Collector>, mut shutdown_rx: watch::Receiver<bool>) {
    let interval = Duration::from_secs(collector.config.interval_secs);
    let retry = Duration::from_secs(collector.config.retry_backoff_secs);
    let mut delay = interval;

    loop {
        tokio::select! {
            _ = time::sleep(delay) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        if !collector.state.is_running() {
            break;
        }

        delay = match spawn_cycle(&collector).await {
            Ok(_) => interval,
            Err(e) => {
                error!(
                    retry_secs = retry.as_secs(),
                    "Collection cycle panicked: {}", e
                );
                retry
            }
        };
    }

    debug!("Collection loop finished");
}
