use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Stopped = 0,
    Starting = 1,
    Running = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Starting,
            2 => Phase::Running,
            _ => Phase::Stopped,
        }
    }
}

const NEVER: i64 = i64::MIN;

/// Scheduler lifecycle and the time of the last successful collection.
///
/// Readers never block on the collector: every field is a single atomic.
#[derive(Debug)]
pub struct CollectionState {
    phase: AtomicU8,
    last_collection_micros: AtomicI64,
}

impl Default for CollectionState {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Stopped as u8),
            last_collection_micros: AtomicI64::new(NEVER),
        }
    }
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Move `Stopped -> Starting`. False if the scheduler was not stopped.
    pub fn begin_start(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Stopped as u8,
                Phase::Starting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move `Starting -> Running`. False if a stop happened in between.
    pub fn finish_start(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Starting as u8,
                Phase::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Set `Stopped`, returning the phase it replaced.
    pub fn stop(&self) -> Phase {
        Phase::from_u8(self.phase.swap(Phase::Stopped as u8, Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn last_collection_time(&self) -> Option<DateTime<Utc>> {
        match self.last_collection_micros.load(Ordering::SeqCst) {
            NEVER => None,
            micros => DateTime::from_timestamp_micros(micros),
        }
    }

    pub fn mark_collected(&self, at: DateTime<Utc>) {
        self.last_collection_micros
            .store(at.timestamp_micros(), Ordering::SeqCst);
    }
}
