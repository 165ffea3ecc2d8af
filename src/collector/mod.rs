//! Periodic collection from the history source into the metrics store

pub mod scheduler;
pub mod state;

pub use scheduler::{
    CollectionScheduler, CycleReport, DiagnosticsReport, HistoryAccessReport, StatusReport,
};
pub use state::{CollectionState, Phase};
