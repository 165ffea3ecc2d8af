//! Browser history source

pub mod error;
pub mod reader;

pub use error::{RowError, SourceError};
pub use reader::{
    default_history_paths, AccessProbe, Extraction, ExtractionReport, HistoryInfo, SourceReader,
};
