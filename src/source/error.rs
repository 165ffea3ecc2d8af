use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// None of the candidate paths holds a readable, non-empty history file
    #[error("no readable history file among {candidates} candidate paths")]
    Unavailable { candidates: usize },

    /// The snapshot could not be taken, after the raw-copy fallback if one applied
    #[error("failed to snapshot {}: {source}", path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
}

/// A single malformed `urls` row. Counted and skipped, never surfaced.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Decode(#[from] sqlx::Error),

    #[error("{column} is negative ({value})")]
    NegativeCount { column: &'static str, value: i64 },
}
