//! Browsing analytics module
//!
//! Folds visit records into metric families and shapes those metrics into
//! the dashboard payload. Nothing here performs I/O.

pub mod aggregator;
pub mod models;
pub mod search;
pub mod summary;

pub use aggregator::{fallback_payload, format_dashboard, MINUTES_PER_VISIT};
pub use models::{MetricsSnapshot, LOCAL_SEARCH_LIMIT};
pub use search::{count_search_queries, extract_search_query};
