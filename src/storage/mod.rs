pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod store;
pub mod trait_def;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;
pub use store::{BackendInfo, MetricsStore, QUERY_LIMIT};
pub use trait_def::{MetricsBackend, StoreError, StoreResult};
