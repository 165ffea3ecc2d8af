use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_server: ServerConfig,
    pub frontend: FrontendConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub collection: CollectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing the built dashboard frontend
    /// If None, only the API is served
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Checked before the built-in profile locations, in order
    pub extra_paths: Vec<PathBuf>,
    /// When false, only `extra_paths` are probed
    pub include_default_paths: bool,
    /// Where private snapshots of the history file are created
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub max_connections: u32,
    /// Table holding visit points
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub interval_secs: u64,
    pub retry_backoff_secs: u64,
    pub window_days: u32,
    pub retention_days: u32,
    pub stop_timeout_secs: u64,
}

impl StoreBackend {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

impl StoreConfig {
    const fn default_max_connections() -> u32 {
        5
    }

    fn default_table() -> String {
        "chrome_history".to_string()
    }

    /// In-memory only, used by tests and the `memory` backend.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: String::new(),
            max_connections: Self::default_max_connections(),
            table: Self::default_table(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            retry_backoff_secs: 60,
            window_days: 7,
            retention_days: 30,
            stop_timeout_secs: 5,
        }
    }
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = env_parse::<u16>("API_PORT", 8000)?;

        let frontend_static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();

        let extra_paths = std::env::var("CHROME_HISTORY_PATHS")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect::<Vec<_>>();
        let include_default_paths = env_flag("CHROME_HISTORY_DEFAULTS", true);
        let temp_dir = std::env::var("HISTORY_TEMP_DIR").ok().map(PathBuf::from);

        let backend_str = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" | "none" => StoreBackend::Memory,
            "sqlite" => StoreBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown STORE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres, memory"
                );
                StoreBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./youknow.db".to_string());
        let max_connections = env_parse::<u32>(
            "DATABASE_MAX_CONNECTIONS",
            StoreConfig::default_max_connections(),
        )?;

        let table = std::env::var("METRICS_TABLE").unwrap_or_else(|_| StoreConfig::default_table());
        if !is_valid_table_name(&table) {
            anyhow::bail!("METRICS_TABLE must be a plain SQL identifier, got '{table}'");
        }

        let defaults = CollectionConfig::default();
        let collection = CollectionConfig {
            interval_secs: env_parse("COLLECTION_INTERVAL_SECS", defaults.interval_secs)?,
            retry_backoff_secs: env_parse("COLLECTION_RETRY_SECS", defaults.retry_backoff_secs)?,
            window_days: env_parse("COLLECTION_WINDOW_DAYS", defaults.window_days)?,
            retention_days: env_parse("RETENTION_DAYS", defaults.retention_days)?,
            stop_timeout_secs: defaults.stop_timeout_secs,
        };

        if collection.interval_secs == 0 {
            anyhow::bail!("COLLECTION_INTERVAL_SECS must be greater than zero");
        }

        Ok(Config {
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            frontend: FrontendConfig {
                static_dir: frontend_static_dir,
            },
            source: SourceConfig {
                extra_paths,
                include_default_paths,
                temp_dir,
            },
            store: StoreConfig {
                backend,
                url: database_url,
                max_connections,
                table,
            },
            collection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("chrome_history"));
        assert!(is_valid_table_name("_visits2"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2visits"));
        assert!(!is_valid_table_name("visits; DROP TABLE x"));
        assert!(!is_valid_table_name("my-table"));
    }

    #[test]
    fn test_collection_defaults() {
        let defaults = CollectionConfig::default();
        assert_eq!(defaults.interval_secs, 300);
        assert_eq!(defaults.retry_backoff_secs, 60);
        assert_eq!(defaults.window_days, 7);
        assert_eq!(defaults.retention_days, 30);
    }
}
