//! Storage configuration.

use serde::Deserialize;

use crate::storage::SqliteStorageConfig;

/// Tick storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Whether polled tickers are recorded.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the SQLite database file.
    pub path: Option<String>,
    /// Connection pool size.
    pub max_connections: Option<u32>,
}

impl StorageConfig {
    pub fn sqlite(&self) -> SqliteStorageConfig {
        let defaults = SqliteStorageConfig::default();
        SqliteStorageConfig {
            path: self.path.clone().unwrap_or(defaults.path),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
        }
    }
}
