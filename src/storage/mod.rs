//! Storage interfaces and implementations for persisting market ticks.

mod sqlite;

pub use sqlite::{SqliteStorage, SqliteStorageConfig};

use crate::domain::Ticker;
use async_trait::async_trait;

/// TickStorage defines the interface for storing ticker snapshots.
#[async_trait]
pub trait TickStorage: Send + Sync {
    /// Save persists a ticker.
    /// Returns true if the ticker was saved (new), false if the pair already has one at that timestamp.
    async fn save(&self, ticker: &Ticker) -> Result<bool, StorageError>;

    /// GetRange retrieves tickers for a pair with `from <= timestamp <= to`, oldest first.
    async fn get_range(&self, pair: &str, from: i64, to: i64) -> Result<Vec<Ticker>, StorageError>;

    /// Count returns the total number of stored tickers.
    async fn count(&self) -> Result<i64, StorageError>;

    /// Close closes the storage connection.
    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
