//! SQLite implementation of TickStorage.

use crate::domain::Ticker;
use crate::storage::{StorageError, TickStorage};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

/// SqliteStorage implements TickStorage using SQLite.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

/// SqliteStorageConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStorageConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            path: "ticks.db".to_string(),
            max_connections: 5,
        }
    }
}

impl SqliteStorage {
    /// Creates a new SQLite storage instance.
    pub async fn new(config: SqliteStorageConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };

        storage.migrate().await?;

        info!(path = %config.path, "SQLite storage initialized");
        Ok(storage)
    }

    /// Runs database migrations to create the schema.
    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tickers (
                pair TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                bid TEXT NOT NULL,
                ask TEXT NOT NULL,
                low TEXT NOT NULL,
                high TEXT NOT NULL,
                last TEXT NOT NULL,
                volume TEXT NOT NULL,
                volume_30d TEXT NOT NULL,
                price_change TEXT NOT NULL,
                price_change_percentage TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (pair, timestamp)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickers_timestamp ON tickers(timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TickStorage for SqliteStorage {
    async fn save(&self, ticker: &Ticker) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tickers (
                pair, timestamp, bid, ask, low, high, last, volume, volume_30d,
                price_change, price_change_percentage
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(pair, timestamp) DO NOTHING
            "#,
        )
        .bind(&ticker.pair)
        .bind(ticker.timestamp)
        .bind(ticker.bid.to_string())
        .bind(ticker.ask.to_string())
        .bind(ticker.low.to_string())
        .bind(ticker.high.to_string())
        .bind(ticker.last.to_string())
        .bind(ticker.volume.to_string())
        .bind(ticker.volume_30d.to_string())
        .bind(ticker.price_change.to_string())
        .bind(ticker.price_change_percentage.to_string())
        .execute(&self.pool)
        .await?;

        let rows_affected = result.rows_affected();

        if rows_affected > 0 {
            debug!(
                pair = %ticker.pair,
                timestamp = ticker.timestamp,
                "Ticker saved"
            );
        }

        Ok(rows_affected > 0)
    }

    async fn get_range(&self, pair: &str, from: i64, to: i64) -> Result<Vec<Ticker>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT pair, timestamp, bid, ask, low, high, last, volume, volume_30d,
                price_change, price_change_percentage
            FROM tickers
            WHERE pair = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(pair)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_ticker_row).collect()
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM tickers")
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

fn decimal_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, StorageError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
}

/// Parses a ticker from a database row.
fn parse_ticker_row(row: &sqlx::sqlite::SqliteRow) -> Result<Ticker, StorageError> {
    Ok(Ticker {
        bid: decimal_column(row, "bid")?,
        ask: decimal_column(row, "ask")?,
        low: decimal_column(row, "low")?,
        high: decimal_column(row, "high")?,
        last: decimal_column(row, "last")?,
        volume: decimal_column(row, "volume")?,
        volume_30d: decimal_column(row, "volume_30d")?,
        timestamp: row.try_get("timestamp")?,
        price_change: decimal_column(row, "price_change")?,
        price_change_percentage: decimal_column(row, "price_change_percentage")?,
        pair: row.try_get("pair")?,
    })
}
