//! Replay configuration.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Time window of stored tickers to replay with `--replay`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}
