//! Market ticker snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ticker is an immutable snapshot of the market for one pair, produced once per poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Lowest price over the last 24 hours.
    pub low: Decimal,
    /// Highest price over the last 24 hours.
    pub high: Decimal,
    /// Last trade price.
    pub last: Decimal,
    /// 24 hour volume.
    pub volume: Decimal,
    /// 30 day volume.
    pub volume_30d: Decimal,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    /// Absolute price change over 24 hours.
    pub price_change: Decimal,
    /// Price change over 24 hours in percent.
    pub price_change_percentage: Decimal,
    /// Pair identifier as reported by the exchange (e.g., "LTC:USD").
    pub pair: String,
}
