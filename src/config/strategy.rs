//! Reversal strategy configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use super::{duration, ConfigError};
use crate::domain::OrderSide;

const DEFAULT_ORDER_TTL: u32 = 10;
const DEFAULT_SIGNIFICANT_DIGITS: u32 = 3;
const DEFAULT_PROCESSING_PERIOD: Duration = Duration::from_secs(5);

/// Parameters of a single reversal trade.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Side to trade: "buy" or "sell".
    pub action: OrderSide,
    /// Pair in "BASE/QUOTE" form (e.g., "ETH/USD").
    pub pair: String,
    /// Total amount of base currency to trade.
    pub amount: Decimal,
    /// Reversal threshold in percent of the tracked extremum.
    pub threshold_percent: Decimal,
    /// Ticks an order may stay active before it is cancelled.
    #[serde(default = "default_order_ttl")]
    pub order_ttl: u32,
    /// Decimal places used when rounding prices.
    #[serde(default = "default_significant_digits")]
    pub significant_digits: u32,
    /// Delay between ticks. Zero means the default of 5s.
    #[serde(default, with = "duration")]
    pub processing_period: Duration,
}

impl StrategyConfig {
    /// Returns the tick period, falling back to 5s.
    pub fn processing_period(&self) -> Duration {
        if self.processing_period.is_zero() {
            DEFAULT_PROCESSING_PERIOD
        } else {
            self.processing_period
        }
    }

    /// Applies a `--key=value` command line override.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Override {
            key: key.to_string(),
            reason,
        };

        match key {
            "pair" => self.pair = value.to_string(),
            "action" => self.action = OrderSide::from_str(value).map_err(invalid)?,
            "amount" => self.amount = parse_decimal(value).map_err(invalid)?,
            "threshold_percent" => {
                self.threshold_percent = parse_decimal(value).map_err(invalid)?
            }
            "order_ttl" => {
                self.order_ttl = value
                    .parse()
                    .map_err(|e| invalid(format!("{}", e)))?
            }
            "significant_digits" => {
                self.significant_digits = value
                    .parse()
                    .map_err(|e| invalid(format!("{}", e)))?
            }
            "processing_period" => {
                self.processing_period = duration::parse_duration(value).map_err(invalid)?
            }
            _ => return Err(invalid("unknown option".to_string())),
        }

        Ok(())
    }
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| format!("{}", e))
}

fn default_order_ttl() -> u32 {
    DEFAULT_ORDER_TTL
}

fn default_significant_digits() -> u32 {
    DEFAULT_SIGNIFICANT_DIGITS
}
