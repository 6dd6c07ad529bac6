//! Trader configuration.

use rust_decimal::Decimal;

use crate::config::StrategyConfig;
use crate::domain::OrderSide;

/// Immutable parameters of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct TraderConfig {
    pub action: OrderSide,
    pub pair: String,
    /// Initial target amount.
    pub amount: Decimal,
    /// Reversal threshold as a fraction (10% is 0.1).
    pub threshold: Decimal,
    pub max_order_ttl: u32,
    /// Decimal places for ratio rounding.
    pub significant_digits: u32,
}

impl From<&StrategyConfig> for TraderConfig {
    fn from(strategy: &StrategyConfig) -> Self {
        Self {
            action: strategy.action,
            pair: strategy.pair.clone(),
            amount: strategy.amount,
            threshold: strategy.threshold_percent / Decimal::ONE_HUNDRED,
            max_order_ttl: strategy.order_ttl,
            significant_digits: strategy.significant_digits,
        }
    }
}
