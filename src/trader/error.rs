//! Trader error types.

use rust_decimal::Decimal;

use crate::exchanges::ExchangeError;

/// Trader error type. Every variant ends the strategy run.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error("order {order_id} reports negative remains {remains}")]
    NegativeRemains { order_id: String, remains: Decimal },
    #[error("invalid quote: {0}")]
    InvalidQuote(String),
}

impl TraderError {
    /// True when a replay source ran out of tickers.
    pub fn is_replay_exhausted(&self) -> bool {
        matches!(self, TraderError::Exchange(ExchangeError::ReplayExhausted(_)))
    }
}
