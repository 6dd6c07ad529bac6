//! Exchange integration abstractions and implementations.

pub mod cex;
mod recording;
mod replay;
mod utils;

use crate::domain::{OrderInfo, OrderSide, PlacedOrderInfo, Ticker};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use cex::ParseError;
pub use recording::RecordingExchange;
pub use replay::ReplayExchange;
pub use utils::{pair_to_symbol, split_pair};

/// Exchange errors.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// HTTP status other than 200.
    #[error("cex.io server error: http status {status}")]
    Server { status: u16 },

    /// The exchange answered with a structured error.
    #[error("api call error -> {0}")]
    RemoteExecution(String),

    /// By-id lookup returned no order.
    #[error("order {0} not found")]
    OrderNotFound(String),

    /// Cancel request was not acknowledged with `true`.
    #[error("cannot cancel order {0}")]
    CannotCancel(String),

    /// Response body has an unexpected shape.
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Replay source has no more tickers.
    #[error("replay exhausted after {0} tickers")]
    ReplayExhausted(usize),
}

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Exchange is the capability the trader needs from a venue.
///
/// Implemented by the live CEX.io client, by decorators over it, and by replay sources.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Fetches the current ticker for a "BASE/QUOTE" pair.
    async fn get_ticker(&self, pair: &str) -> Result<Ticker>;

    /// Places a limit order and returns the exchange acknowledgment.
    async fn place_order(
        &self,
        side: OrderSide,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlacedOrderInfo>;

    /// Requests cancellation. The effect is observed through `get_order_info`.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Retrieves the current state of an order.
    /// Returns `ExchangeError::OrderNotFound` if the exchange has no such order.
    async fn get_order_info(&self, order_id: &str) -> Result<OrderInfo>;
}
