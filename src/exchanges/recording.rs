//! Exchange decorator that persists every ticker it hands out.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

use super::{Exchange, Result};
use crate::domain::{OrderInfo, OrderSide, PlacedOrderInfo, Ticker};
use crate::storage::TickStorage;

/// Wraps an exchange and records polled tickers into storage.
///
/// Storage failures are logged and never surface to the trader.
pub struct RecordingExchange {
    inner: Arc<dyn Exchange>,
    storage: Arc<dyn TickStorage>,
}

impl RecordingExchange {
    pub fn new(inner: Arc<dyn Exchange>, storage: Arc<dyn TickStorage>) -> Self {
        Self { inner, storage }
    }
}

#[async_trait]
impl Exchange for RecordingExchange {
    async fn get_ticker(&self, pair: &str) -> Result<Ticker> {
        let ticker = self.inner.get_ticker(pair).await?;

        if let Err(e) = self.storage.save(&ticker).await {
            warn!(pair = %pair, timestamp = ticker.timestamp, error = %e, "failed to persist ticker");
        }

        Ok(ticker)
    }

    async fn place_order(
        &self,
        side: OrderSide,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlacedOrderInfo> {
        self.inner.place_order(side, pair, price, amount).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        self.inner.cancel_order(order_id).await
    }

    async fn get_order_info(&self, order_id: &str) -> Result<OrderInfo> {
        self.inner.get_order_info(order_id).await
    }
}
