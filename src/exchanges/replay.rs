//! Offline exchange that replays stored tickers and simulates order fills.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{split_pair, Exchange, ExchangeError, Result};
use crate::domain::{OrderInfo, OrderSide, OrderStatus, PlacedOrderInfo, Ticker};
use crate::storage::{StorageError, TickStorage};

const REPLAY_USER: &str = "replay";

struct ReplayState {
    tickers: Vec<Ticker>,
    cursor: usize,
    orders: HashMap<String, OrderInfo>,
    order_counter: u64,
}

impl ReplayState {
    fn last_served(&self) -> Option<&Ticker> {
        self.cursor.checked_sub(1).and_then(|i| self.tickers.get(i))
    }

    fn next_ticker(&mut self) -> Result<Ticker> {
        let Some(ticker) = self.tickers.get(self.cursor).cloned() else {
            return Err(ExchangeError::ReplayExhausted(self.tickers.len()));
        };
        self.cursor += 1;
        Ok(ticker)
    }
}

/// ReplayExchange serves a fixed ticker sequence, one per poll.
///
/// Placed orders start Active. Each query of an Active order advances the replay by one ticker,
/// and the order fills completely when that quote crosses its limit price (bid >= price for
/// sells, ask <= price for buys).
pub struct ReplayExchange {
    state: Mutex<ReplayState>,
}

impl ReplayExchange {
    pub fn new(tickers: Vec<Ticker>) -> Self {
        Self {
            state: Mutex::new(ReplayState {
                tickers,
                cursor: 0,
                orders: HashMap::new(),
                order_counter: 0,
            }),
        }
    }

    /// Loads tickers for an exchange pair symbol (e.g., "ETH:USD") within `[from, to]` seconds.
    pub async fn from_storage(
        storage: &dyn TickStorage,
        symbol: &str,
        from: i64,
        to: i64,
    ) -> std::result::Result<Self, StorageError> {
        let tickers = storage.get_range(symbol, from, to).await?;
        info!(symbol = %symbol, from, to, tickers = tickers.len(), "replay tickers loaded");
        Ok(Self::new(tickers))
    }

    /// Number of tickers served so far.
    #[cfg(test)]
    pub async fn served(&self) -> usize {
        self.state.lock().await.cursor
    }
}

fn crosses(order: &OrderInfo, quote: &Ticker) -> bool {
    match order.order_type {
        OrderSide::Sell => quote.bid >= order.price,
        OrderSide::Buy => quote.ask <= order.price,
    }
}

#[async_trait]
impl Exchange for ReplayExchange {
    async fn get_ticker(&self, _pair: &str) -> Result<Ticker> {
        self.state.lock().await.next_ticker()
    }

    async fn place_order(
        &self,
        side: OrderSide,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlacedOrderInfo> {
        let mut state = self.state.lock().await;
        let time = state.last_served().map(|t| t.timestamp * 1000).unwrap_or_default();
        let (symbol_1, symbol_2) = split_pair(pair).unwrap_or((pair, ""));

        state.order_counter += 1;
        let id = format!("replay-{}", state.order_counter);

        state.orders.insert(
            id.clone(),
            OrderInfo {
                id: id.clone(),
                time,
                order_type: side,
                user: REPLAY_USER.to_string(),
                status: OrderStatus::Active,
                price,
                amount,
                symbol_1: symbol_1.to_string(),
                symbol_2: symbol_2.to_string(),
                last_tx_time: None,
                last_tx: None,
                remains: amount,
            },
        );

        debug!(order_id = %id, side = %side, price = %price, amount = %amount, "replay order placed");

        Ok(PlacedOrderInfo {
            id,
            time,
            complete: false,
            pending: amount,
            amount,
            order_type: side,
            price,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.orders.get_mut(order_id) {
            Some(order) if order.status == OrderStatus::Active => {
                order.status = OrderStatus::Cancelled;
                Ok(())
            }
            _ => Err(ExchangeError::RemoteExecution(
                "Error: Order not found".to_string(),
            )),
        }
    }

    async fn get_order_info(&self, order_id: &str) -> Result<OrderInfo> {
        let mut state = self.state.lock().await;

        let status = state
            .orders
            .get(order_id)
            .map(|order| order.status)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;

        if status == OrderStatus::Active {
            let quote = state.next_ticker()?;
            if let Some(order) = state.orders.get_mut(order_id) {
                if crosses(order, &quote) {
                    order.status = OrderStatus::Done;
                    order.remains = Decimal::ZERO;
                    debug!(order_id = %order_id, timestamp = quote.timestamp, "replay order filled");
                }
            }
        }

        state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ticker(ask: &str, bid: &str, timestamp: i64) -> Ticker {
        Ticker {
            bid: d(bid),
            ask: d(ask),
            low: Decimal::from(100),
            high: Decimal::from(200),
            last: Decimal::from(150),
            volume: Decimal::from(50000),
            volume_30d: Decimal::from(150000),
            timestamp,
            price_change: d("12.5"),
            price_change_percentage: d("1.75"),
            pair: "ETH:USD".to_string(),
        }
    }

    #[tokio::test]
    async fn test_serves_tickers_in_order_then_exhausts() {
        let exchange = ReplayExchange::new(vec![
            ticker("183.57", "182.61", 1),
            ticker("183.57", "172.61", 2),
        ]);

        assert_eq!(exchange.get_ticker("ETH/USD").await.unwrap().timestamp, 1);
        assert_eq!(exchange.get_ticker("ETH/USD").await.unwrap().timestamp, 2);
        assert_eq!(exchange.served().await, 2);

        let err = exchange.get_ticker("ETH/USD").await.unwrap_err();
        assert!(matches!(err, ExchangeError::ReplayExhausted(2)));
    }

    #[tokio::test]
    async fn test_sell_order_fills_on_next_quote_crossing_price() {
        let exchange = ReplayExchange::new(vec![
            ticker("183.57", "172.69", 7),
            ticker("183.57", "172.70", 8),
        ]);
        exchange.get_ticker("ETH/USD").await.unwrap();

        let placed = exchange
            .place_order(OrderSide::Sell, "ETH/USD", d("172.69"), d("1578.15"))
            .await
            .unwrap();
        assert_eq!(placed.id, "replay-1");
        assert_eq!(placed.time, 7000);
        assert!(!placed.complete);

        let info = exchange.get_order_info(&placed.id).await.unwrap();
        assert_eq!(info.status, OrderStatus::Done);
        assert_eq!(info.remains, Decimal::ZERO);
        assert_eq!(info.symbol_1, "ETH");
        assert_eq!(info.symbol_2, "USD");
        assert_eq!(exchange.served().await, 2);

        // Finished orders no longer advance the replay
        exchange.get_order_info(&placed.id).await.unwrap();
        assert_eq!(exchange.served().await, 2);
    }

    #[tokio::test]
    async fn test_order_waits_while_quotes_move_away() {
        let exchange = ReplayExchange::new(vec![
            ticker("183.57", "172.69", 1),
            ticker("183.57", "100.00", 2),
            ticker("183.57", "172.68", 3),
            ticker("183.57", "180.00", 4),
        ]);
        exchange.get_ticker("ETH/USD").await.unwrap();
        let placed = exchange
            .place_order(OrderSide::Sell, "ETH/USD", d("172.69"), d("1"))
            .await
            .unwrap();

        for served in [2, 3] {
            let info = exchange.get_order_info(&placed.id).await.unwrap();
            assert_eq!(info.status, OrderStatus::Active);
            assert_eq!(exchange.served().await, served);
        }

        let info = exchange.get_order_info(&placed.id).await.unwrap();
        assert_eq!(info.status, OrderStatus::Done);
        assert_eq!(exchange.served().await, 4);
    }

    #[tokio::test]
    async fn test_buy_order_below_ask_stays_active_until_cancelled() {
        let exchange = ReplayExchange::new(vec![
            ticker("190.00", "189.00", 1),
            ticker("191.00", "190.00", 2),
        ]);
        exchange.get_ticker("ETH/USD").await.unwrap();

        let placed = exchange
            .place_order(OrderSide::Buy, "ETH/USD", d("180.00"), d("2"))
            .await
            .unwrap();
        let info = exchange.get_order_info(&placed.id).await.unwrap();
        assert_eq!(info.status, OrderStatus::Active);

        exchange.cancel_order(&placed.id).await.unwrap();
        let info = exchange.get_order_info(&placed.id).await.unwrap();
        assert_eq!(info.status, OrderStatus::Cancelled);
        assert_eq!(info.remains, d("2"));

        assert!(exchange.cancel_order(&placed.id).await.is_err());
    }

    #[tokio::test]
    async fn test_active_order_query_past_last_ticker_is_exhausted() {
        let exchange = ReplayExchange::new(vec![ticker("183.57", "172.69", 1)]);
        exchange.get_ticker("ETH/USD").await.unwrap();
        let placed = exchange
            .place_order(OrderSide::Sell, "ETH/USD", d("172.69"), d("1"))
            .await
            .unwrap();

        let err = exchange.get_order_info(&placed.id).await.unwrap_err();
        assert!(matches!(err, ExchangeError::ReplayExhausted(1)));
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let exchange = ReplayExchange::new(Vec::new());
        let err = exchange.get_order_info("nope").await.unwrap_err();
        assert!(matches!(err, ExchangeError::OrderNotFound(ref id) if id == "nope"));
    }
}
