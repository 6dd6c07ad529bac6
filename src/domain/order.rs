//! Core business entities for exchange orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OrderSide represents the direction of an order (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// OrderSideBuy indicates a buy order.
    Buy,
    /// OrderSideSell indicates a sell order.
    Sell,
}

impl OrderSide {
    /// Returns the wire name used by the exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(format!("unknown order side: {}", s)),
        }
    }
}

/// OrderStatus represents the current state of an order on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order is on the book and may still be filled.
    Active,
    /// The order has been completely filled.
    Done,
    /// The order was cancelled, possibly after a partial fill.
    Cancelled,
}

/// OrderInfo is the exchange's view of a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    /// Creation time in unix milliseconds.
    pub time: i64,
    pub order_type: OrderSide,
    pub user: String,
    pub status: OrderStatus,
    pub price: Decimal,
    pub amount: Decimal,
    /// Base currency symbol.
    pub symbol_1: String,
    /// Quote currency symbol.
    pub symbol_2: String,
    pub last_tx_time: Option<String>,
    pub last_tx: Option<String>,
    /// Unfilled amount. Authoritative once the status leaves Active.
    pub remains: Decimal,
}

/// PlacedOrderInfo is the synchronous acknowledgment returned by order placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrderInfo {
    pub id: String,
    /// Creation time in unix milliseconds.
    pub time: i64,
    /// True when the order was filled on placement.
    pub complete: bool,
    pub pending: Decimal,
    pub amount: Decimal,
    pub order_type: OrderSide,
    pub price: Decimal,
}
