//! Trading directives and per-tick decision values.

use rust_decimal::Decimal;

use crate::domain::OrderSide;

/// What the trader wants to do on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl From<OrderSide> for Action {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Action::Buy,
            OrderSide::Sell => Action::Sell,
        }
    }
}

/// A decision to trade `amount` of `pair` at `price`, or to hold.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingDirective {
    pub action: Action,
    pub amount: Decimal,
    pub price: Decimal,
    pub pair: String,
}

impl TradingDirective {
    /// The no-op directive: amount and price are -1, pair is empty.
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            amount: Decimal::NEGATIVE_ONE,
            price: Decimal::NEGATIVE_ONE,
            pair: String::new(),
        }
    }

    pub fn trade(side: OrderSide, pair: &str, price: Decimal, amount: Decimal) -> Self {
        Self {
            action: side.into(),
            amount,
            price,
            pair: pair.to_string(),
        }
    }

    /// Order side to place, or None for hold.
    pub fn side(&self) -> Option<OrderSide> {
        match self.action {
            Action::Buy => Some(OrderSide::Buy),
            Action::Sell => Some(OrderSide::Sell),
            Action::Hold => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}

/// Current quotes relative to the tracked extremes, rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeLevels {
    /// `ask / min_ask`.
    pub ask_change: Decimal,
    /// `bid / max_bid`.
    pub bid_change: Decimal,
}

/// Result of one `Trader::process` tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Nothing terminal happened. Keep polling.
    Continue,
    /// The whole amount has been traded.
    Done,
    /// The order outlived its TTL and a cancel was sent.
    Expired,
    /// The order was cancelled with `remains` left. The next tick trades the remainder.
    PartiallyExecuted { remains: Decimal },
}
