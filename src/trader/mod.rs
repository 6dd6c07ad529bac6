//! Reversal ("ratchet") trading state machine.
//!
//! Tracks the best bid and ask seen so far and commits to a trade once the market
//! reverses from that extreme by more than the threshold. After the first trade the
//! trader keeps placing market-side orders until the full amount is executed.

mod config;
mod directive;
mod error;

pub use config::TraderConfig;
pub use directive::{Action, ChangeLevels, Outcome, TradingDirective};
pub use error::TraderError;

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::{OrderSide, OrderStatus, Ticker};
use crate::exchanges::Exchange;

/// Owns all mutable strategy state for one run.
pub struct Trader {
    exchange: Arc<dyn Exchange>,
    config: TraderConfig,

    // Remaining amount to trade
    amount: Decimal,

    max_bid: Option<Decimal>,
    min_ask: Option<Decimal>,

    current_order: Option<String>,
    order_ttl: u32,
    ignited: bool,
}

impl Trader {
    pub fn new(exchange: Arc<dyn Exchange>, config: TraderConfig) -> Self {
        Self {
            exchange,
            amount: config.amount,
            config,
            max_bid: None,
            min_ask: None,
            current_order: None,
            order_ttl: 0,
            ignited: false,
        }
    }

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    /// Amount still to be traded.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn max_bid(&self) -> Option<Decimal> {
        self.max_bid
    }

    pub fn min_ask(&self) -> Option<Decimal> {
        self.min_ask
    }

    pub fn current_order(&self) -> Option<&str> {
        self.current_order.as_deref()
    }

    /// Polls the current order has spent Active.
    pub fn order_ttl(&self) -> u32 {
        self.order_ttl
    }

    pub fn is_ignited(&self) -> bool {
        self.ignited
    }

    /// Runs one tick of the state machine.
    pub async fn process(&mut self) -> Result<Outcome, TraderError> {
        if let Some(order_id) = self.current_order.clone() {
            return self.control_order(&order_id).await;
        }

        let ticker = self.exchange.get_ticker(&self.config.pair).await?;
        debug!(
            pair = %ticker.pair,
            timestamp = ticker.timestamp,
            bid = %ticker.bid,
            ask = %ticker.ask,
            "ticker"
        );

        let directive = self.next_directive(&ticker)?;
        if !directive.is_hold() {
            self.trade_asset(&directive).await?;
        }

        Ok(Outcome::Continue)
    }

    /// Decides what to do with a fresh ticker.
    ///
    /// Before ignition this updates the tracked extremes.
    pub fn next_directive(&mut self, ticker: &Ticker) -> Result<TradingDirective, TraderError> {
        if self.ignited {
            return Ok(self.straight_directive(ticker));
        }

        let levels = self.process_ticker(ticker)?;
        Ok(self.process_changes(ticker, &levels))
    }

    /// Updates the rolling extremes and returns the rounded change ratios.
    pub fn process_ticker(&mut self, ticker: &Ticker) -> Result<ChangeLevels, TraderError> {
        let max_bid = self.max_bid.map_or(ticker.bid, |max| max.max(ticker.bid));
        let min_ask = self.min_ask.map_or(ticker.ask, |min| min.min(ticker.ask));
        self.max_bid = Some(max_bid);
        self.min_ask = Some(min_ask);

        if max_bid.is_zero() || min_ask.is_zero() {
            return Err(TraderError::InvalidQuote(format!(
                "zero extremum for {} (max bid {}, min ask {})",
                self.config.pair, max_bid, min_ask
            )));
        }

        Ok(ChangeLevels {
            ask_change: self.round(ticker.ask / min_ask),
            bid_change: self.round(ticker.bid / max_bid),
        })
    }

    /// Compares the reversal against the threshold. Equality holds.
    pub fn process_changes(&self, ticker: &Ticker, levels: &ChangeLevels) -> TradingDirective {
        let (change, price) = match self.config.action {
            OrderSide::Buy => (self.round(levels.ask_change - Decimal::ONE), ticker.ask),
            OrderSide::Sell => (self.round(Decimal::ONE - levels.bid_change), ticker.bid),
        };

        if change > Decimal::ZERO && change > self.config.threshold {
            info!(
                action = %self.config.action,
                change = %change,
                threshold = %self.config.threshold,
                price = %price,
                "threshold reached"
            );
            return TradingDirective::trade(
                self.config.action,
                &self.config.pair,
                price,
                self.amount,
            );
        }

        TradingDirective::hold()
    }

    /// Trades the remaining amount at the current market side.
    pub fn straight_directive(&self, ticker: &Ticker) -> TradingDirective {
        let price = match self.config.action {
            OrderSide::Buy => ticker.ask,
            OrderSide::Sell => ticker.bid,
        };
        TradingDirective::trade(self.config.action, &self.config.pair, price, self.amount)
    }

    async fn trade_asset(&mut self, directive: &TradingDirective) -> Result<(), TraderError> {
        let Some(side) = directive.side() else {
            return Ok(());
        };

        self.ignited = true;

        let placed = self
            .exchange
            .place_order(side, &directive.pair, directive.price, directive.amount)
            .await?;

        info!(
            order_id = %placed.id,
            side = %side,
            pair = %directive.pair,
            price = %directive.price,
            amount = %directive.amount,
            "order placed"
        );

        self.current_order = Some(placed.id);
        self.order_ttl = 0;
        Ok(())
    }

    async fn control_order(&mut self, order_id: &str) -> Result<Outcome, TraderError> {
        let info = self.exchange.get_order_info(order_id).await?;

        match info.status {
            OrderStatus::Active => {
                self.order_ttl += 1;
                if self.order_ttl < self.config.max_order_ttl {
                    debug!(order_id = %order_id, ttl = self.order_ttl, "order still active");
                    return Ok(Outcome::Continue);
                }

                self.exchange.cancel_order(order_id).await?;
                info!(order_id = %order_id, ttl = self.order_ttl, "order expired, cancel sent");
                Ok(Outcome::Expired)
            }
            OrderStatus::Done => {
                info!(order_id = %order_id, "order done");
                Ok(Outcome::Done)
            }
            OrderStatus::Cancelled => {
                if info.remains.is_zero() {
                    info!(order_id = %order_id, "cancelled order was fully executed");
                    return Ok(Outcome::Done);
                }

                if info.remains.is_sign_negative() {
                    return Err(TraderError::NegativeRemains {
                        order_id: order_id.to_string(),
                        remains: info.remains,
                    });
                }

                warn!(order_id = %order_id, remains = %info.remains, "order partially executed");
                self.amount = info.remains;
                self.current_order = None;
                Ok(Outcome::PartiallyExecuted {
                    remains: info.remains,
                })
            }
        }
    }

    fn round(&self, value: Decimal) -> Decimal {
        value.round_dp(self.config.significant_digits)
    }
}
