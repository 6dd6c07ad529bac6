//! Domain models for the CEX.io trading agent.

mod order;
mod ticker;

pub use order::{OrderInfo, OrderSide, OrderStatus, PlacedOrderInfo};
pub use ticker::Ticker;
