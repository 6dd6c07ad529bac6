//! CEX.io exchange integration.

mod client;
mod response;

pub use client::{Client, ClientConfig, Params, BASE_HTTP_API_URL};
pub use response::{
    parse_order_status, ApiData, ApiResponse, Balances, ParseError, OK_MARKER,
};
