//! Typed view over CEX.io response bodies.
//!
//! The exchange is loose about shapes: numbers arrive as strings or as JSON numbers, the `ok`
//! marker is omitted on success by some endpoints, and some bodies are bare booleans or `null`.
//! Everything is validated here so that malformed data never leaves the client layer.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{OrderInfo, OrderSide, OrderStatus, PlacedOrderInfo, Ticker};

/// Success marker carried in the `ok` field.
pub const OK_MARKER: &str = "ok";

/// Response shape errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected a json object, got {0}")]
    NotAnObject(String),

    #[error("missing field {0}")]
    MissingField(String),

    #[error("field {field} is not numeric: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("field {field} has unexpected value: {value}")]
    InvalidValue { field: String, value: String },

    #[error("unknown order status \"{status}\", order id: {order_id}")]
    UnknownOrderStatus { status: String, order_id: String },
}

/// A payload type that can be built from a JSON value.
pub trait ApiData: Sized {
    /// False for commands whose body carries no payload worth parsing.
    const HAS_PAYLOAD: bool = true;

    fn from_json(value: &Value) -> Result<Self, ParseError>;
}

/// No payload requested.
impl ApiData for () {
    const HAS_PAYLOAD: bool = false;

    fn from_json(_value: &Value) -> Result<Self, ParseError> {
        Ok(())
    }
}

/// Normalized response envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// Command echo.
    pub e: Option<String>,
    pub ok: Option<String>,
    pub error: Option<String>,
    pub data: Option<T>,
    /// The raw body, kept for endpoints that answer with bare scalars.
    pub body: Value,
}

impl<T: ApiData> ApiResponse<T> {
    /// Builds the envelope from a decoded body.
    ///
    /// A non-object body leaves every field empty. An object with neither `error` nor `ok` is
    /// treated as success. The payload comes from `data` when present, otherwise from the root
    /// object, but never from the root of an error body. A payload that fails to parse in an
    /// error body is dropped.
    pub fn parse(body: Value) -> Result<Self, ParseError> {
        let Some(root) = body.as_object() else {
            return Ok(Self {
                e: None,
                ok: None,
                error: None,
                data: None,
                body,
            });
        };

        let e = marker(root, "e");
        let error = marker(root, "error");
        let mut ok = marker(root, "ok");
        if error.is_none() && ok.is_none() {
            ok = Some(OK_MARKER.to_string());
        }

        let data = if !T::HAS_PAYLOAD {
            None
        } else {
            match root.get("data") {
                // An error body keeps its message even if its payload is malformed
                Some(data) if !data.is_null() && error.is_some() => T::from_json(data).ok(),
                Some(data) if !data.is_null() => Some(T::from_json(data)?),
                _ if error.is_none() => Some(T::from_json(&body)?),
                _ => None,
            }
        };

        Ok(Self {
            e,
            ok,
            error,
            data,
            body,
        })
    }

    /// Returns true when the envelope carries no error and an explicit or implied `ok`.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.ok.as_deref() == Some(OK_MARKER)
    }
}

/// Reads an envelope marker. Absent, null and empty values count as unset.
fn marker(root: &Map<String, Value>, key: &str) -> Option<String> {
    match root.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

/// Field accessor with the coercions the exchange needs.
struct Fields<'a> {
    obj: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value) -> Result<Self, ParseError> {
        value
            .as_object()
            .map(|obj| Self { obj })
            .ok_or_else(|| ParseError::NotAnObject(value.to_string()))
    }

    fn get(&self, name: &str) -> Result<&'a Value, ParseError> {
        match self.obj.get(name) {
            Some(Value::Null) | None => Err(ParseError::MissingField(name.to_string())),
            Some(value) => Ok(value),
        }
    }

    fn decimal(&self, name: &str) -> Result<Decimal, ParseError> {
        let value = self.get(name)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ParseError::InvalidNumber {
                    field: name.to_string(),
                    value: other.to_string(),
                })
            }
        };

        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| ParseError::InvalidNumber {
                field: name.to_string(),
                value: value.to_string(),
            })
    }

    fn integer(&self, name: &str) -> Result<i64, ParseError> {
        let value = self.get(name)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        parsed.ok_or_else(|| ParseError::InvalidNumber {
            field: name.to_string(),
            value: value.to_string(),
        })
    }

    fn string(&self, name: &str) -> Result<String, ParseError> {
        match self.get(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(ParseError::InvalidValue {
                field: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn optional_string(&self, name: &str) -> Result<Option<String>, ParseError> {
        match self.obj.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(name).map(Some),
        }
    }

    fn boolean(&self, name: &str) -> Result<bool, ParseError> {
        match self.get(name)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(ParseError::InvalidValue {
                field: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn side(&self, name: &str) -> Result<OrderSide, ParseError> {
        let raw = self.string(name)?;
        OrderSide::from_str(&raw).map_err(|_| ParseError::InvalidValue {
            field: name.to_string(),
            value: raw,
        })
    }
}

/// Maps exchange status codes to OrderStatus.
pub fn parse_order_status(status: &str, order_id: &str) -> Result<OrderStatus, ParseError> {
    match status {
        "a" => Ok(OrderStatus::Active),
        "d" => Ok(OrderStatus::Done),
        "c" | "cd" => Ok(OrderStatus::Cancelled),
        _ => Err(ParseError::UnknownOrderStatus {
            status: status.to_string(),
            order_id: order_id.to_string(),
        }),
    }
}

impl ApiData for Ticker {
    fn from_json(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::of(value)?;
        Ok(Ticker {
            bid: f.decimal("bid")?,
            ask: f.decimal("ask")?,
            low: f.decimal("low")?,
            high: f.decimal("high")?,
            last: f.decimal("last")?,
            volume: f.decimal("volume")?,
            volume_30d: f.decimal("volume30d")?,
            timestamp: f.integer("timestamp")?,
            price_change: f.decimal("priceChange")?,
            price_change_percentage: f.decimal("priceChangePercentage")?,
            pair: f.string("pair")?,
        })
    }
}

impl ApiData for OrderInfo {
    fn from_json(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::of(value)?;
        let id = f.string("id")?;
        let status = parse_order_status(&f.string("status")?, &id)?;

        Ok(OrderInfo {
            time: f.integer("time")?,
            order_type: f.side("type")?,
            user: f.string("user")?,
            status,
            price: f.decimal("price")?,
            amount: f.decimal("amount")?,
            symbol_1: f.string("symbol1")?,
            symbol_2: f.string("symbol2")?,
            last_tx_time: f.optional_string("lastTxTime")?,
            last_tx: f.optional_string("lastTx")?,
            remains: f.decimal("remains")?,
            id,
        })
    }
}

impl ApiData for PlacedOrderInfo {
    fn from_json(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::of(value)?;
        Ok(PlacedOrderInfo {
            id: f.string("id")?,
            time: f.integer("time")?,
            complete: f.boolean("complete")?,
            pending: f.decimal("pending")?,
            amount: f.decimal("amount")?,
            order_type: f.side("type")?,
            price: f.decimal("price")?,
        })
    }
}

/// Account balances keyed by currency symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balances {
    pub available: HashMap<String, Decimal>,
}

impl ApiData for Balances {
    fn from_json(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::of(value)?;
        let mut available = HashMap::new();

        // Non-currency keys (timestamp, username) are plain scalars.
        for (currency, entry) in f.obj {
            if !entry.is_object() {
                continue;
            }
            let amount = Fields::of(entry)?.decimal("available")?;
            available.insert(currency.clone(), amount);
        }

        Ok(Balances { available })
    }
}
