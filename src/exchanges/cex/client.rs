//! HTTP client for the CEX.io REST API.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::USER_AGENT;
use reqwest::{Client as HttpClient, Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::{debug, warn};

use super::response::{ApiData, ApiResponse, Balances};
use crate::config::ExchangeConfig;
use crate::domain::{OrderInfo, OrderSide, PlacedOrderInfo, Ticker};
use crate::exchanges::{Exchange, ExchangeError, Result};

/// Production CEX.io HTTP API endpoint.
pub const BASE_HTTP_API_URL: &str = "https://cex.io/api";

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Commands that must never carry authentication material.
const PUBLIC_COMMANDS: &[&str] = &[
    "currency_limits",
    "ticker",
    "tickers",
    "last_price",
    "last_prices",
    "convert",
    "price_stats",
    "ohlcv",
    "order_book",
    "trade_history",
];

/// Request parameters. Insertion order is kept on the wire.
pub type Params = Map<String, Value>;

/// Configuration for creating a new Client.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Account identifier, part of the signed message.
    pub username: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(username: String, api_key: String, api_secret: String) -> Self {
        Self {
            base_url: BASE_HTTP_API_URL.to_string(),
            username,
            api_key,
            api_secret,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Points the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// HTTP client for the CEX.io API.
/// Handles nonce generation, request signing and response normalization.
pub struct Client {
    config: ClientConfig,
    http_client: HttpClient,
    last_nonce: AtomicI64,
}

impl Client {
    /// Creates a new CEX.io API client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            http_client,
            last_nonce: AtomicI64::new(0),
        })
    }

    /// Creates a new CEX.io API client from exchange config.
    pub fn from_config(exchange_config: &ExchangeConfig) -> Result<Self> {
        let mut config = ClientConfig::new(
            exchange_config.username.clone(),
            exchange_config.api_key.clone(),
            exchange_config.api_secret.clone(),
        );
        if let Some(ref base_url) = exchange_config.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if !exchange_config.timeout.is_zero() {
            config.timeout = exchange_config.timeout;
        }
        Self::new(config)
    }

    /// Returns the current time in milliseconds, bumped so that no value is handed out twice.
    fn nonce(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let prev = self
            .last_nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        now.max(prev + 1).to_string()
    }

    /// Creates the request signature.
    ///
    /// HEX(HMAC_SHA256(secret, nonce + username + api_key)), upper-cased.
    fn sign(&self, nonce: &str) -> String {
        let message = format!("{}{}{}", nonce, self.config.username, self.config.api_key);

        let mut mac = Hmac::<Sha256>::new_from_slice(self.config.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());

        hex::encode_upper(mac.finalize().into_bytes())
    }

    /// Calls an API command and wraps the body in a typed envelope.
    ///
    /// Private commands get `key`, `signature` and `nonce` appended to `params`.
    /// Requests without parameters go out as GET, everything else as a JSON POST.
    pub async fn call<T: ApiData>(
        &self,
        command: &str,
        params: &mut Params,
        action: &str,
    ) -> Result<ApiResponse<T>> {
        let signed = !PUBLIC_COMMANDS.contains(&command);
        if signed {
            let nonce = self.nonce();
            params.insert("key".to_string(), Value::String(self.config.api_key.clone()));
            params.insert("signature".to_string(), Value::String(self.sign(&nonce)));
            params.insert("nonce".to_string(), Value::String(nonce));
        }

        let url = format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            command,
            action
        );
        let method = if params.is_empty() {
            Method::GET
        } else {
            Method::POST
        };

        debug!(
            method = %method,
            command = %command,
            action = %action,
            signed = signed,
            "sending request"
        );

        let mut request = self
            .http_client
            .request(method, &url)
            .header(USER_AGENT, format!("bot-cex.io-{}", self.config.username));
        if !params.is_empty() {
            request = request.json(&*params);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), command = %command, "unexpected http status");
            return Err(ExchangeError::Server {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)?;

        Ok(ApiResponse::parse(value)?)
    }

    /// Fetches the current ticker for a "BASE/QUOTE" pair.
    pub async fn get_ticker(&self, pair: &str) -> Result<Ticker> {
        let response = self
            .call::<Ticker>("ticker", &mut Params::new(), pair)
            .await?;
        ensure_ok(&response)?;
        response
            .data
            .ok_or_else(|| ExchangeError::RemoteExecution(format!("no ticker for {}", pair)))
    }

    /// Places a limit order.
    pub async fn place_order(
        &self,
        side: OrderSide,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlacedOrderInfo> {
        let mut params = Params::new();
        params.insert("type".to_string(), Value::String(side.to_string()));
        params.insert("amount".to_string(), Value::String(amount.to_string()));
        params.insert("price".to_string(), Value::String(price.to_string()));

        let response = self
            .call::<PlacedOrderInfo>("place_order", &mut params, pair)
            .await?;
        ensure_ok(&response)?;
        response.data.ok_or_else(|| {
            ExchangeError::RemoteExecution(format!("no acknowledgment for {} order", side))
        })
    }

    /// Cancels an order. The exchange answers with a bare `true` on success.
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut params = id_params(order_id);
        let response = self.call::<()>("cancel_order", &mut params, "").await?;

        if let Some(error) = response.error {
            return Err(ExchangeError::RemoteExecution(error));
        }

        match response.body {
            Value::Bool(true) => Ok(()),
            _ => Err(ExchangeError::CannotCancel(order_id.to_string())),
        }
    }

    /// Retrieves order details by id.
    pub async fn get_order_info(&self, order_id: &str) -> Result<OrderInfo> {
        let mut params = id_params(order_id);
        let response = self
            .call::<OrderInfo>("get_order", &mut params, "")
            .await?;

        if let Some(error) = response.error {
            return Err(ExchangeError::RemoteExecution(error));
        }

        response
            .data
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))
    }

    /// Returns the available balance of one currency.
    pub async fn get_balance(&self, currency: &str) -> Result<Decimal> {
        let response = self
            .call::<Balances>("balance", &mut Params::new(), "")
            .await?;
        ensure_ok(&response)?;

        let currency = currency.to_uppercase();
        response
            .data
            .and_then(|balances| balances.available.get(&currency).copied())
            .ok_or_else(|| ExchangeError::RemoteExecution(format!("no balance for {}", currency)))
    }
}

#[async_trait]
impl Exchange for Client {
    async fn get_ticker(&self, pair: &str) -> Result<Ticker> {
        Client::get_ticker(self, pair).await
    }

    async fn place_order(
        &self,
        side: OrderSide,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlacedOrderInfo> {
        Client::place_order(self, side, pair, price, amount).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        Client::cancel_order(self, order_id).await
    }

    async fn get_order_info(&self, order_id: &str) -> Result<OrderInfo> {
        Client::get_order_info(self, order_id).await
    }
}

fn id_params(order_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("id".to_string(), Value::String(order_id.to_string()));
    params
}

/// Maps an error envelope, or one without the `ok` marker, to RemoteExecution.
fn ensure_ok<T: ApiData>(response: &ApiResponse<T>) -> Result<()> {
    if let Some(ref error) = response.error {
        return Err(ExchangeError::RemoteExecution(error.clone()));
    }
    if !response.is_ok() {
        return Err(ExchangeError::RemoteExecution(format!(
            "unexpected response: {}",
            response.body
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use std::str::FromStr;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const TICKER_RESPONSE: &str = r#"{"timestamp":"1555429655","low":"77.01","high":"82.97","last":"80.55","volume":"962.53899874","volume30d":"22671.47783080","bid":80.03,"ask":81.47,"priceChange":"-2.38","priceChangePercentage":"-2.87","pair":"LTC:USD"}"#;
    const PLACE_ORDER_RESPONSE: &str = r#"{"complete":true,"id":"8649363416","time":1555427005911,"pending":"100.0000000","amount":"100.0000000","type":"buy","price":"0.11"}"#;
    const PLACE_ORDER_ERROR: &str = r#"{"error": "Error: Place order error: Insufficient funds."}"#;
    const GET_ORDER_DONE_RESPONSE: &str = r#"{"id":"8544344631","type":"sell","time":1554220564111,"lastTxTime":"2019-04-02T20:16:16.691Z","lastTx":"8545703401","pos":null,"user":"up120757206","status":"d","symbol1":"BTC","symbol2":"USD","amount":"1.53693924","price":"220","fa:USD":"0.19","ta:USD":"118.12","remains":"0.00000000","tradingFeeMaker":"0.16","tradingFeeTaker":"0.25","orderId":"8544344631"}"#;
    const CANCEL_ORDER_NOT_FOUND: &str = r#"{"error": "Error: Order not found"}"#;
    const BALANCE_RESPONSE: &str = r#"{"timestamp":"1513177918","username":"up120757206","BTC":{"available":"1.38000000","orders":"0.00000000"},"USD":{"available":"1204.25","orders":"20.00"}}"#;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn test_client(server: &MockServer) -> Client {
        let config = ClientConfig::new(
            "test".to_string(),
            "test_key".to_string(),
            "test_secret".to_string(),
        )
        .with_base_url(server.uri());
        Client::new(config).unwrap()
    }

    async fn mount(server: &MockServer, http_method: &str, url_path: &str, body: &str) {
        Mock::given(method(http_method))
            .and(path(url_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.as_bytes().to_vec(), "application/json"),
            )
            .mount(server)
            .await;
    }

    async fn last_request(server: &MockServer) -> Request {
        server
            .received_requests()
            .await
            .unwrap()
            .pop()
            .expect("no request received")
    }

    fn body_keys(request: &Request) -> (Vec<String>, Params) {
        let body: Params = serde_json::from_slice(&request.body).unwrap();
        (body.keys().cloned().collect(), body)
    }

    #[test]
    fn test_sign_is_uppercase_hmac_of_nonce_user_and_key() {
        let client = Client::new(ClientConfig::new(
            "up123".to_string(),
            "key".to_string(),
            "secret".to_string(),
        ))
        .unwrap();

        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret").unwrap();
        mac.update(b"1555429655000up123key");
        let expected = hex::encode(mac.finalize().into_bytes()).to_uppercase();

        let signature = client.sign("1555429655000");
        assert_eq!(signature, expected);
        assert_eq!(signature.len(), 64);
        assert!(!signature.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_nonce_strictly_increasing() {
        let client = Client::new(ClientConfig::new(
            "u".to_string(),
            "k".to_string(),
            "s".to_string(),
        ))
        .unwrap();

        let mut prev: i64 = client.nonce().parse().unwrap();
        for _ in 0..100 {
            let next: i64 = client.nonce().parse().unwrap();
            assert!(next > prev, "nonce went from {} to {}", prev, next);
            prev = next;
        }
    }

    #[tokio::test]
    async fn test_get_ticker_is_unsigned_get() {
        let server = MockServer::start().await;
        mount(&server, "GET", "/ticker/LTC/USD", TICKER_RESPONSE).await;
        let client = test_client(&server);

        let ticker = client.get_ticker("LTC/USD").await.unwrap();
        assert_eq!(ticker.pair, "LTC:USD");
        assert_eq!(ticker.bid, d("80.03"));
        assert_eq!(ticker.ask, d("81.47"));
        assert_eq!(ticker.low, d("77.01"));
        assert_eq!(ticker.high, d("82.97"));
        assert_eq!(ticker.last, d("80.55"));
        assert_eq!(ticker.volume, d("962.53899874"));
        assert_eq!(ticker.volume_30d, d("22671.47783080"));
        assert_eq!(ticker.price_change, d("-2.38"));
        assert_eq!(ticker.price_change_percentage, d("-2.87"));
        assert_eq!(ticker.timestamp, 1555429655);

        let request = last_request(&server).await;
        assert_eq!(request.method.as_str(), "GET");
        assert!(request.body.is_empty());
        assert_eq!(
            request.headers.get("user-agent").unwrap().to_str().unwrap(),
            "bot-cex.io-test"
        );
    }

    #[tokio::test]
    async fn test_public_command_with_params_carries_no_auth() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/convert/BTC/USD", r#"{"amnt":"2500.00"}"#).await;
        let client = test_client(&server);

        let mut params = Params::new();
        params.insert("amnt".to_string(), Value::String("0.5".to_string()));
        let response = client
            .call::<()>("convert", &mut params, "BTC/USD")
            .await
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(params.len(), 1);

        let (keys, _) = body_keys(&last_request(&server).await);
        assert_eq!(keys, vec!["amnt"]);
    }

    #[tokio::test]
    async fn test_cancel_order() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/cancel_order/", "true").await;
        let client = test_client(&server);

        client.cancel_order("10000").await.unwrap();

        let request = last_request(&server).await;
        assert_eq!(request.method.as_str(), "POST");
        let (keys, body) = body_keys(&request);
        assert_eq!(keys, vec!["id", "key", "signature", "nonce"]);
        assert_eq!(body["key"], "test_key");
        assert_eq!(body["id"], "10000");

        let nonce = body["nonce"].as_str().unwrap();
        assert_eq!(body["signature"], client.sign(nonce).as_str());
    }

    #[tokio::test]
    async fn test_cancel_order_error() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/cancel_order/", CANCEL_ORDER_NOT_FOUND).await;
        let client = test_client(&server);

        let err = client.cancel_order("10001").await.unwrap_err();
        match err {
            ExchangeError::RemoteExecution(cause) => assert_eq!(cause, "Error: Order not found"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_order_false_cannot_cancel() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/cancel_order/", "false").await;
        let client = test_client(&server);

        let err = client.cancel_order("10002").await.unwrap_err();
        assert!(matches!(err, ExchangeError::CannotCancel(ref id) if id == "10002"));
    }

    #[tokio::test]
    async fn test_place_order() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/place_order/XLM/BTC", PLACE_ORDER_RESPONSE).await;
        let client = test_client(&server);

        let placed = client
            .place_order(OrderSide::Buy, "XLM/BTC", d("10.575"), d("7700.58"))
            .await
            .unwrap();
        assert_eq!(placed.id, "8649363416");
        assert_eq!(placed.order_type, OrderSide::Buy);
        assert!(placed.complete);
        assert_eq!(placed.price, d("0.11"));
        assert_eq!(placed.amount, d("100"));
        assert_eq!(placed.pending, d("100"));
        assert_eq!(placed.time, 1555427005911);

        let (keys, body) = body_keys(&last_request(&server).await);
        assert_eq!(keys, vec!["type", "amount", "price", "key", "signature", "nonce"]);
        assert_eq!(body["type"], "buy");
        assert_eq!(body["amount"], "7700.58");
        assert_eq!(body["price"], "10.575");
    }

    #[tokio::test]
    async fn test_place_order_error() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/place_order/LTC/BTC", PLACE_ORDER_ERROR).await;
        let client = test_client(&server);

        let err = client
            .place_order(OrderSide::Buy, "LTC/BTC", d("100"), d("1200.57"))
            .await
            .unwrap_err();
        match err {
            ExchangeError::RemoteExecution(cause) => {
                assert_eq!(cause, "Error: Place order error: Insufficient funds.")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_get_done_order_info() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/get_order/", GET_ORDER_DONE_RESPONSE).await;
        let client = test_client(&server);

        let info = client.get_order_info("10000").await.unwrap();
        assert_eq!(info.id, "8544344631");
        assert_eq!(info.order_type, OrderSide::Sell);
        assert_eq!(info.time, 1554220564111);
        assert_eq!(info.last_tx_time.as_deref(), Some("2019-04-02T20:16:16.691Z"));
        assert_eq!(info.last_tx.as_deref(), Some("8545703401"));
        assert_eq!(info.user, "up120757206");
        assert_eq!(info.status, OrderStatus::Done);
        assert_eq!(info.price, d("220"));
        assert_eq!(info.remains, Decimal::ZERO);
        assert_eq!(info.symbol_1, "BTC");
        assert_eq!(info.symbol_2, "USD");
        assert_eq!(info.amount, d("1.53693924"));

        let (keys, body) = body_keys(&last_request(&server).await);
        assert_eq!(keys, vec!["id", "key", "signature", "nonce"]);
        assert_eq!(body["id"], "10000");
    }

    #[tokio::test]
    async fn test_get_not_found_order_info() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/get_order/", "null").await;
        let client = test_client(&server);

        let err = client.get_order_info("10003").await.unwrap_err();
        assert!(matches!(err, ExchangeError::OrderNotFound(ref id) if id == "10003"));
    }

    #[tokio::test]
    async fn test_get_order_info_remote_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "/get_order/",
            r#"{"error":"Got error when processing request. Try again later."}"#,
        )
        .await;
        let client = test_client(&server);

        let err = client.get_order_info("10000").await.unwrap_err();
        assert!(matches!(err, ExchangeError::RemoteExecution(_)));
    }

    #[tokio::test]
    async fn test_get_balance() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/balance/", BALANCE_RESPONSE).await;
        let client = test_client(&server);

        assert_eq!(client.get_balance("usd").await.unwrap(), d("1204.25"));
        assert_eq!(client.get_balance("BTC").await.unwrap(), d("1.38"));
        assert!(client.get_balance("ETH").await.is_err());

        let (keys, _) = body_keys(&last_request(&server).await);
        assert_eq!(keys, vec!["key", "signature", "nonce"]);
    }

    #[tokio::test]
    async fn test_non_200_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ticker/LTC/USD"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let client = test_client(&server);

        let err = client.get_ticker("LTC/USD").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Server { status: 502 }));
    }

    #[tokio::test]
    async fn test_unknown_status_is_parse_error() {
        let server = MockServer::start().await;
        let body = GET_ORDER_DONE_RESPONSE.replace(r#""status":"d""#, r#""status":"x""#);
        mount(&server, "POST", "/get_order/", &body).await;
        let client = test_client(&server);

        let err = client.get_order_info("10000").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Parse(_)));
        assert!(err.to_string().contains("\"x\""));
    }

    #[tokio::test]
    async fn test_from_config_uses_credentials_and_base_url() {
        let server = MockServer::start().await;
        mount(&server, "POST", "/balance/", BALANCE_RESPONSE).await;

        let mut exchange_config = ExchangeConfig::default();
        exchange_config.base_url = Some(server.uri());
        exchange_config.username = "up120757206".to_string();
        exchange_config.api_key = "cfg_key".to_string();
        exchange_config.api_secret = "cfg_secret".to_string();

        let client = Client::from_config(&exchange_config).unwrap();
        assert_eq!(client.config.timeout, REQUEST_TIMEOUT);

        client.get_balance("btc").await.unwrap();
        let request = last_request(&server).await;
        let (_, body) = body_keys(&request);
        assert_eq!(body["key"], "cfg_key");
        assert_eq!(
            request.headers.get("user-agent").unwrap().to_str().unwrap(),
            "bot-cex.io-up120757206"
        );
    }

    #[tokio::test]
    async fn test_get_order_info_error_with_malformed_data_is_remote_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "/get_order/",
            r#"{"error": "Error: Order not found", "data": {"id": "10000"}}"#,
        )
        .await;
        let client = test_client(&server);

        let err = client.get_order_info("10000").await.unwrap_err();
        assert!(
            matches!(err, ExchangeError::RemoteExecution(ref msg) if msg == "Error: Order not found")
        );
    }
}
