use super::gateway::{ExchangeGateway, OrderConfirmation, OrderRequest, PRICE_DECIMALS};
use crate::error::GatewayError;
use crate::models::exchange_symbol;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_VAR: &str = "BINANCE_US_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_US_API_SECRET";

#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Credentials come from `BINANCE_US_API_KEY` / `BINANCE_US_API_SECRET`
    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| GatewayError::MissingCredentials(API_KEY_VAR))?;
        let api_secret =
            std::env::var(API_SECRET_VAR).map_err(|_| GatewayError::MissingCredentials(API_SECRET_VAR))?;
        Ok(Self::new(api_key, api_secret))
    }

    /// Lowercase hex HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &str) -> Result<String, GatewayError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| GatewayError::Rejected(format!("invalid signing key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: u64,
}

/// Signed limit-order submission against a Binance-compatible REST API
///
/// Uses the blocking client; build it on the thread that will submit orders,
/// never inside an async context.
pub struct BinanceGateway {
    client: reqwest::blocking::Client,
    base_url: String,
    credentials: Credentials,
}

impl BinanceGateway {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn signed_query(&self, order: &OrderRequest, timestamp_ms: i64) -> Result<String, GatewayError> {
        let query = format!(
            "symbol={}&side={}&type=LIMIT&timeInForce=GTC&quantity={}&price={}&timestamp={}",
            exchange_symbol(&order.instrument),
            order.side.as_str(),
            order.quantity.round_dp(PRICE_DECIMALS).normalize(),
            order.price.round_dp(PRICE_DECIMALS).normalize(),
            timestamp_ms
        );
        let signature = self.credentials.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }
}

impl ExchangeGateway for BinanceGateway {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, GatewayError> {
        let query = self.signed_query(order, chrono::Utc::now().timestamp_millis())?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(GatewayError::from_api_response(status.as_u16(), &body));
        }

        let parsed: NewOrderResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Rejected(format!("unreadable order response: {}", e)))?;

        tracing::info!(
            symbol = %exchange_symbol(&order.instrument),
            side = %order.side,
            quantity = %order.quantity,
            price = %order.price,
            order_id = parsed.order_id,
            "Order placed"
        );

        Ok(OrderConfirmation {
            order_id: parsed.order_id.to_string(),
            instrument: order.instrument.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
        })
    }
}
