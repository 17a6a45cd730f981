use super::MarketDataProvider;
use crate::config::MarketDataConfig;
use crate::models::{exchange_symbol, Bar};
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
/// Exchange page size for /api/v3/klines
const KLINE_LIMIT: usize = 1000;
const MS_PER_DAY: i64 = 86_400_000;

type KlineRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Historical close prices from a Binance-compatible klines endpoint
///
/// Cloneable; clones share the rate limiter.
#[derive(Clone)]
pub struct BinanceKlineClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<KlineRateLimiter>,
    max_retries: u32,
    backoff_unit: Duration,
}

impl BinanceKlineClient {
    pub fn new(base_url: impl Into<String>, rate_limit_rpm: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        let rpm = NonZeroU32::new(rate_limit_rpm).context("rate_limit_rpm must be positive")?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
            max_retries: MAX_RETRIES,
            backoff_unit: Duration::from_secs(1),
        })
    }

    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.rate_limit_rpm)
    }

    /// Shrink retry backoff, for tests against a local server
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Make a rate-limited request, retrying 429 / 5xx / network errors with exponential backoff
    async fn make_request(&self, url: &str) -> Result<reqwest::Response> {
        for attempt in 1..=self.max_retries {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let backoff = self.backoff_unit * 2u32.pow(attempt);
                        tracing::warn!(
                            "Klines request returned {}, retrying in {:?} (attempt {}/{})",
                            status,
                            backoff,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("Klines API error ({}): {}", status, error_text);
                }
                Err(e) if attempt < self.max_retries => {
                    let backoff = self.backoff_unit * 2u32.pow(attempt);
                    tracing::warn!(
                        "Network error: {}, retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => anyhow::bail!("Network error after {} retries: {}", self.max_retries, e),
            }
        }

        anyhow::bail!("Failed after {} retries", self.max_retries)
    }

    /// Page through klines from `period_days` ago until now
    pub async fn try_fetch(&self, instrument: &str, period_days: u32, interval: &str) -> Result<Vec<Bar>> {
        let symbol = exchange_symbol(instrument);
        let end = Utc::now().timestamp_millis();
        let mut start = end - i64::from(period_days) * MS_PER_DAY;
        let mut bars = Vec::new();

        loop {
            let url = format!(
                "{}/api/v3/klines?symbol={}&interval={}&startTime={}&endTime={}&limit={}",
                self.base_url, symbol, interval, start, end, KLINE_LIMIT
            );

            let page: Vec<Vec<Value>> = self
                .make_request(&url)
                .await?
                .json()
                .await
                .context("Failed to parse klines response")?;

            let page_len = page.len();
            for row in &page {
                bars.push(parse_kline(row)?);
            }

            match bars.last() {
                Some(last) if page_len >= KLINE_LIMIT => {
                    start = last.timestamp.timestamp_millis() + 1;
                }
                _ => break,
            }
        }

        tracing::debug!("Fetched {} bars for {} ({})", bars.len(), symbol, interval);
        Ok(bars)
    }
}

/// `[open_time_ms, "open", "high", "low", "close", ...]` -> Bar at the open time
fn parse_kline(row: &[Value]) -> Result<Bar> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .context("kline missing open time")?;
    let close = row
        .get(4)
        .and_then(Value::as_str)
        .context("kline missing close")?;

    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .context("kline open time out of range")?;
    let close = Decimal::from_str(close).with_context(|| format!("invalid close price {}", close))?;

    Ok(Bar::new(timestamp, close))
}

impl MarketDataProvider for BinanceKlineClient {
    async fn fetch_series(&self, instrument: &str, period_days: u32, interval: &str) -> Vec<Bar> {
        match self.try_fetch(instrument, period_days, interval).await {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!("Failed to fetch {} klines: {:#}", instrument, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn client(url: &str) -> BinanceKlineClient {
        BinanceKlineClient::new(url, 6000)
            .unwrap()
            .with_backoff_unit(Duration::from_millis(1))
    }

    #[test]
    fn test_parse_kline() {
        let row = json!([1700000000000i64, "0.00001", "0.000011", "0.0000095", "0.00001050", "123", 1700003599999i64]);
        let bar = parse_kline(row.as_array().unwrap()).unwrap();

        assert_eq!(bar.close, dec!(0.00001050));
        assert_eq!(bar.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_parse_kline_rejects_garbage() {
        let row = json!([1700000000000i64, "1", "1", "1", "not-a-price"]);
        assert!(parse_kline(row.as_array().unwrap()).is_err());
        assert!(parse_kline(&[]).is_err());
    }

    #[tokio::test]
    async fn test_fetch_series_maps_symbol() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "SHIBUSD".into()),
                Matcher::UrlEncoded("interval".into(), "1h".into()),
            ]))
            .with_status(200)
            .with_body(
                json!([
                    [1700000000000i64, "1", "1", "1", "0.000010", "1"],
                    [1700003600000i64, "1", "1", "1", "0.000011", "1"]
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let bars = client(&server.url()).fetch_series("SHIB-USD", 1, "1h").await;

        mock.assert_async().await;
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, dec!(0.000011));
    }

    #[tokio::test]
    async fn test_fetch_series_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(MAX_RETRIES as usize)
            .create_async()
            .await;

        let bars = client(&server.url()).fetch_series("SHIB-USD", 1, "1h").await;

        failing.assert_async().await;
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_series_empty_on_client_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
            .create_async()
            .await;

        let bars = client(&server.url()).fetch_series("NOPE-USD", 1, "1h").await;
        assert!(bars.is_empty());
    }
}
