use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const KUCOIN_API_BASE: &str = "https://api.kucoin.com";
const SUCCESS_CODE: &str = "200000";

/// Client for the KuCoin public level-1 ticker
///
/// One request per call and no retries: callers decide when to try again.
#[derive(Clone)]
pub struct KucoinClient {
    client: Client,
    base_url: String,
}

/// Last traded price for a pair
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<TickerData>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    price: Option<NumberOrString>,
    /// Milliseconds since epoch
    #[serde(default)]
    time: Option<i64>,
}

/// KuCoin quotes prices as strings; accept plain numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn to_f64(&self) -> Result<f64> {
        match self {
            NumberOrString::Number(n) => Ok(*n),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid price string '{}'", s)),
        }
    }
}

impl KucoinClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the current price for a pair such as `BTC-USDT`
    pub async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let url = format!(
            "{}/api/v1/market/orderbook/level1?symbol={}",
            self.base_url, symbol
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Ticker request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("KuCoin API error ({})", status);
        }

        let body: TickerResponse = response
            .json()
            .await
            .context("Failed to parse ticker response")?;

        if body.code != SUCCESS_CODE {
            anyhow::bail!(
                "KuCoin returned code {}: {}",
                body.code,
                body.msg.unwrap_or_default()
            );
        }

        let data = body
            .data
            .with_context(|| format!("No ticker data for {}", symbol))?;
        let price = data
            .price
            .with_context(|| format!("Ticker for {} has no price", symbol))?
            .to_f64()?;

        if !price.is_finite() || price <= 0.0 {
            anyhow::bail!("Non-positive price {} for {}", price, symbol);
        }

        let timestamp = data
            .time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Ok(Ticker {
            symbol: symbol.to_string(),
            price,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> KucoinClient {
        KucoinClient::new(server.url(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_parses_string_price() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::UrlEncoded(
                "symbol".into(),
                "BTC-USDT".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"code":"200000","data":{"time":1704067200000,"sequence":"1","price":"42150.5","size":"0.01"}}"#,
            )
            .create_async()
            .await;

        let ticker = client_for(&server).get_ticker("BTC-USDT").await.unwrap();

        assert_eq!(ticker.price, 42150.5);
        assert_eq!(ticker.symbol, "BTC-USDT");
        assert_eq!(ticker.timestamp.timestamp(), 1_704_067_200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_parses_numeric_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"price":101.25}}"#)
            .create_async()
            .await;

        let ticker = client_for(&server).get_ticker("ETH-USDT").await.unwrap();
        assert_eq!(ticker.price, 101.25);
    }

    #[tokio::test]
    async fn test_error_code_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"400100","msg":"Unsupported trading pair","data":null}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_ticker("NOPE-USDT").await.unwrap_err();
        assert!(err.to_string().contains("400100"));
    }

    #[tokio::test]
    async fn test_http_error_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = client_for(&server).get_ticker("BTC-USDT").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_garbage_price_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"price":"n/a"}}"#)
            .create_async()
            .await;

        assert!(client_for(&server).get_ticker("BTC-USDT").await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires live API
    async fn test_get_ticker_live() {
        let client = KucoinClient::new(KUCOIN_API_BASE, Duration::from_secs(10)).unwrap();
        let ticker = client.get_ticker("BTC-USDT").await.unwrap();
        assert!(ticker.price > 0.0);
    }
}
