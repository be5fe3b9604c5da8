use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::future::Future;
use std::path::Path;

use crate::api::KucoinClient;
use crate::error::{BotError, FeedError};
use crate::models::PriceSample;
use crate::settings::FeedSettings;
use crate::Result;

/// Source of price samples for the control loop
///
/// Implementations never retry; a failure is reported once and the caller
/// tries again on its next tick.
pub trait PriceFeed: Send {
    fn fetch(&mut self) -> impl Future<Output = std::result::Result<PriceSample, FeedError>> + Send;

    fn name(&self) -> &str;
}

/// Polls the exchange ticker, one request per fetch
pub struct LiveFeed {
    client: KucoinClient,
    symbol: String,
}

impl LiveFeed {
    pub fn new(settings: &FeedSettings) -> Result<Self> {
        let client = KucoinClient::new(settings.base_url.clone(), settings.timeout())
            .map_err(|e| BotError::Config(format!("{:#}", e)))?;

        Ok(Self {
            client,
            symbol: settings.symbol.clone(),
        })
    }
}

impl PriceFeed for LiveFeed {
    async fn fetch(&mut self) -> std::result::Result<PriceSample, FeedError> {
        let ticker = self
            .client
            .get_ticker(&self.symbol)
            .await
            .map_err(|e| FeedError::Unavailable(format!("{:#}", e)))?;

        tracing::debug!(
            symbol = %ticker.symbol,
            exchange_time = %ticker.timestamp,
            price = ticker.price,
            "Ticker received"
        );

        // Stamp with observation time so samples stay monotonic across polls
        PriceSample::new(Utc::now(), ticker.price)
            .map_err(|e| FeedError::Unavailable(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.symbol
    }
}

/// Replays a pre-loaded, ascending-time series of closes
#[derive(Debug, Clone)]
pub struct HistoricalFeed {
    samples: Vec<PriceSample>,
    cursor: usize,
}

impl HistoricalFeed {
    pub fn new(mut samples: Vec<PriceSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp());
        Self { samples, cursor: 0 }
    }

    /// Load a candle CSV with at least `time` and `close` columns
    ///
    /// Accepted time formats: RFC 3339, `YYYY-mm-dd HH:MM[:SS]`, or unix seconds.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| {
            BotError::HistoricalData(format!("failed to open {}: {}", path.display(), e))
        })?;

        let headers = rdr
            .headers()
            .map_err(|e| BotError::HistoricalData(format!("CSV header error: {}", e)))?
            .clone();
        let column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let time_idx = column(&["time", "timestamp", "date"])
            .ok_or_else(|| BotError::HistoricalData("missing time column".into()))?;
        let close_idx = column(&["close"])
            .ok_or_else(|| BotError::HistoricalData("missing close column".into()))?;

        let mut samples = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| BotError::HistoricalData(format!("CSV parse error: {}", e)))?;

            let time_str = record.get(time_idx).unwrap_or_default();
            let timestamp = parse_time(time_str).ok_or_else(|| {
                BotError::HistoricalData(format!("row {}: invalid time '{}'", row + 1, time_str))
            })?;

            let close: f64 = record
                .get(close_idx)
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|e| {
                    BotError::HistoricalData(format!("row {}: invalid close value: {}", row + 1, e))
                })?;

            let sample = PriceSample::new(timestamp, close).map_err(|e| {
                BotError::HistoricalData(format!("row {}: {}", row + 1, e))
            })?;
            samples.push(sample);
        }

        tracing::info!("Loaded {} candles from {}", samples.len(), path.display());

        Ok(Self::new(samples))
    }

    /// Next sample without going through the async contract (backtests)
    pub fn next_sample(&mut self) -> Option<PriceSample> {
        let sample = self.samples.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(sample)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.cursor
    }

    pub fn samples(&self) -> &[PriceSample] {
        &self.samples
    }
}

impl PriceFeed for HistoricalFeed {
    async fn fetch(&mut self) -> std::result::Result<PriceSample, FeedError> {
        self.next_sample().ok_or(FeedError::Exhausted)
    }

    fn name(&self) -> &str {
        "historical"
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_historical_replays_in_time_order() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let samples = vec![
            PriceSample::new(t0 + Duration::minutes(10), 102.0).unwrap(),
            PriceSample::new(t0, 100.0).unwrap(),
            PriceSample::new(t0 + Duration::minutes(5), 101.0).unwrap(),
        ];
        let mut feed = HistoricalFeed::new(samples);

        assert_eq!(feed.len(), 3);
        assert_eq!(feed.next_sample().unwrap().price(), 100.0);
        assert_eq!(feed.next_sample().unwrap().price(), 101.0);
        assert_eq!(feed.remaining(), 1);
        assert_eq!(feed.next_sample().unwrap().price(), 102.0);
        assert!(feed.next_sample().is_none());
    }

    #[test]
    fn test_historical_fetch_reports_exhaustion() {
        let sample = PriceSample::new(Utc::now(), 100.0).unwrap();
        let mut feed = HistoricalFeed::new(vec![sample]);

        assert_eq!(tokio_test::block_on(feed.fetch()), Ok(sample));
        assert_eq!(tokio_test::block_on(feed.fetch()), Err(FeedError::Exhausted));
    }

    #[test]
    fn test_from_csv() {
        let file = write_csv(
            "time,open,high,low,close,volume\n\
             2024-01-01 00:05:00,100,101,99,100.5,10\n\
             2024-01-01 00:00:00,99,100,98,99.5,12\n\
             2024-01-01T00:10:00Z,100,103,100,102.25,8\n",
        );

        let feed = HistoricalFeed::from_csv(file.path()).unwrap();
        let prices: Vec<f64> = feed.samples().iter().map(|s| s.price()).collect();

        assert_eq!(prices, vec![99.5, 100.5, 102.25]);
    }

    #[test]
    fn test_from_csv_header_only_is_empty() {
        let file = write_csv("time,close\n");

        let feed = HistoricalFeed::from_csv(file.path()).unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_from_csv_unix_seconds() {
        let file = write_csv("timestamp,close\n1704067200,42000\n1704067500,42100\n");

        let feed = HistoricalFeed::from_csv(file.path()).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.samples()[0].timestamp().timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_from_csv_requires_close_column() {
        let file = write_csv("time,open\n2024-01-01 00:00:00,100\n");

        let err = HistoricalFeed::from_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn test_from_csv_rejects_non_positive_close() {
        let file = write_csv("time,close\n2024-01-01 00:00:00,0\n");

        let err = HistoricalFeed::from_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_parse_time_formats() {
        assert!(parse_time("2024-01-01 12:30").is_some());
        assert!(parse_time("2024-01-01T12:30:00+02:00").is_some());
        assert!(parse_time("not a date").is_none());
    }

    #[tokio::test]
    async fn test_live_feed_failure_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let settings = FeedSettings {
            base_url: server.url(),
            symbol: "BTC-USDT".to_string(),
            timeout_secs: 2,
        };
        let mut feed = LiveFeed::new(&settings).unwrap();

        assert!(matches!(feed.fetch().await, Err(FeedError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_live_feed_timeout_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_secs(3));
                w.write_all(br#"{"code":"200000","data":{"price":"43000.10"}}"#)
            })
            .create_async()
            .await;

        let settings = FeedSettings {
            base_url: server.url(),
            symbol: "BTC-USDT".to_string(),
            timeout_secs: 1,
        };
        let mut feed = LiveFeed::new(&settings).unwrap();

        let started = std::time::Instant::now();
        let result = feed.fetch().await;

        assert!(matches!(result, Err(FeedError::Unavailable(_))), "{:?}", result);
        assert!(started.elapsed() < std::time::Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_live_feed_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/market/orderbook/level1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"price":"43000.10"}}"#)
            .create_async()
            .await;

        let settings = FeedSettings {
            base_url: server.url(),
            symbol: "BTC-USDT".to_string(),
            timeout_secs: 2,
        };
        let mut feed = LiveFeed::new(&settings).unwrap();

        let sample = feed.fetch().await.unwrap();
        assert_eq!(sample.price(), 43000.10);
        assert_eq!(feed.name(), "BTC-USDT");
    }
}
