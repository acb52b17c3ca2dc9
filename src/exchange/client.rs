use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::error::{Context, Result};
use crate::exchange::models::{parse_klines, PricePoint, Ticker24h};

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// The klines endpoint caps one response at this many rows, so a 24h window
/// of 1-minute candles takes two pages.
const KLINES_PAGE_LIMIT: usize = 1000;
const MINUTE_MS: i64 = 60_000;

/// Thin REST client over the exchange's public market-data endpoints.
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert("X-MBX-APIKEY", value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 24h statistics for every market on the exchange.
    pub async fn ticker_24h(&self) -> Result<Vec<Ticker24h>> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);

        let tickers = self
            .http
            .get(&url)
            .send()
            .await
            .context("Ticker request failed")?
            .error_for_status()
            .context("Ticker request returned error status")?
            .json::<Vec<Ticker24h>>()
            .await
            .context("Failed to parse ticker payload")?;

        Ok(tickers)
    }

    /// 1-minute close prices for `symbol` over `[start_ms, end_ms)`,
    /// following the page limit until the window is exhausted.
    pub async fn klines(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<PricePoint>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut points = Vec::new();
        let mut cursor = start_ms;

        while cursor < end_ms {
            let payload: Value = self
                .http
                .get(&url)
                .query(&[("symbol", symbol), ("interval", "1m")])
                .query(&[
                    ("startTime", cursor.to_string()),
                    ("endTime", end_ms.to_string()),
                    ("limit", KLINES_PAGE_LIMIT.to_string()),
                ])
                .send()
                .await
                .with_context(|| format!("Klines request failed for {}", symbol))?
                .error_for_status()
                .with_context(|| format!("Klines request returned error status for {}", symbol))?
                .json()
                .await
                .with_context(|| format!("Failed to read klines payload for {}", symbol))?;

            let page = parse_klines(&payload)?;
            let Some(last) = page.last() else {
                break;
            };

            cursor = last.open_time.timestamp_millis() + MINUTE_MS;
            let page_len = page.len();
            points.extend(page);

            if page_len < KLINES_PAGE_LIMIT {
                break;
            }
        }

        Ok(points)
    }
}
