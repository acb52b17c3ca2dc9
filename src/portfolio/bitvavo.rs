use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::{AppError, Context, Result};

type HmacSha256 = Hmac<Sha256>;

const BASE_URL: &str = "https://api.bitvavo.com/v2";
const ACCESS_WINDOW_MS: &str = "10000";
const RATE_LIMIT_HEADER: &str = "bitvavo-ratelimit-remaining";

/// One asset line of the account balance. Amounts arrive as decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub symbol: String,
    pub available: String,
    pub in_order: String,
}

/// Bitvavo REST client with per-request HMAC signing.
pub struct BitvavoClient {
    http: reqwest::Client,
    api_key: String,
    api_secret: String,
    remaining_limit: AtomicI64,
}

impl BitvavoClient {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            remaining_limit: AtomicI64::new(-1),
        }
    }

    pub async fn balance(&self) -> Result<Vec<AssetBalance>> {
        self.signed_get("/balance").await
    }

    /// Latest price for a market like "BTC-EUR", or `None` when the exchange
    /// has no price for it.
    pub async fn ticker_price(&self, market: &str) -> Result<Option<f64>> {
        let payload: Value = self
            .signed_get(&format!("/ticker/price?market={}", market))
            .await?;

        match payload.get("price").and_then(Value::as_str) {
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|_| AppError::message(format!("Unparseable price for {}", market))),
            None => Ok(None),
        }
    }

    /// Rate-limit budget the exchange reported on the most recent response,
    /// if any response has been seen yet.
    pub fn remaining_limit(&self) -> Option<i64> {
        match self.remaining_limit.load(Ordering::SeqCst) {
            v if v >= 0 => Some(v),
            _ => None,
        }
    }

    async fn signed_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let timestamp = Utc::now().timestamp_millis();
        let signature = sign_request(&self.api_secret, timestamp, "GET", path, "")?;

        let response = self
            .http
            .get(format!("{}{}", BASE_URL, path))
            .header("Bitvavo-Access-Key", &self.api_key)
            .header("Bitvavo-Access-Signature", signature)
            .header("Bitvavo-Access-Timestamp", timestamp.to_string())
            .header("Bitvavo-Access-Window", ACCESS_WINDOW_MS)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", path))?;

        if let Some(remaining) = response
            .headers()
            .get(RATE_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
        {
            self.remaining_limit.store(remaining, Ordering::SeqCst);
        }

        let response = response
            .error_for_status()
            .with_context(|| format!("Request returned error status for {}", path))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response for {}", path))
            .map_err(AppError::from)
    }
}

/// Signature over `{timestamp}{method}/v2{path}{body}`, hex-encoded
/// HMAC-SHA256 under the API secret.
fn sign_request(
    secret: &str,
    timestamp: i64,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::message("Invalid API secret for HMAC signing"))?;
    mac.update(format!("{}{}/v2{}{}", timestamp, method, path, body).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_request_payload() {
        let signature = sign_request("test-secret", 1_700_000_000_000, "GET", "/balance", "")
            .unwrap();

        assert_eq!(
            signature,
            "3966a420aff1d4a3e7f5de57ce3085e6e62b50b8e0ed47d4aded4ff1ddbf8118"
        );
    }

    #[test]
    fn parses_balance_entries() {
        let payload = r#"[
            {"symbol": "EUR", "available": "120.50", "inOrder": "0"},
            {"symbol": "BTC", "available": "0.5", "inOrder": "0.1"}
        ]"#;

        let balance: Vec<AssetBalance> = serde_json::from_str(payload).unwrap();

        assert_eq!(balance.len(), 2);
        assert_eq!(balance[0].symbol, "EUR");
        assert_eq!(balance[1].in_order, "0.1");
    }
}
