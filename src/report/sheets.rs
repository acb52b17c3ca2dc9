use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Context, Result};
use crate::volatility::RankedEntry;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Service-account key material, parsed from the decoded credential blob.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize)]
struct TokenClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Google Sheets client holding a short-lived access token obtained via the
/// service-account JWT-bearer grant.
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub async fn connect(key: &ServiceAccountKey, spreadsheet_id: &str) -> Result<Self> {
        let http = reqwest::Client::new();
        let access_token = fetch_access_token(&http, key).await?;
        log::info!("Successfully authenticated with Google Sheets.");

        Ok(Self {
            http,
            access_token,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    /// Overwrites `worksheet` with the ranked entries: clears the old
    /// contents, then appends the header plus one timestamped row per entry.
    /// An empty entry list still writes the header.
    pub async fn publish(&self, worksheet: &str, entries: &[RankedEntry]) -> Result<()> {
        self.clear(worksheet).await?;

        let rows = build_rows(entries, Utc::now());
        self.append_rows(worksheet, &rows).await?;

        log::info!(
            "Successfully cleared and updated {} sheet ({} rows).",
            worksheet,
            rows.len()
        );
        Ok(())
    }

    async fn clear(&self, worksheet: &str) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}:clear",
            SHEETS_BASE_URL, self.spreadsheet_id, worksheet
        );

        self.http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await
            .with_context(|| format!("Failed to clear worksheet {}", worksheet))?
            .error_for_status()
            .with_context(|| format!("Clearing worksheet {} returned error status", worksheet))?;

        Ok(())
    }

    async fn append_rows(&self, worksheet: &str, rows: &[Vec<String>]) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            SHEETS_BASE_URL, self.spreadsheet_id, worksheet
        );

        self.http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": rows }))
            .send()
            .await
            .with_context(|| format!("Failed to append rows to worksheet {}", worksheet))?
            .error_for_status()
            .with_context(|| format!("Appending to worksheet {} returned error status", worksheet))?;

        Ok(())
    }
}

async fn fetch_access_token(http: &reqwest::Client, key: &ServiceAccountKey) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + 3600,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| AppError::message(format!("Invalid service account private key: {}", e)))?;
    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| AppError::message(format!("Failed to sign token assertion: {}", e)))?;

    let response: Value = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
        .send()
        .await
        .context("Token request failed")?
        .error_for_status()
        .context("Token request returned error status")?
        .json()
        .await
        .context("Failed to parse token response")?;

    response["access_token"]
        .as_str()
        .map(|t| t.to_string())
        .ok_or_else(|| AppError::message("Token response missing access_token"))
}

/// Fixed-schema row set: header plus one row per entry, all stamped with the
/// same UTC time.
fn build_rows(entries: &[RankedEntry], stamp: DateTime<Utc>) -> Vec<Vec<String>> {
    let timestamp = stamp.format("%Y-%m-%d %H:%M:%S").to_string();

    let mut rows = Vec::with_capacity(entries.len() + 1);
    rows.push(vec![
        "Timestamp".to_string(),
        "Symbol".to_string(),
        "Volatility".to_string(),
    ]);
    for entry in entries {
        rows.push(vec![
            timestamp.clone(),
            entry.symbol.clone(),
            entry.score.to_string(),
        ]);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_entry_list_still_produces_header() {
        let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let rows = build_rows(&[], stamp);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["Timestamp", "Symbol", "Volatility"]);
    }

    #[test]
    fn rows_carry_shared_timestamp_and_scores() {
        let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        let entries = vec![
            RankedEntry {
                symbol: "BTCUSDT".to_string(),
                score: 0.25,
            },
            RankedEntry {
                symbol: "ETHUSDT".to_string(),
                score: 0.125,
            },
        ];

        let rows = build_rows(&entries, stamp);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "2024-05-01 12:30:45");
        assert_eq!(rows[1][1], "BTCUSDT");
        assert_eq!(rows[1][2], "0.25");
        assert_eq!(rows[2][0], rows[1][0]);
        assert_eq!(rows[2][1], "ETHUSDT");
    }

    #[test]
    fn token_uri_defaults_when_absent() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email": "a@b.c", "private_key": "pk"}"#,
        )
        .unwrap();

        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }
}
