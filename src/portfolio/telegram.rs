use chrono::{DateTime, Local};
use serde_json::json;

use crate::error::{Context, Result};
use crate::portfolio::PortfolioSnapshot;

const API_BASE_URL: &str = "https://api.telegram.org";

/// Minimal Telegram Bot API client, enough to push one Markdown message.
pub struct TelegramBot {
    http: reqwest::Client,
    token: String,
    chat_id: String,
}

impl TelegramBot {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", API_BASE_URL, self.token);

        self.http
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .context("Telegram request failed")?
            .error_for_status()
            .context("Telegram request returned error status")?;

        Ok(())
    }
}

/// Renders the portfolio snapshot as the Markdown message body.
pub fn format_portfolio_message(snapshot: &PortfolioSnapshot, stamp: DateTime<Local>) -> String {
    let mut message = format!(
        "\u{1F4CA} *Bitvavo Portfolio Update* ({})\n\n",
        stamp.format("%Y-%m-%d %H:%M:%S")
    );
    message.push_str(&format!(
        "\u{1F4B0} *Total Portfolio Value*: {:.2} EUR\n\n",
        snapshot.total_eur
    ));
    message.push_str("\u{1F4C8} *Asset Details*:\n");
    for asset in &snapshot.assets {
        message.push_str(&format!(
            "- {}: {:.6} ({:.2} EUR)\n",
            asset.symbol, asset.amount, asset.value_eur
        ));
    }
    message.push_str(&format!(
        "\n\u{1F512} *Remaining Rate Limit*: {}",
        snapshot
            .remaining_limit
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    ));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::AssetValue;
    use chrono::TimeZone;

    #[test]
    fn formats_snapshot_into_markdown_body() {
        let snapshot = PortfolioSnapshot {
            total_eur: 1234.567,
            assets: vec![
                AssetValue {
                    symbol: "EUR".to_string(),
                    amount: 120.5,
                    value_eur: 120.5,
                },
                AssetValue {
                    symbol: "BTC".to_string(),
                    amount: 0.6,
                    value_eur: 1114.07,
                },
            ],
            remaining_limit: Some(987),
        };
        let stamp = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

        let message = format_portfolio_message(&snapshot, stamp);

        assert!(message.contains("*Bitvavo Portfolio Update* (2024-05-01 09:30:00)"));
        assert!(message.contains("*Total Portfolio Value*: 1234.57 EUR"));
        assert!(message.contains("- EUR: 120.500000 (120.50 EUR)"));
        assert!(message.contains("- BTC: 0.600000 (1114.07 EUR)"));
        assert!(message.contains("*Remaining Rate Limit*: 987"));
    }

    #[test]
    fn unknown_rate_limit_is_spelled_out() {
        let snapshot = PortfolioSnapshot {
            total_eur: 0.0,
            assets: Vec::new(),
            remaining_limit: None,
        };

        let message = format_portfolio_message(&snapshot, Local::now());

        assert!(message.contains("*Remaining Rate Limit*: unknown"));
    }
}
