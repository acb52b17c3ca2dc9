use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::TICKER_WEIGHT;
use crate::error::Result;
use crate::exchange::{BinanceClient, Ticker24h};
use crate::rate::RateGate;

/// Picks the most liquid markets settling in the configured quote currency.
pub struct MarketSelector {
    client: Arc<BinanceClient>,
    gate: Arc<RateGate>,
    quote_suffix: String,
}

impl MarketSelector {
    pub fn new(client: Arc<BinanceClient>, gate: Arc<RateGate>, quote_suffix: &str) -> Self {
        Self {
            client,
            gate,
            quote_suffix: quote_suffix.to_string(),
        }
    }

    /// The top `n` symbols by 24h quoted volume. One metered ticker call;
    /// upstream failures propagate without retry.
    pub async fn select_top(&self, n: usize) -> Result<Vec<String>> {
        self.gate.acquire(TICKER_WEIGHT).await;
        let tickers = self.client.ticker_24h().await?;

        let top = top_by_quote_volume(tickers, &self.quote_suffix, n);
        log::info!("Retrieved {} liquid markets.", top.len());
        Ok(top)
    }
}

fn top_by_quote_volume(tickers: Vec<Ticker24h>, suffix: &str, n: usize) -> Vec<String> {
    let mut pairs: Vec<(String, f64)> = tickers
        .into_iter()
        .filter(|t| t.symbol.ends_with(suffix))
        .map(|t| {
            let volume = t.quote_volume_f64();
            (t.symbol, volume)
        })
        .collect();

    // Stable sort keeps upstream order for equal volumes.
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    pairs.into_iter().take(n).map(|(symbol, _)| symbol).collect()
}
