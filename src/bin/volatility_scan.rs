use std::sync::Arc;

use market_scan::config::{
    ScanConfig, QUOTE_SUFFIX, RATE_CAPACITY_PER_MINUTE, SUBSET_SIZE, TOP_MARKET_COUNT,
    WORKSHEET_NAME,
};
use market_scan::exchange::{BinanceClient, PriceSeries};
use market_scan::fetch::SeriesFetcher;
use market_scan::markets::MarketSelector;
use market_scan::rate::RateGate;
use market_scan::report::{charts, SheetsClient};
use market_scan::volatility::{self, RankedEntry};
use market_scan::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ScanConfig::from_env()?;
    let client = Arc::new(BinanceClient::new(&config.api_key));
    let gate = Arc::new(RateGate::new(RATE_CAPACITY_PER_MINUTE));

    let selector = MarketSelector::new(Arc::clone(&client), Arc::clone(&gate), QUOTE_SUFFIX);
    let symbols = selector.select_top(TOP_MARKET_COUNT).await?;

    let fetcher = SeriesFetcher::new(client, gate);
    let results = fetcher.fetch_all(symbols).await;

    let ranked = volatility::rank(&results);
    let top = volatility::top_n(&ranked, SUBSET_SIZE);
    let bottom = volatility::bottom_n(&ranked, SUBSET_SIZE);

    if !top.is_empty() {
        let sheets = SheetsClient::connect(&config.credentials, &config.spreadsheet_id).await?;
        sheets.publish(WORKSHEET_NAME, &top).await?;
    }

    if !top.is_empty() {
        charts::render_comparison(
            &subset_series(&results, &top),
            "Top 10 Most Volatile Coins",
            "top_10_volatile",
        )?;
    }
    if !bottom.is_empty() {
        charts::render_comparison(
            &subset_series(&results, &bottom),
            "Top 10 Least Volatile Coins",
            "bottom_10_volatile",
        )?;
    }

    log::info!("Scan completed successfully.");
    Ok(())
}

/// Pairs each ranked entry back with its fetched series, skipping entries
/// whose series went missing along the way.
fn subset_series(
    results: &[(String, Option<PriceSeries>)],
    entries: &[RankedEntry],
) -> Vec<(String, PriceSeries)> {
    entries
        .iter()
        .filter_map(|entry| {
            results
                .iter()
                .find(|(symbol, _)| *symbol == entry.symbol)
                .and_then(|(symbol, series)| {
                    series.clone().map(|series| (symbol.clone(), series))
                })
        })
        .collect()
}
