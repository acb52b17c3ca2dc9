pub mod bitvavo;
pub mod telegram;

pub use bitvavo::BitvavoClient;
pub use telegram::TelegramBot;

use crate::error::{AppError, Result};

/// One asset's holding, valued in the reference currency.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetValue {
    pub symbol: String,
    pub amount: f64,
    pub value_eur: f64,
}

#[derive(Debug, Clone)]
pub struct PortfolioSnapshot {
    pub total_eur: f64,
    pub assets: Vec<AssetValue>,
    pub remaining_limit: Option<i64>,
}

/// Values the whole account in EUR. EUR itself counts at its available
/// amount; every other asset is valued at its `SYMBOL-EUR` ticker price.
/// A missing or failed price lookup values the asset at zero and logs it;
/// it never aborts the snapshot.
pub async fn snapshot(client: &BitvavoClient) -> Result<PortfolioSnapshot> {
    let balance = client.balance().await?;
    log::info!("Retrieved balance information.");

    let mut total_eur = 0.0;
    let mut assets = Vec::with_capacity(balance.len());

    for entry in balance {
        let available = parse_amount(&entry.symbol, "available", &entry.available)?;
        let in_order = parse_amount(&entry.symbol, "inOrder", &entry.in_order)?;
        let amount = available + in_order;

        let value_eur = if entry.symbol == "EUR" {
            total_eur += available;
            available
        } else {
            let market = format!("{}-EUR", entry.symbol);
            match client.ticker_price(&market).await {
                Ok(Some(price)) => {
                    let value = amount * price;
                    total_eur += value;
                    value
                }
                Ok(None) => {
                    log::warn!("No price data for {}.", market);
                    0.0
                }
                Err(err) => {
                    log::error!("Error fetching price for {}: {}", market, err);
                    0.0
                }
            }
        };

        assets.push(AssetValue {
            symbol: entry.symbol,
            amount,
            value_eur,
        });
    }

    log::info!("Portfolio value: {:.2} EUR", total_eur);
    Ok(PortfolioSnapshot {
        total_eur,
        assets,
        remaining_limit: client.remaining_limit(),
    })
}

fn parse_amount(symbol: &str, field: &str, raw: &str) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        AppError::message(format!(
            "Unparseable {} amount '{}' for {}",
            field, raw, symbol
        ))
    })
}
