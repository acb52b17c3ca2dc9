use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};

use crate::config::{FETCH_WORKERS, KLINE_WEIGHT};
use crate::error::Result;
use crate::exchange::{BinanceClient, PriceSeries};
use crate::rate::RateGate;

/// How far back each market's price course reaches, at 1-minute resolution.
const LOOKBACK_HOURS: i64 = 24;

/// Fetches one 24h price series per symbol across a bounded worker pool.
///
/// Results come back in submission order, one entry per requested symbol. A
/// failed fetch is logged and reported as `None`; it never disturbs the
/// sibling tasks or the overall collection.
pub struct SeriesFetcher {
    client: Arc<BinanceClient>,
    gate: Arc<RateGate>,
    concurrency: usize,
}

impl SeriesFetcher {
    pub fn new(client: Arc<BinanceClient>, gate: Arc<RateGate>) -> Self {
        Self::with_concurrency(client, gate, FETCH_WORKERS)
    }

    pub fn with_concurrency(
        client: Arc<BinanceClient>,
        gate: Arc<RateGate>,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            gate,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn fetch_all(&self, symbols: Vec<String>) -> Vec<(String, Option<PriceSeries>)> {
        collect_ordered(symbols, self.concurrency, |symbol| {
            let client = Arc::clone(&self.client);
            let gate = Arc::clone(&self.gate);
            async move { fetch_series(&client, &gate, &symbol).await }
        })
        .await
    }
}

async fn fetch_series(
    client: &BinanceClient,
    gate: &RateGate,
    symbol: &str,
) -> Result<PriceSeries> {
    gate.acquire(KLINE_WEIGHT).await;

    let end = Utc::now();
    let start = end - Duration::hours(LOOKBACK_HOURS);
    let points = client
        .klines(symbol, start.timestamp_millis(), end.timestamp_millis())
        .await?;

    log::info!("Fetched data for {}", symbol);
    Ok(PriceSeries::new(points))
}

/// Fans `items` out over at most `concurrency` in-flight tasks and collects
/// one entry per item in submission order. Task failures are logged and
/// surface as `None`.
async fn collect_ordered<T, F, Fut>(
    items: Vec<String>,
    concurrency: usize,
    task: F,
) -> Vec<(String, Option<T>)>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    stream::iter(items.into_iter())
        .map(|item| {
            let fut = task(item.clone());
            async move {
                match fut.await {
                    Ok(value) => (item, Some(value)),
                    Err(err) => {
                        log::error!("Error fetching data for {}: {}", item, err);
                        (item, None)
                    }
                }
            }
        })
        .buffered(concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tokio::time::{sleep, Duration as TokioDuration};

    #[tokio::test(start_paused = true)]
    async fn collects_in_submission_order_despite_completion_order() {
        let symbols: Vec<String> = ["SLOW", "FAST", "MEDIUM"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = collect_ordered(symbols, 3, |symbol| async move {
            let delay = match symbol.as_str() {
                "SLOW" => 30,
                "FAST" => 5,
                _ => 15,
            };
            sleep(TokioDuration::from_millis(delay)).await;
            Ok::<_, AppError>(symbol.len())
        })
        .await;

        let order: Vec<&str> = results.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["SLOW", "FAST", "MEDIUM"]);
        assert_eq!(results[0].1, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_yields_none_without_aborting_siblings() {
        let symbols: Vec<String> = ["GOODUSDT", "BADUSDT", "ALSOGOODUSDT"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = collect_ordered(symbols, 2, |symbol| async move {
            if symbol.starts_with("BAD") {
                Err(AppError::message("upstream exploded"))
            } else {
                Ok(symbol.clone())
            }
        })
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_some());
        assert!(results[1].1.is_none());
        assert!(results[2].1.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_yields_empty_output() {
        let results =
            collect_ordered(Vec::new(), 4, |symbol| async move { Ok::<_, AppError>(symbol) })
                .await;

        assert!(results.is_empty());
    }
}
