use std::cmp::Ordering;

use crate::exchange::PriceSeries;

/// A market paired with its volatility score. Created by [`rank`], consumed
/// by the report sink, never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub symbol: String,
    pub score: f64,
}

/// Scales the per-minute return deviation up to the 24h sampling window.
fn annualization_factor() -> f64 {
    (1440.0f64).sqrt()
}

/// Log returns of consecutive closes: `r[i] = ln(close[i] / close[i-1])`.
/// Always `max(k - 1, 0)` elements for `k` closes.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Volatility of a price series: sample standard deviation of its log
/// returns times the annualization factor. `None` when the series is too
/// short for the statistic to be defined.
pub fn volatility(series: &PriceSeries) -> Option<f64> {
    let returns = log_returns(&series.closes());
    sample_stddev(&returns).map(|sd| sd * annualization_factor())
}

fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Scores every symbol with a present, scorable series and orders them by
/// descending volatility. Absent, empty, and too-short series are excluded
/// up front rather than carried along as undefined scores. The sort is
/// stable, so equal scores keep their input order.
pub fn rank(results: &[(String, Option<PriceSeries>)]) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = results
        .iter()
        .filter_map(|(symbol, series)| {
            let series = series.as_ref()?;
            volatility(series).map(|score| RankedEntry {
                symbol: symbol.clone(),
                score,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    entries
}

/// First `k` of the ranked sequence, minus any score that is not finite.
pub fn top_n(ranked: &[RankedEntry], k: usize) -> Vec<RankedEntry> {
    ranked
        .iter()
        .take(k)
        .filter(|e| e.score.is_finite())
        .cloned()
        .collect()
}

/// Last `k` of the ranked sequence (still in descending order), minus any
/// score that is not finite.
pub fn bottom_n(ranked: &[RankedEntry], k: usize) -> Vec<RankedEntry> {
    let start = ranked.len().saturating_sub(k);
    ranked[start..]
        .iter()
        .filter(|e| e.score.is_finite())
        .cloned()
        .collect()
}
