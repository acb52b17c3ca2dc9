use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

/// One row of the exchange's 24h ticker statistics. Only the fields the
/// scanner reads are kept; the endpoint returns many more.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    pub quote_volume: String,
}

impl Ticker24h {
    /// Quoted volume as a float, treating unparseable payloads as zero so a
    /// single malformed row cannot sink the whole ticker snapshot.
    pub fn quote_volume_f64(&self) -> f64 {
        self.quote_volume.trim().parse::<f64>().unwrap_or(0.0)
    }
}

/// A single (open time, close price) sample of a market's price course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub open_time: DateTime<Utc>,
    pub close: f64,
}

/// Close-price time series for one market, strictly increasing in time.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by(|a, b| a.open_time.cmp(&b.open_time));
        points.dedup_by_key(|p| p.open_time);
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

/// Parses a klines payload (array of row arrays) into price points.
///
/// Row layout per the exchange: `[open_time_ms, open, high, low, close,
/// volume, close_time, ...]` with prices serialized as strings. Rows that do
/// not follow the layout are skipped rather than failing the whole page.
pub fn parse_klines(payload: &Value) -> Result<Vec<PricePoint>> {
    let rows = payload
        .as_array()
        .ok_or_else(|| AppError::message("Klines payload is not an array"))?;

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(fields) = row.as_array() else {
            continue;
        };
        if fields.len() < 5 {
            continue;
        }

        let Some(open_time_ms) = fields[0].as_i64() else {
            continue;
        };
        let Some(close) = parse_price(&fields[4]) else {
            continue;
        };
        let Some(open_time) = Utc.timestamp_millis_opt(open_time_ms).single() else {
            continue;
        };

        points.push(PricePoint { open_time, close });
    }

    Ok(points)
}

fn parse_price(value: &Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_kline_rows() {
        let payload = json!([
            [1700000000000i64, "100.0", "101.0", "99.0", "100.5", "12.3", 1700000059999i64],
            [1700000060000i64, "100.5", "102.0", "100.1", "101.2", "8.4", 1700000119999i64]
        ]);

        let points = parse_klines(&payload).unwrap();

        assert_eq!(points.len(), 2);
        assert!((points[0].close - 100.5).abs() < 1e-9);
        assert!((points[1].close - 101.2).abs() < 1e-9);
        assert!(points[0].open_time < points[1].open_time);
    }

    #[test]
    fn skips_malformed_rows() {
        let payload = json!([
            [1700000000000i64, "100.0", "101.0", "99.0", "100.5"],
            "not a row",
            [1700000060000i64]
        ]);

        let points = parse_klines(&payload).unwrap();

        assert_eq!(points.len(), 1);
    }

    #[test]
    fn series_orders_points_by_time() {
        let later = PricePoint {
            open_time: Utc.timestamp_millis_opt(1700000060000).single().unwrap(),
            close: 2.0,
        };
        let earlier = PricePoint {
            open_time: Utc.timestamp_millis_opt(1700000000000).single().unwrap(),
            close: 1.0,
        };

        let series = PriceSeries::new(vec![later, earlier]);

        assert_eq!(series.closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn ticker_volume_parse_is_lenient() {
        let ticker = Ticker24h {
            symbol: "BTCUSDT".into(),
            quote_volume: "garbage".into(),
        };

        assert_eq!(ticker.quote_volume_f64(), 0.0);
    }
}
