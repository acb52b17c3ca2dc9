use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;

use crate::config::PLOTS_DIR;
use crate::error::{AppError, Result};
use crate::exchange::PriceSeries;

const CHART_SIZE: (u32, u32) = (1200, 800);

/// Draws one close-price line per symbol on a shared UTC time axis and
/// writes the result to `plots/<stem>.png`.
pub fn render_comparison(series: &[(String, PriceSeries)], title: &str, stem: &str) -> Result<()> {
    fs::create_dir_all(PLOTS_DIR)?;
    let path: PathBuf = [PLOTS_DIR, &format!("{}.png", stem)].iter().collect();

    let Some((t0, t1, lo, hi)) = series_bounds(series) else {
        return Err(AppError::message(format!(
            "No data points to plot for '{}'",
            stem
        )));
    };

    let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d(t0..t1, lo..hi)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Price (USDT)")
        .x_labels(8)
        .x_label_formatter(&|t: &DateTime<Utc>| t.format("%m-%d %H:%M").to_string())
        .draw()
        .map_err(chart_err)?;

    for (idx, (symbol, prices)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                prices.points().iter().map(|p| (p.open_time, p.close)),
                &color,
            ))
            .map_err(chart_err)?
            .label(symbol.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(chart_err)?;
    root.present().map_err(chart_err)?;

    log::info!("Saved plot: {}", path.display());
    Ok(())
}

/// Overall time and price extent across every series, padded so a
/// degenerate extent never produces an empty axis range.
fn series_bounds(
    series: &[(String, PriceSeries)],
) -> Option<(DateTime<Utc>, DateTime<Utc>, f64, f64)> {
    let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>, f64, f64)> = None;

    for (_, prices) in series {
        for point in prices.points() {
            bounds = Some(match bounds {
                None => (point.open_time, point.open_time, point.close, point.close),
                Some((t0, t1, lo, hi)) => (
                    t0.min(point.open_time),
                    t1.max(point.open_time),
                    lo.min(point.close),
                    hi.max(point.close),
                ),
            });
        }
    }

    bounds.map(|(t0, mut t1, lo, mut hi)| {
        if t0 == t1 {
            t1 = t0 + Duration::minutes(1);
        }
        if hi - lo < f64::EPSILON {
            hi = lo + 1.0;
        }
        (t0, t1, lo, hi)
    })
}

fn chart_err<E: std::fmt::Display>(err: E) -> AppError {
    AppError::message(format!("Chart rendering failed: {}", err))
}
