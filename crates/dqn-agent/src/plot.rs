//! Reward and epsilon trend plot

#[cfg(feature = "visualization")]
use std::path::Path;

#[cfg(feature = "visualization")]
use dqn_core::{DqnError, Result};

/// Episodes averaged by the left-hand panel
pub const ROLLING_WINDOW: usize = 100;

/// Mean of the trailing `window` values (fewer at the start) at every index
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            sum += v;
            if i >= window {
                sum -= values[i - window];
            }
            sum / (i + 1).min(window) as f64
        })
        .collect()
}

#[cfg(feature = "visualization")]
fn value_range(values: &[f64]) -> std::ops::Range<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}

/// Render mean rewards (left) and epsilon decay (right) side by side
#[cfg(feature = "visualization")]
pub fn render_trend(path: &Path, rewards: &[f64], epsilons: &[f64]) -> Result<()> {
    draw(path, rewards, epsilons).map_err(|e| DqnError::Plot(e.to_string()))
}

#[cfg(feature = "visualization")]
#[allow(clippy::cast_precision_loss)]
fn draw(path: &Path, rewards: &[f64], epsilons: &[f64]) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use plotters::prelude::*;

    let means = rolling_mean(rewards, ROLLING_WINDOW);
    let root = BitMapBackend::new(path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(500);

    let panels = [
        (&left, "Mean rewards", means.as_slice(), &BLUE),
        (&right, "Epsilon decay", epsilons, &RED),
    ];
    for (area, caption, series, color) in panels {
        let x_max = series.len().max(1) as f64;
        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..x_max, value_range(series))?;
        chart.configure_mesh().draw()?;
        chart.draw_series(LineSeries::new(
            series.iter().enumerate().map(|(i, &v)| (i as f64, v)),
            color,
        ))?;
    }

    root.present()?;
    Ok(())
}
