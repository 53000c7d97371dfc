use tracing::debug;

use crate::models::{Series, TrendLine};

/// Ordinary least-squares fit of score against day offset from the first
/// observation. Returns `None` below two points.
///
/// When every observation shares one date the x variance is zero; the slope
/// is then `0` and the intercept is the mean score.
pub fn fit(series: &Series) -> Option<TrendLine> {
    let first = series.observations.first()?;
    let n = series.len();
    if n < 2 {
        return None;
    }

    let origin = first.date;
    let xs: Vec<f64> = series
        .observations
        .iter()
        .map(|obs| (obs.date - origin).num_days() as f64)
        .collect();
    let ys: Vec<f64> = series.observations.iter().map(|obs| obs.score).collect();

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    let intercept = mean_y - slope * mean_x;

    debug!(series = %series.id, n, slope, intercept, "fitted trend");
    Some(TrendLine {
        slope,
        intercept,
        point_count: n,
        origin,
    })
}
