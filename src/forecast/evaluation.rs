//! Forecast accuracy metrics

use super::{check_quantile, Forecast};
use crate::error::{KolosalError, Result};
use ndarray::{ArrayView1, Ix1};
use serde::{Deserialize, Serialize};

/// Accuracy of one univariate forecast against its ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub mse: f64,
    pub abs_error: f64,
    /// Root mean squared scaled error against the seasonal naive in-sample error
    pub rmsse: f64,
    /// `(q, quantile loss)` per requested level
    pub quantile_loss: Vec<(f64, f64)>,
    /// `(q, fraction of targets below the q-quantile)` per requested level
    pub coverage: Vec<(f64, f64)>,
    /// Quantile losses averaged over levels, normalised by `sum(|target|)`
    pub mean_weighted_quantile_loss: f64,
}

/// `2 * sum(|(forecast - target) * (1{target <= forecast} - q)|)`
pub fn quantile_loss(target: ArrayView1<f64>, forecast: ArrayView1<f64>, q: f64) -> f64 {
    target
        .iter()
        .zip(forecast.iter())
        .map(|(&y, &f)| {
            let indicator = if y <= f { 1.0 } else { 0.0 };
            ((f - y) * (indicator - q)).abs()
        })
        .sum::<f64>()
        * 2.0
}

/// Fraction of targets strictly below the forecast quantile
pub fn coverage(target: ArrayView1<f64>, forecast: ArrayView1<f64>) -> f64 {
    let below = target
        .iter()
        .zip(forecast.iter())
        .filter(|(y, f)| y < f)
        .count();
    below as f64 / target.len().max(1) as f64
}

/// Seasonal naive in-sample mean squared error of `past` at lag `seasonality`
fn seasonal_error(past: ArrayView1<f64>, seasonality: usize) -> f64 {
    let lag = if seasonality < past.len() { seasonality } else { 1 };
    if past.len() <= lag {
        return f64::NAN;
    }
    let diffs = past.len() - lag;
    (lag..past.len())
        .map(|t| (past[t] - past[t - lag]).powi(2))
        .sum::<f64>()
        / diffs as f64
}

/// Evaluate `forecast` on `target`, scaling by the seasonal error of `past`
pub fn evaluate(
    forecast: &dyn Forecast,
    target: ArrayView1<f64>,
    past: ArrayView1<f64>,
    quantiles: &[f64],
    seasonality: usize,
) -> Result<ForecastMetrics> {
    if target.len() != forecast.prediction_length() {
        return Err(KolosalError::ShapeError(format!(
            "target length {} does not match prediction length {}",
            target.len(),
            forecast.prediction_length()
        )));
    }

    let mean = forecast.mean().into_dimensionality::<Ix1>()?;
    let n = target.len() as f64;
    let mse = target
        .iter()
        .zip(mean.iter())
        .map(|(y, m)| (y - m).powi(2))
        .sum::<f64>()
        / n;

    let median = forecast.median()?.into_dimensionality::<Ix1>()?;
    let abs_error = target
        .iter()
        .zip(median.iter())
        .map(|(y, m)| (y - m).abs())
        .sum::<f64>();

    let mut losses = Vec::with_capacity(quantiles.len());
    let mut coverages = Vec::with_capacity(quantiles.len());
    for &q in quantiles {
        check_quantile(q)?;
        let level = forecast.quantile(q)?.into_dimensionality::<Ix1>()?;
        losses.push((q, quantile_loss(target, level.view(), q)));
        coverages.push((q, coverage(target, level.view())));
    }

    let abs_target: f64 = target.iter().map(|y| y.abs()).sum();
    let mean_weighted_quantile_loss = if losses.is_empty() || abs_target == 0.0 {
        f64::NAN
    } else {
        losses.iter().map(|(_, loss)| loss / abs_target).sum::<f64>() / losses.len() as f64
    };

    Ok(ForecastMetrics {
        mse,
        abs_error,
        rmsse: (mse / seasonal_error(past, seasonality)).sqrt(),
        quantile_loss: losses,
        coverage: coverages,
        mean_weighted_quantile_loss,
    })
}
