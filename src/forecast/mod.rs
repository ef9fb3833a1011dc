//! Forecast module
//!
//! Represents predictive distributions over the prediction horizon:
//! - [`SampleForecast`] - a set of sampled trajectories
//! - [`DistributionForecast`] - closed-form distribution parameters
//! - [`evaluation`] - accuracy metrics against ground truth

mod distribution;
pub mod evaluation;
mod sample;

pub use distribution::{Distribution, DistributionForecast};
pub use evaluation::{evaluate, ForecastMetrics};
pub use sample::SampleForecast;

use crate::error::{KolosalError, Result};
use crate::timefeature::Frequency;
use chrono::NaiveDateTime;
use ndarray::ArrayD;

/// Predictive distribution over `prediction_length` steps from `start_date`
///
/// `mean` and `quantile` are recomputed from the stored representation on
/// every call.
pub trait Forecast: Send + Sync + std::fmt::Debug {
    fn start_date(&self) -> NaiveDateTime;

    fn freq(&self) -> &Frequency;

    fn prediction_length(&self) -> usize;

    fn item_id(&self) -> Option<&str>;

    /// Per-step mean, shape `[prediction_length]` or `[prediction_length, variates]`
    fn mean(&self) -> ArrayD<f64>;

    /// Per-step quantile for `q` in `(0, 1)`
    fn quantile(&self, q: f64) -> Result<ArrayD<f64>>;

    fn median(&self) -> Result<ArrayD<f64>> {
        self.quantile(0.5)
    }

    /// Timestamps of the prediction horizon
    fn index(&self) -> Result<Vec<NaiveDateTime>> {
        self.freq().range(self.start_date(), self.prediction_length())
    }
}

/// Reject quantile levels outside the open interval `(0, 1)`
pub fn check_quantile(q: f64) -> Result<()> {
    if q > 0.0 && q < 1.0 {
        Ok(())
    } else {
        Err(KolosalError::InvalidQuantileError(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quantile() {
        assert!(check_quantile(0.1).is_ok());
        assert_eq!(check_quantile(0.0), Err(KolosalError::InvalidQuantileError(0.0)));
        assert!(check_quantile(1.0).is_err());
        assert!(check_quantile(f64::NAN).is_err());
    }
}
