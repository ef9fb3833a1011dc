//! Sample-based forecast

use super::{check_quantile, Forecast};
use crate::error::{KolosalError, Result};
use crate::timefeature::Frequency;
use chrono::NaiveDateTime;
use ndarray::{ArrayD, Axis, IxDyn, Zip};

/// Forecast represented by sampled trajectories
///
/// `samples` has shape `[num_samples, prediction_length]` or
/// `[num_samples, prediction_length, num_variates]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleForecast {
    samples: ArrayD<f64>,
    start_date: NaiveDateTime,
    freq: Frequency,
    item_id: Option<String>,
}

impl SampleForecast {
    pub fn new(samples: ArrayD<f64>, start_date: NaiveDateTime, freq: Frequency) -> Result<Self> {
        if !(2..=3).contains(&samples.ndim()) {
            return Err(KolosalError::ShapeError(format!(
                "samples must have 2 or 3 dimensions, got shape {:?}",
                samples.shape()
            )));
        }
        if samples.shape()[0] == 0 {
            return Err(KolosalError::ShapeError("num_samples must be >= 1".to_string()));
        }
        if samples.shape()[1] == 0 {
            return Err(KolosalError::ShapeError(
                "prediction_length must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            samples,
            start_date,
            freq,
            item_id: None,
        })
    }

    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn samples(&self) -> &ArrayD<f64> {
        &self.samples
    }

    pub fn num_samples(&self) -> usize {
        self.samples.shape()[0]
    }
}

/// Linearly interpolated order statistic at position `q * (n - 1)`
fn interpolated_quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

impl Forecast for SampleForecast {
    fn start_date(&self) -> NaiveDateTime {
        self.start_date
    }

    fn freq(&self) -> &Frequency {
        &self.freq
    }

    fn prediction_length(&self) -> usize {
        self.samples.shape()[1]
    }

    fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    fn mean(&self) -> ArrayD<f64> {
        let n = self.num_samples() as f64;
        self.samples.sum_axis(Axis(0)) / n
    }

    fn quantile(&self, q: f64) -> Result<ArrayD<f64>> {
        check_quantile(q)?;

        let mut result = ArrayD::zeros(IxDyn(&self.samples.shape()[1..]));
        let mut buffer = Vec::with_capacity(self.num_samples());
        Zip::from(&mut result)
            .and(self.samples.lanes(Axis(0)))
            .for_each(|out, lane| {
                buffer.clear();
                buffer.extend(lane.iter().copied());
                buffer.sort_by(|a, b| a.total_cmp(b));
                *out = interpolated_quantile(&buffer, q);
            });
        Ok(result)
    }
}
