//! Parametric forecast

use super::{check_quantile, Forecast, SampleForecast};
use crate::error::{KolosalError, Result};
use crate::timefeature::Frequency;
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayD};
use rand::Rng;
use rand_distr::{Distribution as _, Gamma, Normal, Poisson, StudentT};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, DiscreteCDF};

/// Per-step distribution parameters over the horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Gaussian {
        mu: Array1<f64>,
        sigma: Array1<f64>,
    },
    StudentT {
        mu: Array1<f64>,
        sigma: Array1<f64>,
        nu: Array1<f64>,
    },
    /// Mean `mu`, dispersion `alpha` (variance `mu + alpha * mu^2`)
    NegativeBinomial {
        mu: Array1<f64>,
        alpha: Array1<f64>,
    },
}

fn invalid(msg: String) -> KolosalError {
    KolosalError::InferenceError(msg)
}

impl Distribution {
    pub fn prediction_length(&self) -> usize {
        match self {
            Distribution::Gaussian { mu, .. }
            | Distribution::StudentT { mu, .. }
            | Distribution::NegativeBinomial { mu, .. } => mu.len(),
        }
    }

    /// Check parameter lengths and domains
    pub fn validate(&self) -> Result<()> {
        let n = self.prediction_length();
        if n == 0 {
            return Err(KolosalError::ShapeError("prediction_length must be >= 1".to_string()));
        }
        let check = |name: &str, values: &Array1<f64>, positive: bool| -> Result<()> {
            if values.len() != n {
                return Err(KolosalError::ShapeError(format!(
                    "parameter '{}' has length {}, expected {}",
                    name,
                    values.len(),
                    n
                )));
            }
            if values.iter().any(|v| !v.is_finite() || (positive && *v <= 0.0)) {
                return Err(invalid(format!("parameter '{}' out of domain", name)));
            }
            Ok(())
        };
        match self {
            Distribution::Gaussian { mu, sigma } => {
                check("mu", mu, false)?;
                check("sigma", sigma, true)
            }
            Distribution::StudentT { mu, sigma, nu } => {
                check("mu", mu, false)?;
                check("sigma", sigma, true)?;
                check("nu", nu, true)
            }
            Distribution::NegativeBinomial { mu, alpha } => {
                check("mu", mu, true)?;
                check("alpha", alpha, true)
            }
        }
    }

    /// Per-step mean; Student-t steps with `nu <= 1` have no mean and yield NaN
    pub fn mean(&self) -> Result<Array1<f64>> {
        self.validate()?;
        Ok(self.mean_unchecked())
    }

    fn mean_unchecked(&self) -> Array1<f64> {
        match self {
            Distribution::Gaussian { mu, .. } | Distribution::NegativeBinomial { mu, .. } => {
                mu.clone()
            }
            Distribution::StudentT { mu, nu, .. } => {
                Array1::from_shape_fn(mu.len(), |t| if nu[t] > 1.0 { mu[t] } else { f64::NAN })
            }
        }
    }

    /// Per-step inverse CDF at `q`
    pub fn quantile(&self, q: f64) -> Result<Array1<f64>> {
        check_quantile(q)?;
        self.validate()?;
        let n = self.prediction_length();
        let mut out = Array1::zeros(n);
        for t in 0..n {
            out[t] = match self {
                Distribution::Gaussian { mu, sigma } => {
                    statrs::distribution::Normal::new(mu[t], sigma[t])
                        .map_err(|e| invalid(e.to_string()))?
                        .inverse_cdf(q)
                }
                Distribution::StudentT { mu, sigma, nu } => {
                    statrs::distribution::StudentsT::new(mu[t], sigma[t], nu[t])
                        .map_err(|e| invalid(e.to_string()))?
                        .inverse_cdf(q)
                }
                Distribution::NegativeBinomial { mu, alpha } => {
                    negative_binomial_quantile(mu[t], alpha[t], q)?
                }
            };
        }
        Ok(out)
    }

    /// Draw `num_samples` trajectories, shape `[num_samples, prediction_length]`
    pub fn sample<R: Rng + ?Sized>(&self, num_samples: usize, rng: &mut R) -> Result<Array2<f64>> {
        self.validate()?;
        let n = self.prediction_length();
        let mut out = Array2::zeros((num_samples, n));
        for t in 0..n {
            match self {
                Distribution::Gaussian { mu, sigma } => {
                    let dist = Normal::new(mu[t], sigma[t]).map_err(|e| invalid(e.to_string()))?;
                    for s in 0..num_samples {
                        out[[s, t]] = dist.sample(rng);
                    }
                }
                Distribution::StudentT { mu, sigma, nu } => {
                    let dist = StudentT::new(nu[t]).map_err(|e| invalid(e.to_string()))?;
                    for s in 0..num_samples {
                        out[[s, t]] = mu[t] + sigma[t] * dist.sample(rng);
                    }
                }
                Distribution::NegativeBinomial { mu, alpha } => {
                    // Gamma-Poisson mixture
                    let r = 1.0 / alpha[t];
                    let gamma = Gamma::new(r, mu[t] / r).map_err(|e| invalid(e.to_string()))?;
                    for s in 0..num_samples {
                        let lambda: f64 = gamma.sample(rng);
                        out[[s, t]] = if lambda > 0.0 {
                            Poisson::new(lambda)
                                .map_err(|e| invalid(e.to_string()))?
                                .sample(rng)
                        } else {
                            0.0
                        };
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Smallest count `k` with `P(X <= k) >= q`
fn negative_binomial_quantile(mu: f64, alpha: f64, q: f64) -> Result<f64> {
    let r = 1.0 / alpha;
    let p = r / (r + mu);
    let dist = statrs::distribution::NegativeBinomial::new(r, p).map_err(|e| invalid(e.to_string()))?;

    let mut high: u64 = 1;
    while dist.cdf(high) < q {
        high = high
            .checked_mul(2)
            .ok_or_else(|| invalid("negative binomial quantile search overflow".to_string()))?;
    }
    let mut low: u64 = 0;
    if dist.cdf(0) >= q {
        return Ok(0.0);
    }
    // invariant: cdf(low) < q <= cdf(high)
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if dist.cdf(mid) >= q {
            high = mid;
        } else {
            low = mid;
        }
    }
    Ok(high as f64)
}

/// Forecast represented by closed-form distribution parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionForecast {
    distribution: Distribution,
    start_date: NaiveDateTime,
    freq: Frequency,
    item_id: Option<String>,
}

impl DistributionForecast {
    pub fn new(distribution: Distribution, start_date: NaiveDateTime, freq: Frequency) -> Result<Self> {
        distribution.validate()?;
        Ok(Self {
            distribution,
            start_date,
            freq,
            item_id: None,
        })
    }

    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    /// Draw trajectories into a [`SampleForecast`] over the same horizon
    pub fn to_sample_forecast<R: Rng + ?Sized>(&self, num_samples: usize, rng: &mut R) -> Result<SampleForecast> {
        let samples = self.distribution.sample(num_samples, rng)?;
        let forecast = SampleForecast::new(samples.into_dyn(), self.start_date, self.freq)?;
        Ok(match &self.item_id {
            Some(id) => forecast.with_item_id(id.clone()),
            None => forecast,
        })
    }
}

impl Forecast for DistributionForecast {
    fn start_date(&self) -> NaiveDateTime {
        self.start_date
    }

    fn freq(&self) -> &Frequency {
        &self.freq
    }

    fn prediction_length(&self) -> usize {
        self.distribution.prediction_length()
    }

    fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    fn mean(&self) -> ArrayD<f64> {
        // parameters were validated on construction
        self.distribution.mean_unchecked().into_dyn()
    }

    fn quantile(&self, q: f64) -> Result<ArrayD<f64>> {
        Ok(self.distribution.quantile(q)?.into_dyn())
    }
}
