//! Instance sampling policies

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Window-selection strategy returning split indices for one series
///
/// A split index `i` separates the context window `[i - context_length, i)`
/// from the prediction window `[i, i + prediction_length)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstanceSampler {
    /// Draw `num_instances` split indices uniformly, with replacement
    Uniform { num_instances: usize },
    /// Keep each valid index with probability `num_instances / window size`,
    /// topping up with uniform draws until `min_instances` are selected
    ExpectedNum {
        num_instances: f64,
        min_instances: usize,
    },
    /// Exactly one split at the end of the observed series
    Prediction,
    /// One split leaving the last `prediction_length` steps as known future
    Validation,
}

impl InstanceSampler {
    pub fn uniform(num_instances: usize) -> Self {
        InstanceSampler::Uniform { num_instances }
    }

    pub fn expected_num(num_instances: f64, min_instances: usize) -> Self {
        InstanceSampler::ExpectedNum {
            num_instances,
            min_instances,
        }
    }

    pub fn prediction() -> Self {
        InstanceSampler::Prediction
    }

    pub fn validation() -> Self {
        InstanceSampler::Validation
    }

    pub fn is_training(&self) -> bool {
        !matches!(self, InstanceSampler::Prediction)
    }

    /// Split indices for a series of `series_length` observed steps
    ///
    /// Training variants only return indices in
    /// `[context_length, series_length - prediction_length]` and return nothing
    /// when the series cannot hold a single full window.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        series_length: usize,
        context_length: usize,
        prediction_length: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        match self {
            InstanceSampler::Prediction => vec![series_length],
            InstanceSampler::Validation => valid_range(series_length, context_length, prediction_length)
                .map(|(_, high)| vec![high])
                .unwrap_or_default(),
            InstanceSampler::Uniform { num_instances } => {
                match valid_range(series_length, context_length, prediction_length) {
                    Some((low, high)) => (0..*num_instances)
                        .map(|_| rng.gen_range(low..=high))
                        .collect(),
                    None => Vec::new(),
                }
            }
            InstanceSampler::ExpectedNum {
                num_instances,
                min_instances,
            } => {
                let (low, high) = match valid_range(series_length, context_length, prediction_length) {
                    Some(range) => range,
                    None => return Vec::new(),
                };
                let window_size = (high - low + 1) as f64;
                let p = (num_instances / window_size).clamp(0.0, 1.0);

                let mut indices: Vec<usize> =
                    (low..=high).filter(|_| rng.gen::<f64>() < p).collect();
                while indices.len() < *min_instances {
                    indices.push(rng.gen_range(low..=high));
                }
                indices.sort_unstable();
                indices
            }
        }
    }
}

/// Inclusive range of valid training split indices, `None` if empty
fn valid_range(
    series_length: usize,
    context_length: usize,
    prediction_length: usize,
) -> Option<(usize, usize)> {
    let needed = context_length.checked_add(prediction_length)?;
    if series_length < needed {
        return None;
    }
    Some((context_length, series_length - prediction_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_prediction_ignores_rng() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(InstanceSampler::prediction().sample(120, 24, 12, &mut rng), vec![120]);
        assert_eq!(InstanceSampler::prediction().sample(5, 24, 12, &mut rng), vec![5]);
    }

    #[test]
    fn test_uniform_within_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let splits = InstanceSampler::uniform(500).sample(50, 10, 5, &mut rng);
        assert_eq!(splits.len(), 500);
        assert!(splits.iter().all(|&i| (10..=45).contains(&i)));
        assert!(splits.contains(&10) && splits.contains(&45));
    }

    #[test]
    fn test_short_series_yields_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(InstanceSampler::uniform(5).sample(14, 10, 5, &mut rng).is_empty());
        assert!(InstanceSampler::expected_num(1.0, 3).sample(0, 10, 5, &mut rng).is_empty());
        // exactly one window fits
        assert_eq!(InstanceSampler::uniform(2).sample(15, 10, 5, &mut rng), vec![10, 10]);
    }

    #[test]
    fn test_expected_num_respects_minimum() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let splits = InstanceSampler::expected_num(0.0, 4).sample(100, 10, 10, &mut rng);
        assert_eq!(splits.len(), 4);
        assert!(splits.windows(2).all(|w| w[0] <= w[1]));
        assert!(splits.iter().all(|&i| (10..=90).contains(&i)));
    }

    #[test]
    fn test_same_seed_same_splits() {
        let sampler = InstanceSampler::expected_num(5.0, 1);
        let a = sampler.sample(200, 20, 10, &mut ChaCha8Rng::seed_from_u64(9));
        let b = sampler.sample(200, 20, 10, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_holds_out_last_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let sampler = InstanceSampler::validation();
        assert_eq!(sampler.sample(120, 24, 12, &mut rng), vec![108]);
        assert!(sampler.sample(30, 24, 12, &mut rng).is_empty());
        assert!(sampler.is_training());
    }

    #[test]
    fn test_serde_tagged() {
        let sampler: InstanceSampler =
            serde_json::from_str(r#"{"kind": "uniform", "num_instances": 3}"#).unwrap();
        assert_eq!(sampler, InstanceSampler::uniform(3));
    }
}
