//! Prediction glue between the transform chain and an external model

use super::Batch;
use crate::dataset::TimeSeriesRecord;
use crate::error::{KolosalError, Result};
use crate::forecast::{Distribution, DistributionForecast, Forecast, SampleForecast};
use crate::transform::{InstanceSampler, TransformChain};
use ndarray::{Array2, Array3, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Raw output of a model call over a batch
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Sampled trajectories `[batch, num_samples, prediction_length]`
    Samples(Array3<f64>),
    /// One parametric distribution per batch entry
    Distributions(Vec<Distribution>),
}

impl ModelOutput {
    fn batch_len(&self) -> usize {
        match self {
            ModelOutput::Samples(samples) => samples.len_of(Axis(0)),
            ModelOutput::Distributions(distributions) => distributions.len(),
        }
    }
}

/// External inference call consuming fixed-shape batches
pub trait ForecastModel: Send + Sync {
    fn predict(&self, batch: &Batch) -> Result<ModelOutput>;
}

/// Runs records through a prediction chain and a model into forecasts
pub struct Predictor<M: ForecastModel> {
    chain: TransformChain,
    model: M,
    batch_size: usize,
}

impl<M: ForecastModel> Predictor<M> {
    /// `chain` must end in an `InstanceSplit` driven by the prediction sampler
    pub fn new(chain: TransformChain, model: M) -> Result<Self> {
        match chain.split().map(|split| split.sampler()) {
            Some(InstanceSampler::Prediction) => {}
            Some(_) => {
                return Err(KolosalError::config(
                    "predictor requires an InstanceSplit with the prediction sampler",
                ))
            }
            None => return Err(KolosalError::config("predictor chain has no InstanceSplit step")),
        }
        Ok(Self {
            chain,
            model,
            batch_size: 32,
        })
    }

    /// Builder method to set the number of records per model call
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    /// One forecast per record, in input order
    pub fn predict(&self, records: Vec<TimeSeriesRecord>) -> Result<Vec<Box<dyn Forecast>>> {
        let mut forecasts: Vec<Box<dyn Forecast>> = Vec::with_capacity(records.len());
        self.for_each_output(records, |batch, output| {
            match output {
                ModelOutput::Samples(samples) => {
                    for (k, trajectories) in samples.outer_iter().enumerate() {
                        forecasts.push(Box::new(sample_forecast(batch, k, trajectories.to_owned())?));
                    }
                }
                ModelOutput::Distributions(distributions) => {
                    for (k, distribution) in distributions.into_iter().enumerate() {
                        let forecast = DistributionForecast::new(
                            distribution,
                            batch.forecast_starts[k],
                            batch.freq,
                        )?;
                        let forecast = match &batch.item_ids[k] {
                            Some(id) => forecast.with_item_id(id.clone()),
                            None => forecast,
                        };
                        forecasts.push(Box::new(forecast));
                    }
                }
            }
            Ok(())
        })?;
        Ok(forecasts)
    }

    /// Like [`predict`](Self::predict), converting parametric outputs to samples
    pub fn predict_samples(
        &self,
        records: Vec<TimeSeriesRecord>,
        num_samples: usize,
        seed: u64,
    ) -> Result<Vec<SampleForecast>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut forecasts = Vec::with_capacity(records.len());
        self.for_each_output(records, |batch, output| {
            match output {
                ModelOutput::Samples(samples) => {
                    for (k, trajectories) in samples.outer_iter().enumerate() {
                        forecasts.push(sample_forecast(batch, k, trajectories.to_owned())?);
                    }
                }
                ModelOutput::Distributions(distributions) => {
                    for (k, distribution) in distributions.into_iter().enumerate() {
                        let forecast =
                            DistributionForecast::new(distribution, batch.forecast_starts[k], batch.freq)?
                                .to_sample_forecast(num_samples, &mut rng)?;
                        forecasts.push(with_id(forecast, &batch.item_ids[k]));
                    }
                }
            }
            Ok(())
        })?;
        Ok(forecasts)
    }

    /// Window `records`, call the model per batch and hand each checked output to `handle`
    ///
    /// A model returning a different number of outputs than batch entries
    /// fails with `InferenceError`.
    fn for_each_output<F>(&self, records: Vec<TimeSeriesRecord>, mut handle: F) -> Result<()>
    where
        F: FnMut(&Batch, ModelOutput) -> Result<()>,
    {
        // the prediction sampler never draws from the rng
        let instances = self.chain.instances_batch(records, 0)?;
        for chunk in instances.chunks(self.batch_size) {
            let batch = Batch::stack(chunk)?;
            debug!(batch_size = batch.len(), "Calling forecast model");
            let output = self.model.predict(&batch)?;
            if output.batch_len() != batch.len() {
                return Err(KolosalError::InferenceError(format!(
                    "model returned {} outputs for a batch of {}",
                    output.batch_len(),
                    batch.len()
                )));
            }
            handle(&batch, output)?;
        }
        Ok(())
    }
}

fn sample_forecast(batch: &Batch, k: usize, trajectories: Array2<f64>) -> Result<SampleForecast> {
    let forecast = SampleForecast::new(trajectories.into_dyn(), batch.forecast_starts[k], batch.freq)?;
    Ok(with_id(forecast, &batch.item_ids[k]))
}

fn with_id(forecast: SampleForecast, item_id: &Option<String>) -> SampleForecast {
    match item_id {
        Some(id) => forecast.with_item_id(id.clone()),
        None => forecast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use crate::timefeature::Frequency;
    use chrono::NaiveDate;
    use ndarray::{Array1, Array3};

    /// Repeats the last context value for every sample and step
    struct NaiveModel {
        num_samples: usize,
        prediction_length: usize,
    }

    impl ForecastModel for NaiveModel {
        fn predict(&self, batch: &Batch) -> Result<ModelOutput> {
            let past = batch
                .past_target()
                .ok_or_else(|| KolosalError::InferenceError("no past target".to_string()))?;
            let last = past.shape()[1] - 1;
            Ok(ModelOutput::Samples(Array3::from_shape_fn(
                (batch.len(), self.num_samples, self.prediction_length),
                |(b, _, _)| past[[b, last]],
            )))
        }
    }

    /// Unit variance Gaussian around zero
    struct GaussianModel;

    impl ForecastModel for GaussianModel {
        fn predict(&self, batch: &Batch) -> Result<ModelOutput> {
            Ok(ModelOutput::Distributions(
                (0..batch.len())
                    .map(|_| Distribution::Gaussian {
                        mu: Array1::zeros(3),
                        sigma: Array1::ones(3),
                    })
                    .collect(),
            ))
        }
    }

    fn records(n: usize) -> Vec<TimeSeriesRecord> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|k| {
                TimeSeriesRecord::from_target(start, Frequency::daily(), vec![k as f64; 20 + k])
                    .with_item_id(format!("series-{}", k))
            })
            .collect()
    }

    #[test]
    fn test_predict_samples_in_order() {
        let config = PipelineConfig::new(7, 3, Frequency::daily());
        let predictor = Predictor::new(
            config.prediction_chain().unwrap(),
            NaiveModel {
                num_samples: 5,
                prediction_length: 3,
            },
        )
        .unwrap()
        .with_batch_size(2);

        let forecasts = predictor.predict(records(5)).unwrap();
        assert_eq!(forecasts.len(), 5);
        for (k, forecast) in forecasts.iter().enumerate() {
            assert_eq!(forecast.item_id(), Some(format!("series-{}", k).as_str()));
            assert_eq!(forecast.mean()[0], k as f64);
            assert_eq!(
                forecast.start_date().date(),
                NaiveDate::from_ymd_opt(2023, 1, 21 + k as u32).unwrap()
            );
        }
    }

    #[test]
    fn test_distribution_output_to_samples() {
        let config = PipelineConfig::new(7, 3, Frequency::daily());
        let predictor = Predictor::new(config.prediction_chain().unwrap(), GaussianModel).unwrap();
        let forecasts = predictor.predict_samples(records(2), 50, 1).unwrap();
        assert_eq!(forecasts.len(), 2);
        assert_eq!(forecasts[0].num_samples(), 50);
    }

    #[test]
    fn test_rejects_training_chain() {
        let config = PipelineConfig::new(7, 3, Frequency::daily());
        let result = Predictor::new(config.training_chain().unwrap(), GaussianModel);
        assert!(matches!(result, Err(KolosalError::InvalidConfigurationError(_))));
    }

    #[test]
    fn test_model_output_count_checked() {
        struct Empty;
        impl ForecastModel for Empty {
            fn predict(&self, _batch: &Batch) -> Result<ModelOutput> {
                Ok(ModelOutput::Distributions(Vec::new()))
            }
        }
        let config = PipelineConfig::new(7, 3, Frequency::daily());
        let predictor = Predictor::new(config.prediction_chain().unwrap(), Empty).unwrap();
        assert!(matches!(
            predictor.predict(records(1)),
            Err(KolosalError::InferenceError(_))
        ));
    }

    #[test]
    fn test_sampled_output_count_checked() {
        /// Returns one trajectory set more than requested
        struct Surplus;
        impl ForecastModel for Surplus {
            fn predict(&self, batch: &Batch) -> Result<ModelOutput> {
                Ok(ModelOutput::Samples(Array3::zeros((batch.len() + 1, 4, 3))))
            }
        }
        let config = PipelineConfig::new(7, 3, Frequency::daily());
        let predictor = Predictor::new(config.prediction_chain().unwrap(), Surplus).unwrap();

        assert!(matches!(
            predictor.predict_samples(records(3), 10, 0),
            Err(KolosalError::InferenceError(_))
        ));
        assert!(matches!(
            predictor.predict(records(3)),
            Err(KolosalError::InferenceError(_))
        ));
    }

    #[test]
    fn test_missing_distributions_checked_when_sampling() {
        struct Short;
        impl ForecastModel for Short {
            fn predict(&self, batch: &Batch) -> Result<ModelOutput> {
                Ok(ModelOutput::Distributions(
                    (1..batch.len())
                        .map(|_| Distribution::Gaussian {
                            mu: Array1::zeros(3),
                            sigma: Array1::ones(3),
                        })
                        .collect(),
                ))
            }
        }
        let config = PipelineConfig::new(7, 3, Frequency::daily());
        let predictor = Predictor::new(config.prediction_chain().unwrap(), Short).unwrap();
        assert!(matches!(
            predictor.predict_samples(records(2), 10, 0),
            Err(KolosalError::InferenceError(_))
        ));
    }
}
