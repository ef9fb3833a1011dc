//! Pipeline configuration

use crate::dataset::FieldName;
use crate::error::{KolosalError, Result};
use crate::timefeature::{lags_for_frequency, time_features_for_frequency, Frequency, DEFAULT_LAG_UB};
use crate::transform::{
    AddAgeFeature, AddObservedValueIndicator, AddTimeFeature, AsArray, InstanceSampler,
    InstanceSplit, RemoveFields, SetField, TransformChain, VstackFeatures,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

/// Training-time window sampling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainSamplerKind {
    /// `num_instances` uniform draws per series
    Uniform,
    /// Bernoulli selection with `num_instances` expected hits per series
    #[default]
    ExpectedNum,
}

/// Options from which the training and prediction chains are assembled
///
/// `context_length`, `prediction_length` and `freq` are required when
/// deserializing; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Window length fed to the model
    pub context_length: usize,

    /// Horizon length
    pub prediction_length: usize,

    /// Calendar step of every series
    pub freq: Frequency,

    /// Stack FEAT_DYNAMIC_REAL into the model features
    #[serde(default)]
    pub use_feat_dynamic_real: bool,

    /// Keep FEAT_STATIC_CAT (otherwise replaced by a single zero)
    #[serde(default)]
    pub use_feat_static_cat: bool,

    /// Keep FEAT_STATIC_REAL (otherwise replaced by a single zero)
    #[serde(default)]
    pub use_feat_static_real: bool,

    /// Expected (or exact, for uniform sampling) training windows per series
    #[serde(default = "default_num_instances")]
    pub num_instances: usize,

    /// Minimum training windows per series for expected-number sampling
    #[serde(default)]
    pub min_instances: usize,

    #[serde(default)]
    pub train_sampler: TrainSamplerKind,

    /// Extend the context window by the largest lag so lagged values are available
    #[serde(default)]
    pub extend_history_by_lags: bool,

    /// Upper bound on generated lags
    #[serde(default = "default_lag_ub")]
    pub lag_ub: usize,

    /// Value used to left-pad short histories
    #[serde(default)]
    pub pad_value: f64,

    /// Left-pad histories shorter than the context window instead of failing
    #[serde(default = "default_allow_padding")]
    pub allow_padding: bool,
}

fn default_num_instances() -> usize {
    1
}

fn default_lag_ub() -> usize {
    DEFAULT_LAG_UB
}

fn default_allow_padding() -> bool {
    true
}

impl PipelineConfig {
    /// Create a configuration with default optional settings
    pub fn new(context_length: usize, prediction_length: usize, freq: Frequency) -> Self {
        Self {
            context_length,
            prediction_length,
            freq,
            use_feat_dynamic_real: false,
            use_feat_static_cat: false,
            use_feat_static_real: false,
            num_instances: default_num_instances(),
            min_instances: 0,
            train_sampler: TrainSamplerKind::default(),
            extend_history_by_lags: false,
            lag_ub: DEFAULT_LAG_UB,
            pad_value: 0.0,
            allow_padding: true,
        }
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing or mistyped options are configuration errors; malformed JSON
    /// is a serialization error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| match e.classify() {
            Category::Data => KolosalError::config(e.to_string()),
            _ => KolosalError::from(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to enable dynamic real features
    pub fn with_feat_dynamic_real(mut self, enabled: bool) -> Self {
        self.use_feat_dynamic_real = enabled;
        self
    }

    pub fn with_feat_static_cat(mut self, enabled: bool) -> Self {
        self.use_feat_static_cat = enabled;
        self
    }

    pub fn with_feat_static_real(mut self, enabled: bool) -> Self {
        self.use_feat_static_real = enabled;
        self
    }

    /// Builder method to set the training sampler
    pub fn with_train_sampler(mut self, kind: TrainSamplerKind, num_instances: usize) -> Self {
        self.train_sampler = kind;
        self.num_instances = num_instances;
        self
    }

    /// Builder method to allow or forbid left padding of short histories
    pub fn with_padding(mut self, allow_padding: bool) -> Self {
        self.allow_padding = allow_padding;
        self
    }

    pub fn with_lag_history(mut self, enabled: bool) -> Self {
        self.extend_history_by_lags = enabled;
        self
    }

    /// Reject out-of-range options
    pub fn validate(&self) -> Result<()> {
        if self.context_length == 0 {
            return Err(KolosalError::config("context_length must be > 0"));
        }
        if self.prediction_length == 0 {
            return Err(KolosalError::config("prediction_length must be > 0"));
        }
        if self.num_instances == 0 {
            return Err(KolosalError::config("num_instances must be > 0"));
        }
        if self.lag_ub == 0 {
            return Err(KolosalError::config("lag_ub must be > 0"));
        }
        if !self.pad_value.is_finite() {
            return Err(KolosalError::config("pad_value must be finite"));
        }
        Ok(())
    }

    /// Lags for the configured frequency
    pub fn lags(&self) -> Vec<usize> {
        lags_for_frequency(&self.freq, self.lag_ub, None)
    }

    /// Length of the windowed history: the context plus the largest lag if enabled
    pub fn history_length(&self) -> usize {
        if self.extend_history_by_lags {
            self.context_length + self.lags().last().copied().unwrap_or(0)
        } else {
            self.context_length
        }
    }

    /// Training sampler derived from the configuration
    pub fn train_instance_sampler(&self) -> InstanceSampler {
        match self.train_sampler {
            TrainSamplerKind::Uniform => InstanceSampler::uniform(self.num_instances),
            TrainSamplerKind::ExpectedNum => {
                InstanceSampler::expected_num(self.num_instances as f64, self.min_instances)
            }
        }
    }

    /// Fields an input record must carry for the configured options
    pub fn required_input_fields(&self) -> Vec<FieldName> {
        let mut fields = vec![FieldName::Target];
        if self.use_feat_dynamic_real {
            fields.push(FieldName::FeatDynamicReal);
        }
        if self.use_feat_static_cat {
            fields.push(FieldName::FeatStaticCat);
        }
        if self.use_feat_static_real {
            fields.push(FieldName::FeatStaticReal);
        }
        fields
    }

    /// Chain drawing random training windows
    pub fn training_chain(&self) -> Result<TransformChain> {
        self.chain(self.train_instance_sampler(), 0)
    }

    /// Chain producing the single window ending at the last observation
    pub fn prediction_chain(&self) -> Result<TransformChain> {
        self.chain(InstanceSampler::prediction(), self.prediction_length)
    }

    /// Chain holding out the last `prediction_length` steps of each series
    pub fn validation_chain(&self) -> Result<TransformChain> {
        self.chain(InstanceSampler::validation(), 0)
    }

    fn chain(&self, sampler: InstanceSampler, horizon: usize) -> Result<TransformChain> {
        self.validate()?;

        let mut removed = vec![FieldName::FeatDynamicCat];
        if !self.use_feat_dynamic_real {
            removed.push(FieldName::FeatDynamicReal);
        }
        if !self.use_feat_static_cat {
            removed.push(FieldName::FeatStaticCat);
        }
        if !self.use_feat_static_real {
            removed.push(FieldName::FeatStaticReal);
        }

        let mut builder = TransformChain::builder().add(RemoveFields::new(removed));
        if !self.use_feat_static_cat {
            builder = builder.add(SetField::new(FieldName::FeatStaticCat, Array1::zeros(1).into_dyn()));
        }
        if !self.use_feat_static_real {
            builder = builder.add(SetField::new(FieldName::FeatStaticReal, Array1::zeros(1).into_dyn()));
        }

        let mut dynamic = vec![FieldName::FeatTime, FieldName::FeatDynamicAge];
        if self.use_feat_dynamic_real {
            dynamic.push(FieldName::FeatDynamicReal);
        }

        let split = InstanceSplit::new(sampler, self.history_length(), self.prediction_length)?
            .with_time_series_fields(vec![FieldName::ObservedValues])
            .with_future_known_fields(vec![FieldName::FeatDynamic])
            .with_pad_value(self.pad_value)
            .with_padding(self.allow_padding);

        builder
            .add(AsArray::new(FieldName::FeatStaticCat, 1))
            .add(AsArray::new(FieldName::FeatStaticReal, 1))
            .add(AsArray::new(FieldName::Target, 1))
            .add(AddObservedValueIndicator::new())
            .add(AddTimeFeature::new(time_features_for_frequency(&self.freq), horizon))
            .add(AddAgeFeature::new(horizon))
            .add(VstackFeatures::new(dynamic, FieldName::FeatDynamic).with_drop_inputs(true))
            .split(split)
            .build(&self.required_input_fields())
    }
}
