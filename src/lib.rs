//! Kolosal Time Series - probabilistic forecasting preprocessing
//!
//! This crate turns raw, variable-length time series into fixed-shape model
//! inputs and represents the resulting predictive distributions:
//! - Data model for one series and its fields
//! - Frequency-aware lag, calendar and age features
//! - Composable transform chains with static field checks
//! - Training and prediction instance sampling and windowing
//! - Sample-based and parametric forecasts with evaluation metrics
//!
//! # Modules
//!
//! - [`dataset`] - `TimeSeriesRecord` and the field vocabulary
//! - [`timefeature`] - Frequencies, lags, time and age features
//! - [`transform`] - Transforms, chains, samplers and instance splitting
//! - [`forecast`] - Forecast representations and metrics
//! - [`pipeline`] - Configuration, batching and the predictor

// Core error handling
pub mod error;

// Data model and features
pub mod dataset;
pub mod timefeature;

// Preprocessing and windowing
pub mod transform;

// Outputs
pub mod forecast;

// Glue
pub mod pipeline;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{KolosalError, Result};

    // Data model
    pub use crate::dataset::{FieldName, TimeSeriesRecord};

    // Features
    pub use crate::timefeature::{
        age_feature, lags_for_frequency, time_features_for_frequency, Frequency, FrequencyUnit,
        TimeFeature,
    };

    // Transforms
    pub use crate::transform::{
        AddAgeFeature, AddObservedValueIndicator, AddTimeFeature, AsArray, Instance,
        InstanceSampler, InstanceSplit, RemoveFields, SelectFields, SetField, Transform,
        TransformChain, VstackFeatures,
    };

    // Forecasts
    pub use crate::forecast::{Distribution, DistributionForecast, Forecast, SampleForecast};

    // Pipeline
    pub use crate::pipeline::{Batch, ForecastModel, ModelOutput, PipelineConfig, Predictor};
}
