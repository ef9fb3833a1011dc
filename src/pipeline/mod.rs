//! Pipeline module
//!
//! Connects configuration, transform chains and an external model:
//! - [`PipelineConfig`] - typed options and chain assembly
//! - [`Batch`] - instances stacked into fixed-shape arrays
//! - [`Predictor`] - prediction chain, model call and forecast construction

mod batch;
mod config;
mod predictor;

pub use batch::Batch;
pub use config::{PipelineConfig, TrainSamplerKind};
pub use predictor::{ForecastModel, ModelOutput, Predictor};
