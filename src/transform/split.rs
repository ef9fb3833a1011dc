//! Sampler-driven windowing into fixed-length instances

use super::InstanceSampler;
use crate::dataset::{time_length, FieldName, TimeSeriesRecord};
use crate::error::{KolosalError, Result};
use crate::timefeature::Frequency;
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayD, Axis, Slice};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One (context, prediction) window cut from a series
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub item_id: Option<String>,
    pub freq: Frequency,
    /// Split index within the source series
    pub split_index: usize,
    /// Timestamp of the first prediction step
    pub forecast_start: NaiveDateTime,
    pub target_field: FieldName,
    /// Context windows of length `context_length`, left-padded when needed
    pub past: BTreeMap<FieldName, ArrayD<f64>>,
    /// 1.0 for padded context positions
    pub past_is_pad: Array1<f64>,
    /// Prediction windows of length `prediction_length`
    pub future: BTreeMap<FieldName, ArrayD<f64>>,
    /// Fields copied through unchanged
    pub statics: BTreeMap<FieldName, ArrayD<f64>>,
}

impl Instance {
    pub fn past_target(&self) -> Option<&ArrayD<f64>> {
        self.past.get(&self.target_field)
    }

    /// Known future target; `None` at pure-inference time
    pub fn future_target(&self) -> Option<&ArrayD<f64>> {
        self.future.get(&self.target_field)
    }

    /// Number of padded context positions
    pub fn num_padded(&self) -> usize {
        self.past_is_pad.iter().filter(|&&v| v > 0.0).count()
    }
}

/// Slices a record into context/prediction windows chosen by an [`InstanceSampler`]
///
/// Target and `time_series_fields` get a context window and, when the record
/// extends far enough, a prediction window. `future_known_fields` must cover
/// the prediction window. Other time-indexed fields (see
/// [`FieldName::is_dynamic`]) are windowed like `time_series_fields`; the
/// remaining fields are copied unchanged into `statics`.
#[derive(Debug, Clone)]
pub struct InstanceSplit {
    target_field: FieldName,
    time_series_fields: Vec<FieldName>,
    future_known_fields: Vec<FieldName>,
    context_length: usize,
    prediction_length: usize,
    sampler: InstanceSampler,
    pad_value: f64,
    allow_padding: bool,
}

impl InstanceSplit {
    pub fn new(sampler: InstanceSampler, context_length: usize, prediction_length: usize) -> Result<Self> {
        if context_length == 0 {
            return Err(KolosalError::config("context_length must be > 0"));
        }
        if prediction_length == 0 {
            return Err(KolosalError::config("prediction_length must be > 0"));
        }
        Ok(Self {
            target_field: FieldName::Target,
            time_series_fields: Vec::new(),
            future_known_fields: Vec::new(),
            context_length,
            prediction_length,
            sampler,
            pad_value: 0.0,
            allow_padding: true,
        })
    }

    pub fn with_target_field(mut self, field: FieldName) -> Self {
        self.target_field = field;
        self
    }

    /// Builder method to set fields windowed alongside the target
    pub fn with_time_series_fields(mut self, fields: Vec<FieldName>) -> Self {
        self.time_series_fields = fields;
        self
    }

    /// Builder method to set fields whose values are known over the horizon
    pub fn with_future_known_fields(mut self, fields: Vec<FieldName>) -> Self {
        self.future_known_fields = fields;
        self
    }

    pub fn with_pad_value(mut self, pad_value: f64) -> Self {
        self.pad_value = pad_value;
        self
    }

    /// Builder method to allow or forbid left padding of short histories
    pub fn with_padding(mut self, allow_padding: bool) -> Self {
        self.allow_padding = allow_padding;
        self
    }

    pub fn name(&self) -> &'static str {
        "InstanceSplit"
    }

    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn prediction_length(&self) -> usize {
        self.prediction_length
    }

    pub fn sampler(&self) -> &InstanceSampler {
        &self.sampler
    }

    pub fn required_fields(&self) -> Vec<FieldName> {
        std::iter::once(self.target_field.clone())
            .chain(self.time_series_fields.iter().cloned())
            .chain(self.future_known_fields.iter().cloned())
            .collect()
    }

    /// Cut `record` into one instance per sampled split index
    pub fn split<R: Rng + ?Sized>(&self, record: TimeSeriesRecord, rng: &mut R) -> Result<Vec<Instance>> {
        let series_length = record.time_length(self.name())?;
        let splits = self
            .sampler
            .sample(series_length, self.context_length, self.prediction_length, rng);

        if splits.is_empty() {
            debug!(
                item_id = record.item_id().unwrap_or("-"),
                series_length,
                context_length = self.context_length,
                prediction_length = self.prediction_length,
                "Series too short for a training window, skipping"
            );
            return Ok(Vec::new());
        }

        // time-indexed fields not named in the configuration are windowed too
        let listed: Vec<&FieldName> = self.required_fields_iter().collect();
        let unlisted_dynamic: Vec<FieldName> = record
            .field_names()
            .filter(|name| name.is_dynamic() && !listed.contains(name))
            .cloned()
            .collect();
        let statics: BTreeMap<FieldName, ArrayD<f64>> = record
            .fields()
            .filter(|(name, _)| !name.is_dynamic() && !listed.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        splits
            .into_iter()
            .map(|index| self.instance_at(&record, index, series_length, &unlisted_dynamic, &statics))
            .collect()
    }

    fn required_fields_iter(&self) -> impl Iterator<Item = &FieldName> {
        std::iter::once(&self.target_field)
            .chain(self.time_series_fields.iter())
            .chain(self.future_known_fields.iter())
    }

    fn instance_at(
        &self,
        record: &TimeSeriesRecord,
        index: usize,
        series_length: usize,
        unlisted_dynamic: &[FieldName],
        statics: &BTreeMap<FieldName, ArrayD<f64>>,
    ) -> Result<Instance> {
        let pad_length = self.context_length.saturating_sub(index);
        if pad_length > 0 {
            if !self.allow_padding {
                return Err(KolosalError::InsufficientHistoryError {
                    series_length,
                    context_length: self.context_length,
                });
            }
            if !self.sampler.is_training() {
                warn!(
                    item_id = record.item_id().unwrap_or("-"),
                    series_length,
                    pad_length,
                    "Left-padding prediction context"
                );
            }
        }

        let future_end = index + self.prediction_length;
        let mut past = BTreeMap::new();
        let mut future = BTreeMap::new();

        let optional_future = std::iter::once(&self.target_field)
            .chain(self.time_series_fields.iter())
            .chain(unlisted_dynamic.iter());
        for field in optional_future {
            let value = record.require(self.name(), field)?;
            past.insert(field.clone(), self.past_window(field, value, index)?);
            if time_length(value) >= future_end {
                future.insert(field.clone(), future_window(value, index, future_end));
            }
        }

        for field in &self.future_known_fields {
            let value = record.require(self.name(), field)?;
            let length = time_length(value);
            if length < future_end {
                return Err(KolosalError::shape_mismatch(
                    self.name(),
                    field.clone(),
                    format!("time length >= {}", future_end),
                    format!("time length {}", length),
                ));
            }
            past.insert(field.clone(), self.past_window(field, value, index)?);
            future.insert(field.clone(), future_window(value, index, future_end));
        }

        let past_is_pad = Array1::from_shape_fn(self.context_length, |t| {
            if t < pad_length {
                1.0
            } else {
                0.0
            }
        });

        Ok(Instance {
            item_id: record.item_id().map(str::to_string),
            freq: *record.freq(),
            split_index: index,
            forecast_start: record.timestamp_at(index)?,
            target_field: self.target_field.clone(),
            past,
            past_is_pad,
            future,
            statics: statics.clone(),
        })
    }

    /// `[index - context_length, index)` along the time axis, left-padded
    fn past_window(&self, field: &FieldName, value: &ArrayD<f64>, index: usize) -> Result<ArrayD<f64>> {
        if value.ndim() == 0 {
            return Err(KolosalError::shape_mismatch(
                self.name(),
                field.clone(),
                "a time axis",
                "a scalar",
            ));
        }
        let length = time_length(value);
        if length < index {
            return Err(KolosalError::shape_mismatch(
                self.name(),
                field.clone(),
                format!("time length >= {}", index),
                format!("time length {}", length),
            ));
        }

        let axis = Axis(value.ndim() - 1);
        let source_start = index.saturating_sub(self.context_length);
        let offset = self.context_length - (index - source_start);

        let mut shape = value.shape().to_vec();
        shape[axis.index()] = self.context_length;
        let mut window = ArrayD::from_elem(shape, self.pad_value);
        window
            .slice_axis_mut(axis, Slice::from(offset..))
            .assign(&value.slice_axis(axis, Slice::from(source_start..index)));
        Ok(window)
    }
}

/// `[start, end)` along the time axis
fn future_window(value: &ArrayD<f64>, start: usize, end: usize) -> ArrayD<f64> {
    let axis = Axis(value.ndim() - 1);
    value.slice_axis(axis, Slice::from(start..end)).to_owned()
}
