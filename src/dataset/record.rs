//! Time series record

use super::FieldName;
use crate::error::{KolosalError, Result};
use crate::timefeature::Frequency;
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayD, Axis};
use std::collections::BTreeMap;

/// Length of the time axis (the last axis) of a dynamic field
pub fn time_length(array: &ArrayD<f64>) -> usize {
    match array.ndim() {
        0 => 0,
        ndim => array.len_of(Axis(ndim - 1)),
    }
}

/// One series: start timestamp, frequency and a keyed field store
///
/// Dynamic fields hold time on their last axis, shape `[T]` or `[C, T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    start: NaiveDateTime,
    freq: Frequency,
    item_id: Option<String>,
    fields: BTreeMap<FieldName, ArrayD<f64>>,
}

impl TimeSeriesRecord {
    /// Create an empty record
    pub fn new(start: NaiveDateTime, freq: Frequency) -> Self {
        Self {
            start,
            freq,
            item_id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Create a record holding a univariate target
    pub fn from_target(start: NaiveDateTime, freq: Frequency, target: Vec<f64>) -> Self {
        Self::new(start, freq).with_field(FieldName::Target, Array1::from_vec(target).into_dyn())
    }

    /// Builder method to add a field
    pub fn with_field(mut self, name: FieldName, value: ArrayD<f64>) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Builder method to set the series identifier
    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn freq(&self) -> &Frequency {
        &self.freq
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn get(&self, name: &FieldName) -> Option<&ArrayD<f64>> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &FieldName) -> bool {
        self.fields.contains_key(name)
    }

    /// Get a field, failing with `MissingFieldError` on behalf of `transform`
    pub fn require(&self, transform: &str, name: &FieldName) -> Result<&ArrayD<f64>> {
        self.fields
            .get(name)
            .ok_or_else(|| KolosalError::missing(transform, name.clone()))
    }

    /// Insert a field, returning the previous value
    pub fn insert(&mut self, name: FieldName, value: ArrayD<f64>) -> Option<ArrayD<f64>> {
        self.fields.insert(name, value)
    }

    /// Insert a new field, refusing to replace a field of a different shape
    pub fn create(&mut self, transform: &str, name: FieldName, value: ArrayD<f64>) -> Result<()> {
        if let Some(existing) = self.fields.get(&name) {
            if existing.shape() != value.shape() {
                return Err(KolosalError::shape_mismatch(
                    transform,
                    name,
                    format!("{:?}", existing.shape()),
                    format!("{:?}", value.shape()),
                ));
            }
        }
        self.fields.insert(name, value);
        Ok(())
    }

    pub fn remove(&mut self, name: &FieldName) -> Option<ArrayD<f64>> {
        self.fields.remove(name)
    }

    /// Keep only the fields for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&FieldName) -> bool) {
        self.fields.retain(|name, _| keep(name));
    }

    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.keys()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldName, &ArrayD<f64>)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of observed steps (time length of TARGET)
    pub fn time_length(&self, transform: &str) -> Result<usize> {
        self.require(transform, &FieldName::Target).map(time_length)
    }

    /// Timestamp of step `index`
    pub fn timestamp_at(&self, index: usize) -> Result<NaiveDateTime> {
        self.freq.step(self.start, index)
    }

    /// Timestamps of the first `length` steps
    pub fn timestamps(&self, length: usize) -> Result<Vec<NaiveDateTime>> {
        self.freq.range(self.start, length)
    }
}
