//! Feature-creating transforms

use super::Transform;
use crate::dataset::{time_length, FieldName, TimeSeriesRecord};
use crate::error::{KolosalError, Result};
use crate::timefeature::{age_feature, linear_age_feature, time_features, TimeFeature};
use ndarray::{concatenate, Array2, ArrayD, Axis, Ix2};

/// Creates OBSERVED_VALUES: 1.0 where the target is finite, 0.0 where missing
#[derive(Debug, Clone)]
pub struct AddObservedValueIndicator {
    target_field: FieldName,
    output_field: FieldName,
    /// Replace missing target values with this value after recording the mask
    impute_value: Option<f64>,
}

impl AddObservedValueIndicator {
    pub fn new() -> Self {
        Self {
            target_field: FieldName::Target,
            output_field: FieldName::ObservedValues,
            impute_value: None,
        }
    }

    /// Builder method to set the field inspected for missing values
    pub fn with_target_field(mut self, field: FieldName) -> Self {
        self.target_field = field;
        self
    }

    /// Builder method to set the output field
    pub fn with_output_field(mut self, field: FieldName) -> Self {
        self.output_field = field;
        self
    }

    /// Builder method to fill missing target values with `value`
    pub fn with_imputation(mut self, value: f64) -> Self {
        self.impute_value = Some(value);
        self
    }
}

impl Default for AddObservedValueIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for AddObservedValueIndicator {
    fn name(&self) -> &'static str {
        "AddObservedValueIndicator"
    }

    fn required_fields(&self) -> Vec<FieldName> {
        vec![self.target_field.clone()]
    }

    fn produced_fields(&self) -> Vec<FieldName> {
        vec![self.output_field.clone()]
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        let target = record.require(self.name(), &self.target_field)?;
        let observed = target.mapv(|v| if v.is_finite() { 1.0 } else { 0.0 });
        let imputed = self
            .impute_value
            .map(|fill| target.mapv(|v| if v.is_finite() { v } else { fill }));

        record.create(self.name(), self.output_field.clone(), observed)?;
        if let Some(imputed) = imputed {
            record.insert(self.target_field.clone(), imputed);
        }
        Ok(())
    }
}

/// Creates FEAT_DYNAMIC_AGE over the observed history plus `horizon` steps
#[derive(Debug, Clone)]
pub struct AddAgeFeature {
    target_field: FieldName,
    output_field: FieldName,
    horizon: usize,
    log_scale: bool,
}

impl AddAgeFeature {
    /// `horizon` is the number of steps past the last observation to cover
    /// (the prediction length at inference, 0 during training)
    pub fn new(horizon: usize) -> Self {
        Self {
            target_field: FieldName::Target,
            output_field: FieldName::FeatDynamicAge,
            horizon,
            log_scale: true,
        }
    }

    /// Builder method to emit the raw step index instead of `ln(2 + t)`
    pub fn with_log_scale(mut self, log_scale: bool) -> Self {
        self.log_scale = log_scale;
        self
    }

    pub fn with_output_field(mut self, field: FieldName) -> Self {
        self.output_field = field;
        self
    }
}

impl Transform for AddAgeFeature {
    fn name(&self) -> &'static str {
        "AddAgeFeature"
    }

    fn required_fields(&self) -> Vec<FieldName> {
        vec![self.target_field.clone()]
    }

    fn produced_fields(&self) -> Vec<FieldName> {
        vec![self.output_field.clone()]
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        let length = time_length(record.require(self.name(), &self.target_field)?) + self.horizon;
        let age = if self.log_scale {
            age_feature(length)
        } else {
            linear_age_feature(length)
        };
        record.create(self.name(), self.output_field.clone(), age.into_dyn())
    }
}

/// Creates FEAT_TIME `[channels, T + horizon]` from the record's calendar
#[derive(Debug, Clone)]
pub struct AddTimeFeature {
    target_field: FieldName,
    output_field: FieldName,
    features: Vec<TimeFeature>,
    horizon: usize,
}

impl AddTimeFeature {
    pub fn new(features: Vec<TimeFeature>, horizon: usize) -> Self {
        Self {
            target_field: FieldName::Target,
            output_field: FieldName::FeatTime,
            features,
            horizon,
        }
    }

    pub fn features(&self) -> &[TimeFeature] {
        &self.features
    }
}

impl Transform for AddTimeFeature {
    fn name(&self) -> &'static str {
        "AddTimeFeature"
    }

    fn required_fields(&self) -> Vec<FieldName> {
        vec![self.target_field.clone()]
    }

    fn produced_fields(&self) -> Vec<FieldName> {
        vec![self.output_field.clone()]
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        let length = time_length(record.require(self.name(), &self.target_field)?) + self.horizon;
        let timestamps = record.timestamps(length)?;
        let features = time_features(&timestamps, &self.features);
        record.create(self.name(), self.output_field.clone(), features.into_dyn())
    }
}

/// Concatenates dynamic fields along the channel axis
///
/// 1-D inputs contribute a single channel. All inputs must share the same
/// time length.
#[derive(Debug, Clone)]
pub struct VstackFeatures {
    input_fields: Vec<FieldName>,
    output_field: FieldName,
    drop_inputs: bool,
}

impl VstackFeatures {
    pub fn new(input_fields: Vec<FieldName>, output_field: FieldName) -> Self {
        Self {
            input_fields,
            output_field,
            drop_inputs: false,
        }
    }

    /// Builder method to remove the inputs after stacking
    pub fn with_drop_inputs(mut self, drop_inputs: bool) -> Self {
        self.drop_inputs = drop_inputs;
        self
    }

    fn as_channels(&self, field: &FieldName, array: &ArrayD<f64>) -> Result<Array2<f64>> {
        match array.ndim() {
            1 => Ok(array.clone().insert_axis(Axis(0)).into_dimensionality::<Ix2>()?),
            2 => Ok(array.clone().into_dimensionality::<Ix2>()?),
            ndim => Err(KolosalError::shape_mismatch(
                self.name(),
                field.clone(),
                "1 or 2 dimensions",
                format!("{} dimensions", ndim),
            )),
        }
    }

    fn to_remove(&self) -> Vec<FieldName> {
        if !self.drop_inputs {
            return Vec::new();
        }
        self.input_fields
            .iter()
            .filter(|field| **field != self.output_field)
            .cloned()
            .collect()
    }
}

impl Transform for VstackFeatures {
    fn name(&self) -> &'static str {
        "VstackFeatures"
    }

    fn required_fields(&self) -> Vec<FieldName> {
        self.input_fields.clone()
    }

    fn produced_fields(&self) -> Vec<FieldName> {
        vec![self.output_field.clone()]
    }

    fn removed_fields(&self) -> Vec<FieldName> {
        self.to_remove()
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        if self.input_fields.is_empty() {
            return Err(KolosalError::config("VstackFeatures requires at least one input field"));
        }

        let mut blocks = Vec::with_capacity(self.input_fields.len());
        let mut expected_length: Option<usize> = None;
        for field in &self.input_fields {
            let block = self.as_channels(field, record.require(self.name(), field)?)?;
            let length = block.ncols();
            match expected_length {
                Some(expected) if expected != length => {
                    return Err(KolosalError::shape_mismatch(
                        self.name(),
                        field.clone(),
                        format!("time length {}", expected),
                        format!("time length {}", length),
                    ));
                }
                None => expected_length = Some(length),
                _ => {}
            }
            blocks.push(block);
        }

        let views: Vec<_> = blocks.iter().map(|block| block.view()).collect();
        let stacked = concatenate(Axis(0), &views)?;

        // an output stacked from itself is replaced, any other existing output must keep its shape
        if self.input_fields.contains(&self.output_field) {
            record.remove(&self.output_field);
        }
        record.create(self.name(), self.output_field.clone(), stacked.into_dyn())?;
        for field in self.to_remove() {
            record.remove(&field);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timefeature::Frequency;
    use chrono::NaiveDate;
    use ndarray::{array, Array1};

    fn record(target: Vec<f64>) -> TimeSeriesRecord {
        let start = NaiveDate::from_ymd_opt(1949, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeriesRecord::from_target(start, Frequency::monthly(), target)
    }

    #[test]
    fn test_observed_values_marks_missing() {
        let mut rec = record(vec![1.0, f64::NAN, 3.0, f64::INFINITY]);
        AddObservedValueIndicator::new().apply(&mut rec).unwrap();

        let observed = rec.get(&FieldName::ObservedValues).unwrap();
        assert_eq!(observed.as_slice().unwrap(), &[1.0, 0.0, 1.0, 0.0]);
        // target untouched
        assert!(rec.get(&FieldName::Target).unwrap()[1].is_nan());
    }

    #[test]
    fn test_observed_values_with_imputation() {
        let mut rec = record(vec![1.0, f64::NAN]);
        AddObservedValueIndicator::new()
            .with_imputation(0.0)
            .apply(&mut rec)
            .unwrap();
        assert_eq!(rec.get(&FieldName::Target).unwrap().as_slice().unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn test_age_feature_covers_horizon() {
        let mut rec = record(vec![0.0; 10]);
        AddAgeFeature::new(4).apply(&mut rec).unwrap();

        let age = rec.get(&FieldName::FeatDynamicAge).unwrap();
        assert_eq!(age.len(), 14);
        assert!((age[0] - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_time_feature_shape() {
        let mut rec = record(vec![0.0; 12]);
        AddTimeFeature::new(vec![TimeFeature::MonthOfYear], 6)
            .apply(&mut rec)
            .unwrap();

        let feat = rec.get(&FieldName::FeatTime).unwrap();
        assert_eq!(feat.shape(), &[1, 18]);
        assert!((feat[[0, 0]] + 0.5).abs() < 1e-12);
        assert!((feat[[0, 11]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_vstack_mixed_dimensions() {
        let mut rec = record(vec![0.0; 3])
            .with_field(FieldName::FeatTime, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn())
            .with_field(FieldName::FeatDynamicAge, array![7.0, 8.0, 9.0].into_dyn());

        VstackFeatures::new(
            vec![FieldName::FeatTime, FieldName::FeatDynamicAge],
            FieldName::FeatDynamic,
        )
        .with_drop_inputs(true)
        .apply(&mut rec)
        .unwrap();

        let stacked = rec.get(&FieldName::FeatDynamic).unwrap();
        assert_eq!(stacked.shape(), &[3, 3]);
        assert_eq!(stacked[[2, 1]], 8.0);
        assert!(!rec.contains(&FieldName::FeatTime));
        assert!(!rec.contains(&FieldName::FeatDynamicAge));
    }

    #[test]
    fn test_vstack_rejects_length_mismatch() {
        let mut rec = record(vec![0.0; 3])
            .with_field(FieldName::FeatTime, Array1::zeros(3).into_dyn())
            .with_field(FieldName::FeatDynamicAge, Array1::zeros(4).into_dyn());

        let err = VstackFeatures::new(
            vec![FieldName::FeatTime, FieldName::FeatDynamicAge],
            FieldName::FeatDynamic,
        )
        .apply(&mut rec)
        .unwrap_err();

        assert!(matches!(
            err,
            KolosalError::ShapeMismatchError { field: FieldName::FeatDynamicAge, .. }
        ));
    }

    #[test]
    fn test_vstack_refuses_to_replace_incompatible_output() {
        let mut rec = record(vec![0.0; 3])
            .with_field(FieldName::FeatTime, Array1::zeros(3).into_dyn())
            .with_field(FieldName::FeatDynamic, Array1::zeros(5).into_dyn());

        let err = VstackFeatures::new(vec![FieldName::FeatTime], FieldName::FeatDynamic)
            .with_drop_inputs(true)
            .apply(&mut rec)
            .unwrap_err();

        assert!(matches!(
            err,
            KolosalError::ShapeMismatchError { field: FieldName::FeatDynamic, .. }
        ));
        // nothing dropped on failure
        assert!(rec.contains(&FieldName::FeatTime));
    }

    #[test]
    fn test_vstack_into_one_of_its_inputs() {
        let mut rec = record(vec![0.0; 3])
            .with_field(FieldName::FeatTime, Array1::zeros(3).into_dyn())
            .with_field(FieldName::FeatDynamicReal, Array1::ones(3).into_dyn());

        VstackFeatures::new(
            vec![FieldName::FeatDynamicReal, FieldName::FeatTime],
            FieldName::FeatDynamicReal,
        )
        .with_drop_inputs(true)
        .apply(&mut rec)
        .unwrap();

        assert_eq!(rec.get(&FieldName::FeatDynamicReal).unwrap().shape(), &[2, 3]);
        assert!(!rec.contains(&FieldName::FeatTime));
    }

    #[test]
    fn test_vstack_rejects_missing_input() {
        let mut rec = record(vec![0.0; 3]);
        let err = VstackFeatures::new(vec![FieldName::FeatTime], FieldName::FeatDynamic)
            .apply(&mut rec)
            .unwrap_err();
        assert_eq!(err, KolosalError::missing("VstackFeatures", FieldName::FeatTime));
    }
}
