//! Field management transforms

use super::Transform;
use crate::dataset::{FieldName, TimeSeriesRecord};
use crate::error::{KolosalError, Result};
use ndarray::{ArrayD, Axis};
use std::collections::BTreeSet;

/// Drops the named fields; absent names are ignored
#[derive(Debug, Clone)]
pub struct RemoveFields {
    fields: Vec<FieldName>,
}

impl RemoveFields {
    pub fn new(fields: Vec<FieldName>) -> Self {
        Self { fields }
    }
}

impl Transform for RemoveFields {
    fn name(&self) -> &'static str {
        "RemoveFields"
    }

    fn removed_fields(&self) -> Vec<FieldName> {
        self.fields.clone()
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        for field in &self.fields {
            record.remove(field);
        }
        Ok(())
    }
}

/// Keeps only the named fields; every one of them must be present
#[derive(Debug, Clone)]
pub struct SelectFields {
    fields: Vec<FieldName>,
}

impl SelectFields {
    pub fn new(fields: Vec<FieldName>) -> Self {
        Self { fields }
    }
}

impl Transform for SelectFields {
    fn name(&self) -> &'static str {
        "SelectFields"
    }

    fn required_fields(&self) -> Vec<FieldName> {
        self.fields.clone()
    }

    fn declare(&self, available: &mut BTreeSet<FieldName>) {
        available.retain(|field| self.fields.contains(field));
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        for field in &self.fields {
            record.require(self.name(), field)?;
        }
        record.retain(|field| self.fields.contains(field));
        Ok(())
    }
}

/// Sets a field to an explicit value, overwriting any previous value
#[derive(Debug, Clone)]
pub struct SetField {
    field: FieldName,
    value: ArrayD<f64>,
}

impl SetField {
    pub fn new(field: FieldName, value: ArrayD<f64>) -> Self {
        Self { field, value }
    }
}

impl Transform for SetField {
    fn name(&self) -> &'static str {
        "SetField"
    }

    fn produced_fields(&self) -> Vec<FieldName> {
        vec![self.field.clone()]
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        record.insert(self.field.clone(), self.value.clone());
        Ok(())
    }
}

/// Normalises a field to `expected_ndim` dimensions by adding leading axes
///
/// Scalars become `[1]`, series become `[1, T]` when two dimensions are
/// expected. A field with more dimensions than expected is rejected.
#[derive(Debug, Clone)]
pub struct AsArray {
    field: FieldName,
    expected_ndim: usize,
}

impl AsArray {
    pub fn new(field: FieldName, expected_ndim: usize) -> Self {
        Self { field, expected_ndim }
    }
}

impl Transform for AsArray {
    fn name(&self) -> &'static str {
        "AsArray"
    }

    fn required_fields(&self) -> Vec<FieldName> {
        vec![self.field.clone()]
    }

    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()> {
        let value = record.require(self.name(), &self.field)?;
        if value.ndim() > self.expected_ndim {
            return Err(KolosalError::shape_mismatch(
                self.name(),
                self.field.clone(),
                format!("{} dimensions", self.expected_ndim),
                format!("{} dimensions", value.ndim()),
            ));
        }
        if value.ndim() == self.expected_ndim {
            return Ok(());
        }

        let mut reshaped = value.clone();
        while reshaped.ndim() < self.expected_ndim {
            reshaped.insert_axis_inplace(Axis(0));
        }
        record.insert(self.field.clone(), reshaped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timefeature::Frequency;
    use chrono::NaiveDate;
    use ndarray::{arr0, Array1};

    fn record() -> TimeSeriesRecord {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeriesRecord::from_target(start, Frequency::daily(), vec![1.0, 2.0, 3.0])
            .with_field(FieldName::FeatStaticCat, Array1::from_vec(vec![2.0]).into_dyn())
    }

    #[test]
    fn test_remove_ignores_absent() {
        let mut rec = record();
        RemoveFields::new(vec![FieldName::FeatStaticCat, FieldName::FeatTime])
            .apply(&mut rec)
            .unwrap();
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn test_select_keeps_only_named() {
        let mut rec = record();
        SelectFields::new(vec![FieldName::Target]).apply(&mut rec).unwrap();
        assert_eq!(rec.field_names().collect::<Vec<_>>(), vec![&FieldName::Target]);
    }

    #[test]
    fn test_select_fails_on_absent() {
        let mut rec = record();
        let err = SelectFields::new(vec![FieldName::Target, FieldName::ObservedValues])
            .apply(&mut rec)
            .unwrap_err();
        assert_eq!(err, KolosalError::missing("SelectFields", FieldName::ObservedValues));
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut rec = record();
        SetField::new(FieldName::FeatStaticCat, Array1::zeros(3).into_dyn())
            .apply(&mut rec)
            .unwrap();
        assert_eq!(rec.get(&FieldName::FeatStaticCat).unwrap().len(), 3);
    }

    #[test]
    fn test_as_array_expands_scalar() {
        let mut rec = record().with_field(FieldName::FeatStaticReal, arr0(4.0).into_dyn());
        AsArray::new(FieldName::FeatStaticReal, 1).apply(&mut rec).unwrap();
        assert_eq!(rec.get(&FieldName::FeatStaticReal).unwrap().shape(), &[1]);

        let err = AsArray::new(FieldName::Target, 0).apply(&mut rec).unwrap_err();
        assert!(matches!(err, KolosalError::ShapeMismatchError { .. }));
    }
}
