//! Transform module
//!
//! Provides the composable preprocessing steps applied to a
//! [`TimeSeriesRecord`] before windowing:
//! - Observed value indicator, age and calendar features
//! - Feature stacking
//! - Field selection, removal and assignment
//! - Instance sampling and splitting into context/target windows

mod feature;
mod field;
mod sampler;
mod split;

pub use feature::{AddAgeFeature, AddObservedValueIndicator, AddTimeFeature, VstackFeatures};
pub use field::{AsArray, RemoveFields, SelectFields, SetField};
pub use sampler::InstanceSampler;
pub use split::{Instance, InstanceSplit};

use crate::dataset::{FieldName, TimeSeriesRecord};
use crate::error::{KolosalError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// A named, stateless preprocessing step
pub trait Transform: Send + Sync + fmt::Debug {
    /// Name reported in errors and logs
    fn name(&self) -> &'static str;

    /// Fields that must be present before the step runs
    fn required_fields(&self) -> Vec<FieldName> {
        Vec::new()
    }

    /// Fields the step creates or overwrites
    fn produced_fields(&self) -> Vec<FieldName> {
        Vec::new()
    }

    /// Fields the step drops
    fn removed_fields(&self) -> Vec<FieldName> {
        Vec::new()
    }

    /// Update the statically known field set after this step
    fn declare(&self, available: &mut BTreeSet<FieldName>) {
        for field in self.removed_fields() {
            available.remove(&field);
        }
        available.extend(self.produced_fields());
    }

    /// Apply the step to a record in place
    fn apply(&self, record: &mut TimeSeriesRecord) -> Result<()>;
}

/// Ordered sequence of transforms with an optional terminal [`InstanceSplit`]
#[derive(Debug)]
pub struct TransformChain {
    steps: Vec<Box<dyn Transform>>,
    split: Option<InstanceSplit>,
}

impl TransformChain {
    pub fn builder() -> TransformChainBuilder {
        TransformChainBuilder::new()
    }

    pub fn steps(&self) -> impl Iterator<Item = &dyn Transform> {
        self.steps.iter().map(|step| step.as_ref())
    }

    pub fn split(&self) -> Option<&InstanceSplit> {
        self.split.as_ref()
    }

    /// Run every map step in order
    pub fn apply(&self, mut record: TimeSeriesRecord) -> Result<TimeSeriesRecord> {
        debug!(
            item_id = record.item_id().unwrap_or("-"),
            steps = self.steps.len(),
            "Applying transform chain"
        );
        for step in &self.steps {
            step.apply(&mut record)?;
        }
        Ok(record)
    }

    /// Run the map steps, then split the record into instances
    pub fn instances<R: Rng + ?Sized>(
        &self,
        record: TimeSeriesRecord,
        rng: &mut R,
    ) -> Result<Vec<Instance>> {
        let split = self.split.as_ref().ok_or_else(|| {
            KolosalError::config("transform chain has no InstanceSplit step")
        })?;
        let record = self.apply(record)?;
        split.split(record, rng)
    }

    /// Transform independent records in parallel
    pub fn apply_batch(&self, records: Vec<TimeSeriesRecord>) -> Result<Vec<TimeSeriesRecord>> {
        records
            .into_par_iter()
            .map(|record| self.apply(record))
            .collect()
    }

    /// Split independent records in parallel, flattened in record order
    ///
    /// Record `k` samples from its own `ChaCha8Rng` seeded with `seed` on
    /// stream `k`, so the output does not depend on thread scheduling.
    pub fn instances_batch(&self, records: Vec<TimeSeriesRecord>, seed: u64) -> Result<Vec<Instance>> {
        let per_record: Vec<Vec<Instance>> = records
            .into_par_iter()
            .enumerate()
            .map(|(index, record)| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(index as u64);
                self.instances(record, &mut rng)
            })
            .collect::<Result<_>>()?;
        Ok(per_record.into_iter().flatten().collect())
    }
}

/// Builder for [`TransformChain`]
#[derive(Debug, Default)]
pub struct TransformChainBuilder {
    steps: Vec<Box<dyn Transform>>,
    split: Option<InstanceSplit>,
}

impl TransformChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn add<T: Transform + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append an already boxed step
    pub fn add_boxed(mut self, step: Box<dyn Transform>) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the terminal windowing step
    pub fn split(mut self, split: InstanceSplit) -> Self {
        self.split = Some(split);
        self
    }

    /// Build the chain, checking field dependencies statically
    ///
    /// `guaranteed` lists the fields every input record is known to carry.
    /// A step requiring a field that is neither guaranteed nor produced by an
    /// earlier step (or was removed by one) fails with `MissingFieldError`.
    pub fn build(self, guaranteed: &[FieldName]) -> Result<TransformChain> {
        let mut available: BTreeSet<FieldName> = guaranteed.iter().cloned().collect();

        for step in &self.steps {
            for field in step.required_fields() {
                if !available.contains(&field) {
                    return Err(KolosalError::missing(step.name(), field));
                }
            }
            step.declare(&mut available);
        }

        if let Some(split) = &self.split {
            for field in split.required_fields() {
                if !available.contains(&field) {
                    return Err(KolosalError::missing(split.name(), field));
                }
            }
        }

        Ok(TransformChain {
            steps: self.steps,
            split: self.split,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timefeature::Frequency;
    use chrono::NaiveDate;
    use ndarray::Array1;

    fn record(len: usize) -> TimeSeriesRecord {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeriesRecord::from_target(start, Frequency::daily(), (0..len).map(|v| v as f64).collect())
    }

    #[test]
    fn test_chain_applies_in_order() {
        let chain = TransformChain::builder()
            .add(AddObservedValueIndicator::new())
            .add(RemoveFields::new(vec![FieldName::Target]))
            .build(&[FieldName::Target])
            .unwrap();

        let out = chain.apply(record(5)).unwrap();
        assert!(out.contains(&FieldName::ObservedValues));
        assert!(!out.contains(&FieldName::Target));
    }

    #[test]
    fn test_static_check_rejects_removed_field() {
        let err = TransformChain::builder()
            .add(RemoveFields::new(vec![FieldName::Target]))
            .add(AddObservedValueIndicator::new())
            .build(&[FieldName::Target])
            .unwrap_err();

        assert_eq!(
            err,
            KolosalError::missing("AddObservedValueIndicator", FieldName::Target)
        );
    }

    #[test]
    fn test_static_check_rejects_unproduced_field() {
        let err = TransformChain::builder()
            .add(VstackFeatures::new(
                vec![FieldName::FeatTime, FieldName::FeatDynamicAge],
                FieldName::FeatDynamic,
            ))
            .build(&[FieldName::Target])
            .unwrap_err();

        assert!(matches!(
            err,
            KolosalError::MissingFieldError { field: FieldName::FeatTime, .. }
        ));
    }

    #[test]
    fn test_instances_without_split_is_config_error() {
        let chain = TransformChain::builder().build(&[]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = chain.instances(record(3), &mut rng).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidConfigurationError(_)));
    }

    #[test]
    fn test_instances_batch_is_reproducible() {
        let split = InstanceSplit::new(InstanceSampler::uniform(3), 4, 2)
            .unwrap()
            .with_time_series_fields(vec![FieldName::ObservedValues]);
        let chain = TransformChain::builder()
            .add(AddObservedValueIndicator::new())
            .split(split)
            .build(&[FieldName::Target])
            .unwrap();

        let records: Vec<_> = (10..20).map(record).collect();
        let first = chain.instances_batch(records.clone(), 7).unwrap();
        let second = chain.instances_batch(records, 7).unwrap();

        assert_eq!(first.len(), 30);
        let splits = |v: &[Instance]| v.iter().map(|i| i.split_index).collect::<Vec<_>>();
        assert_eq!(splits(&first), splits(&second));
    }

    #[test]
    fn test_apply_batch_propagates_error() {
        let chain = TransformChain::builder()
            .add(AddObservedValueIndicator::new())
            .build(&[FieldName::Target])
            .unwrap();

        let start = record(1).start();
        let mut records = vec![record(4), record(5)];
        records.push(
            TimeSeriesRecord::new(start, Frequency::daily())
                .with_field(FieldName::FeatDynamicReal, Array1::zeros(3).into_dyn()),
        );

        let err = chain.apply_batch(records).unwrap_err();
        assert!(matches!(err, KolosalError::MissingFieldError { .. }));
    }
}
