//! Stacking instances into fixed-shape batches

use crate::dataset::FieldName;
use crate::error::{KolosalError, Result};
use crate::timefeature::Frequency;
use crate::transform::Instance;
use chrono::NaiveDateTime;
use ndarray::{stack, Array2, ArrayD, Axis};
use std::collections::BTreeMap;

/// Instances stacked along a new leading batch axis
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub freq: Frequency,
    pub item_ids: Vec<Option<String>>,
    pub forecast_starts: Vec<NaiveDateTime>,
    pub target_field: FieldName,
    /// `[N, ..., context_length]` per field
    pub past: BTreeMap<FieldName, ArrayD<f64>>,
    /// `[N, context_length]`
    pub past_is_pad: Array2<f64>,
    /// `[N, ..., prediction_length]` per field
    pub future: BTreeMap<FieldName, ArrayD<f64>>,
    pub statics: BTreeMap<FieldName, ArrayD<f64>>,
}

impl Batch {
    /// Stack `instances`; they must carry the same fields with the same shapes
    pub fn stack(instances: &[Instance]) -> Result<Self> {
        let first = instances
            .first()
            .ok_or_else(|| KolosalError::ShapeError("cannot stack an empty batch".to_string()))?;

        let pads: Vec<_> = instances.iter().map(|i| i.past_is_pad.view()).collect();
        let past_is_pad = stack(Axis(0), &pads)
            .map_err(|e| KolosalError::shape_mismatch("Batch", FieldName::IsPad, "equal lengths", e))?;

        Ok(Self {
            freq: first.freq,
            item_ids: instances.iter().map(|i| i.item_id.clone()).collect(),
            forecast_starts: instances.iter().map(|i| i.forecast_start).collect(),
            target_field: first.target_field.clone(),
            past: stack_fields(instances, |i| &i.past)?,
            past_is_pad,
            future: stack_fields(instances, |i| &i.future)?,
            statics: stack_fields(instances, |i| &i.statics)?,
        })
    }

    pub fn len(&self) -> usize {
        self.forecast_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecast_starts.is_empty()
    }

    pub fn past_target(&self) -> Option<&ArrayD<f64>> {
        self.past.get(&self.target_field)
    }

    pub fn future_target(&self) -> Option<&ArrayD<f64>> {
        self.future.get(&self.target_field)
    }
}

fn stack_fields<F>(instances: &[Instance], select: F) -> Result<BTreeMap<FieldName, ArrayD<f64>>>
where
    F: Fn(&Instance) -> &BTreeMap<FieldName, ArrayD<f64>>,
{
    let names: Vec<&FieldName> = select(&instances[0]).keys().collect();
    let mut stacked = BTreeMap::new();

    for instance in instances {
        let fields = select(instance);
        if fields.len() != names.len() {
            let extra = fields
                .keys()
                .find(|name| !names.contains(name))
                .or_else(|| names.iter().copied().find(|name| !fields.contains_key(*name)));
            if let Some(name) = extra {
                return Err(KolosalError::missing("Batch", name.clone()));
            }
        }
    }

    for name in names {
        let views = instances
            .iter()
            .map(|instance| {
                select(instance)
                    .get(name)
                    .map(|value| value.view())
                    .ok_or_else(|| KolosalError::missing("Batch", name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let array = stack(Axis(0), &views).map_err(|e| {
            KolosalError::shape_mismatch("Batch", name.clone(), "equal shapes across instances", e)
        })?;
        stacked.insert(name.clone(), array);
    }
    Ok(stacked)
}
