//! Field vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a field stored in a [`TimeSeriesRecord`](super::TimeSeriesRecord)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    /// Observed values of the series
    Target,
    /// Static categorical features
    FeatStaticCat,
    /// Static real-valued features
    FeatStaticReal,
    /// Time-indexed real-valued covariates
    FeatDynamicReal,
    /// Time-indexed categorical covariates
    FeatDynamicCat,
    /// Log-scaled elapsed time since the first observation
    FeatDynamicAge,
    /// Calendar-derived features
    #[serde(rename = "time_feat")]
    FeatTime,
    /// 1.0 where the target was observed, 0.0 where it is missing
    ObservedValues,
    /// Stacked dynamic features
    FeatDynamic,
    /// Padding indicator
    IsPad,
    /// Caller-defined field
    Custom(String),
}

impl FieldName {
    /// Whether the field is indexed by time (time on the last axis)
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            FieldName::Target
                | FieldName::FeatDynamicReal
                | FieldName::FeatDynamicCat
                | FieldName::FeatDynamicAge
                | FieldName::FeatTime
                | FieldName::ObservedValues
                | FieldName::FeatDynamic
                | FieldName::IsPad
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldName::Target => "target",
            FieldName::FeatStaticCat => "feat_static_cat",
            FieldName::FeatStaticReal => "feat_static_real",
            FieldName::FeatDynamicReal => "feat_dynamic_real",
            FieldName::FeatDynamicCat => "feat_dynamic_cat",
            FieldName::FeatDynamicAge => "feat_dynamic_age",
            FieldName::FeatTime => "time_feat",
            FieldName::ObservedValues => "observed_values",
            FieldName::FeatDynamic => "feat_dynamic",
            FieldName::IsPad => "is_pad",
            FieldName::Custom(name) => name,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        match name {
            "target" => FieldName::Target,
            "feat_static_cat" => FieldName::FeatStaticCat,
            "feat_static_real" => FieldName::FeatStaticReal,
            "feat_dynamic_real" => FieldName::FeatDynamicReal,
            "feat_dynamic_cat" => FieldName::FeatDynamicCat,
            "feat_dynamic_age" => FieldName::FeatDynamicAge,
            "time_feat" => FieldName::FeatTime,
            "observed_values" => FieldName::ObservedValues,
            "feat_dynamic" => FieldName::FeatDynamic,
            "is_pad" => FieldName::IsPad,
            other => FieldName::Custom(other.to_string()),
        }
    }
}
