//! Feature generators
//!
//! Pure functions deriving model features from a calendar frequency:
//! - Frequency parsing and calendar stepping
//! - Frequency-aware lag offsets
//! - Cyclical calendar features normalised to `[-0.5, 0.5]`
//! - Log-scaled age feature

mod age;
mod frequency;
mod lag;
mod time_feature;

pub use age::{age_feature, linear_age_feature};
pub use frequency::{Frequency, FrequencyUnit};
pub use lag::{lags_for_frequency, DEFAULT_LAG_UB};
pub use time_feature::{time_features, time_features_for_frequency, TimeFeature};
