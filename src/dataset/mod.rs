//! Time series data model
//!
//! Provides the keyed field store passed through a transform chain:
//! - [`FieldName`] - the fixed field vocabulary
//! - [`TimeSeriesRecord`] - one series with its start timestamp and frequency

mod field;
mod record;

pub use field::FieldName;
pub use record::{time_length, TimeSeriesRecord};
