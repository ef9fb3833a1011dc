//! Calendar-derived time features

use super::frequency::{Frequency, FrequencyUnit};
use chrono::{Datelike, NaiveDateTime, Timelike};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A calendar cycle encoded into `[-0.5, 0.5]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFeature {
    SecondOfMinute,
    MinuteOfHour,
    HourOfDay,
    DayOfWeek,
    DayOfMonth,
    DayOfYear,
    WeekOfYear,
    MonthOfYear,
}

impl TimeFeature {
    /// Position of `ts` within the cycle, shifted to `[-0.5, 0.5]`
    pub fn encode(&self, ts: &NaiveDateTime) -> f64 {
        match self {
            TimeFeature::SecondOfMinute => ts.second() as f64 / 59.0 - 0.5,
            TimeFeature::MinuteOfHour => ts.minute() as f64 / 59.0 - 0.5,
            TimeFeature::HourOfDay => ts.hour() as f64 / 23.0 - 0.5,
            TimeFeature::DayOfWeek => ts.weekday().num_days_from_monday() as f64 / 6.0 - 0.5,
            TimeFeature::DayOfMonth => (ts.day() - 1) as f64 / 30.0 - 0.5,
            TimeFeature::DayOfYear => (ts.ordinal() - 1) as f64 / 365.0 - 0.5,
            TimeFeature::WeekOfYear => (ts.iso_week().week() - 1) as f64 / 52.0 - 0.5,
            TimeFeature::MonthOfYear => (ts.month() - 1) as f64 / 11.0 - 0.5,
        }
    }
}

/// Time feature channels meaningful at `freq`
///
/// Finer cycles are dropped as the frequency coarsens: yearly data has no
/// calendar channel, monthly data only month-of-year.
pub fn time_features_for_frequency(freq: &Frequency) -> Vec<TimeFeature> {
    use TimeFeature::*;

    let daily = [DayOfWeek, DayOfMonth, DayOfYear];
    match freq.unit() {
        FrequencyUnit::Year => vec![],
        FrequencyUnit::Quarter | FrequencyUnit::Month => vec![MonthOfYear],
        FrequencyUnit::Week => vec![DayOfMonth, WeekOfYear],
        FrequencyUnit::Day | FrequencyUnit::BusinessDay => daily.to_vec(),
        FrequencyUnit::Hour => [HourOfDay].into_iter().chain(daily).collect(),
        FrequencyUnit::Minute => [MinuteOfHour, HourOfDay].into_iter().chain(daily).collect(),
        FrequencyUnit::Second => [SecondOfMinute, MinuteOfHour, HourOfDay]
            .into_iter()
            .chain(daily)
            .collect(),
    }
}

/// Evaluate `features` over `timestamps`, shape `[features.len(), timestamps.len()]`
pub fn time_features(timestamps: &[NaiveDateTime], features: &[TimeFeature]) -> Array2<f64> {
    Array2::from_shape_fn((features.len(), timestamps.len()), |(c, t)| {
        features[c].encode(&timestamps[t])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_channels_per_frequency() {
        let monthly = time_features_for_frequency(&Frequency::monthly());
        assert_eq!(monthly, vec![TimeFeature::MonthOfYear]);

        let hourly = time_features_for_frequency(&Frequency::hourly());
        assert_eq!(hourly.len(), 4);

        let yearly = time_features_for_frequency(&"A".parse().unwrap());
        assert!(yearly.is_empty());
    }

    #[test]
    fn test_encoding_range() {
        assert_abs_diff_eq!(TimeFeature::MonthOfYear.encode(&ts(1949, 1, 1, 0)), -0.5);
        assert_abs_diff_eq!(TimeFeature::MonthOfYear.encode(&ts(1949, 12, 1, 0)), 0.5);
        assert_abs_diff_eq!(TimeFeature::HourOfDay.encode(&ts(2020, 5, 5, 23)), 0.5);
        // 2024-01-01 is a Monday
        assert_abs_diff_eq!(TimeFeature::DayOfWeek.encode(&ts(2024, 1, 1, 0)), -0.5);
    }

    #[test]
    fn test_feature_matrix_shape() {
        let freq = Frequency::daily();
        let stamps = freq.range(ts(2024, 1, 1, 0), 10).unwrap();
        let features = time_features_for_frequency(&freq);
        let matrix = time_features(&stamps, &features);

        assert_eq!(matrix.dim(), (3, 10));
        assert!(matrix.iter().all(|v| (-0.5..=0.5).contains(v)));
    }
}
