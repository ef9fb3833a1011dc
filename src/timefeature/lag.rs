//! Frequency-aware lag generation

use super::frequency::{Frequency, FrequencyUnit};
use std::collections::BTreeSet;

/// Default upper bound on generated lags
pub const DEFAULT_LAG_UB: usize = 1200;

/// Lags always included (subject to the upper bound)
const DENSE_LAGS: std::ops::RangeInclusive<usize> = 1..=7;

/// Integer neighbourhood `[middle - delta, middle + delta]`
fn neighbourhood(middle: f64, delta: f64) -> Vec<f64> {
    let mut lags = Vec::new();
    let mut lag = middle - delta;
    while lag < middle + delta + 1.0 {
        lags.push(lag);
        lag += 1.0;
    }
    lags
}

fn cycles(cycle: f64, multiple: f64, num_cycles: usize, delta: f64) -> Vec<Vec<f64>> {
    (1..=num_cycles)
        .map(|k| neighbourhood((k as f64 * cycle / multiple).floor(), delta))
        .collect()
}

fn second_lags(multiple: f64) -> Vec<Vec<f64>> {
    cycles(60.0, multiple, 3, 2.0)
}

fn minute_lags(multiple: f64) -> Vec<Vec<f64>> {
    cycles(60.0, multiple, 3, 2.0)
}

fn hour_lags(multiple: f64) -> Vec<Vec<f64>> {
    cycles(24.0, multiple, 7, 1.0)
}

fn day_lags(multiple: f64, days_in_week: f64, days_in_month: f64) -> Vec<Vec<f64>> {
    let mut lags = cycles(days_in_week, multiple, 4, 1.0);
    lags.push(neighbourhood((days_in_month / multiple).floor(), 1.0));
    lags
}

fn week_lags(multiple: f64) -> Vec<Vec<f64>> {
    let mut lags = cycles(52.0, multiple, 3, 1.0);
    lags.push(vec![
        (4.0 / multiple).floor(),
        (8.0 / multiple).floor(),
        (12.0 / multiple).floor(),
    ]);
    lags
}

fn month_lags(multiple: f64) -> Vec<Vec<f64>> {
    cycles(12.0, multiple, 3, 1.0)
}

/// Lag offsets considered informative for `freq`
///
/// Returns the dense range `1..=7` followed by lags aligned to the calendar
/// cycles visible at this frequency (k-th hour/day/week/month boundary and its
/// immediate neighbours). The output is strictly increasing and bounded by
/// `lag_ub`; `num_lags` truncates it.
pub fn lags_for_frequency(freq: &Frequency, lag_ub: usize, num_lags: Option<usize>) -> Vec<usize> {
    let m = freq.multiple() as f64;

    let candidates: Vec<Vec<f64>> = match freq.unit() {
        FrequencyUnit::Year => Vec::new(),
        FrequencyUnit::Quarter => month_lags(m * 3.0),
        FrequencyUnit::Month => month_lags(m),
        FrequencyUnit::Week => week_lags(m),
        FrequencyUnit::Day => {
            let mut lags = day_lags(m, 7.0, 30.0);
            lags.extend(week_lags(m / 7.0));
            lags
        }
        FrequencyUnit::BusinessDay => {
            let mut lags = day_lags(m, 5.0, 22.0);
            lags.extend(week_lags(m / 5.0));
            lags
        }
        FrequencyUnit::Hour => {
            let mut lags = hour_lags(m);
            lags.extend(day_lags(m / 24.0, 7.0, 30.0));
            lags.extend(week_lags(m / (24.0 * 7.0)));
            lags
        }
        FrequencyUnit::Minute => {
            let mut lags = minute_lags(m);
            lags.extend(hour_lags(m / 60.0));
            lags.extend(day_lags(m / (60.0 * 24.0), 7.0, 30.0));
            lags.extend(week_lags(m / (60.0 * 24.0 * 7.0)));
            lags
        }
        FrequencyUnit::Second => {
            let mut lags = second_lags(m);
            lags.extend(minute_lags(m / 60.0));
            lags.extend(hour_lags(m / 3_600.0));
            lags.extend(day_lags(m / 86_400.0, 7.0, 30.0));
            lags.extend(week_lags(m / 604_800.0));
            lags
        }
    };

    let dense_end = *DENSE_LAGS.end();
    let seasonal: BTreeSet<usize> = candidates
        .into_iter()
        .flatten()
        .filter(|lag| lag.is_finite() && *lag >= 0.0)
        .map(|lag| lag as usize)
        .filter(|&lag| lag > dense_end && lag <= lag_ub)
        .collect();

    let lags = DENSE_LAGS
        .filter(|&lag| lag <= lag_ub)
        .chain(seasonal)
        .take(num_lags.unwrap_or(usize::MAX));
    lags.collect()
}
