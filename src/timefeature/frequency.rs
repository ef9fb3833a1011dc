//! Calendar frequency descriptor

use crate::error::{KolosalError, Result};
use chrono::{Datelike, Duration, Months, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base calendar unit of a frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Second,
    Minute,
    Hour,
    Day,
    BusinessDay,
    Week,
    Month,
    Quarter,
    Year,
}

impl FrequencyUnit {
    fn code(self) -> &'static str {
        match self {
            FrequencyUnit::Second => "S",
            FrequencyUnit::Minute => "min",
            FrequencyUnit::Hour => "H",
            FrequencyUnit::Day => "D",
            FrequencyUnit::BusinessDay => "B",
            FrequencyUnit::Week => "W",
            FrequencyUnit::Month => "M",
            FrequencyUnit::Quarter => "Q",
            FrequencyUnit::Year => "A",
        }
    }
}

/// Calendar step between consecutive observations, e.g. `"M"`, `"15min"`, `"W-SUN"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    multiple: u32,
    unit: FrequencyUnit,
    /// Anchor day for weekly frequencies
    anchor: Option<Weekday>,
}

impl Frequency {
    /// Create a frequency of `multiple` units
    pub fn new(multiple: u32, unit: FrequencyUnit) -> Result<Self> {
        if multiple == 0 {
            return Err(KolosalError::config("frequency multiple must be >= 1"));
        }
        Ok(Self {
            multiple,
            unit,
            anchor: None,
        })
    }

    pub fn monthly() -> Self {
        Self {
            multiple: 1,
            unit: FrequencyUnit::Month,
            anchor: None,
        }
    }

    pub fn daily() -> Self {
        Self {
            multiple: 1,
            unit: FrequencyUnit::Day,
            anchor: None,
        }
    }

    pub fn hourly() -> Self {
        Self {
            multiple: 1,
            unit: FrequencyUnit::Hour,
            anchor: None,
        }
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    pub fn anchor(&self) -> Option<Weekday> {
        self.anchor
    }

    /// Advance `ts` by `steps` periods of this frequency
    ///
    /// Anchored weekly frequencies (`"W-SUN"`) first roll `ts` forward to the
    /// anchor day, so every step lands on it.
    pub fn step(&self, ts: NaiveDateTime, steps: usize) -> Result<NaiveDateTime> {
        let overflow = || {
            KolosalError::config(format!(
                "timestamp overflow advancing {} by {} periods of {}",
                ts, steps, self
            ))
        };
        let n = (steps as i64)
            .checked_mul(self.multiple as i64)
            .ok_or_else(overflow)?;

        let fixed = |unit_seconds: i64| -> Result<NaiveDateTime> {
            let secs = n.checked_mul(unit_seconds).ok_or_else(overflow)?;
            ts.checked_add_signed(Duration::seconds(secs))
                .ok_or_else(overflow)
        };
        let months = |per_step: i64| -> Result<NaiveDateTime> {
            let total = u32::try_from(n * per_step).map_err(|_| overflow())?;
            let date = ts
                .date()
                .checked_add_months(Months::new(total))
                .ok_or_else(overflow)?;
            Ok(date.and_time(ts.time()))
        };

        match self.unit {
            FrequencyUnit::Second => fixed(1),
            FrequencyUnit::Minute => fixed(60),
            FrequencyUnit::Hour => fixed(3_600),
            FrequencyUnit::Day => fixed(86_400),
            FrequencyUnit::Week => {
                let secs = n.checked_mul(7 * 86_400).ok_or_else(overflow)?;
                self.anchored(ts)
                    .and_then(|base| base.checked_add_signed(Duration::seconds(secs)))
                    .ok_or_else(overflow)
            }
            FrequencyUnit::BusinessDay => add_business_days(ts, n).ok_or_else(overflow),
            FrequencyUnit::Month => months(1),
            FrequencyUnit::Quarter => months(3),
            FrequencyUnit::Year => months(12),
        }
    }

    /// `ts` rolled forward to the weekly anchor day, unchanged without an anchor
    fn anchored(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.anchor {
            Some(day) => {
                let ahead = (7 + day.num_days_from_monday() - ts.weekday().num_days_from_monday()) % 7;
                ts.checked_add_signed(Duration::days(i64::from(ahead)))
            }
            None => Some(ts),
        }
    }

    /// Timestamps `start, start + 1 step, ..., start + (length - 1) steps`
    pub fn range(&self, start: NaiveDateTime, length: usize) -> Result<Vec<NaiveDateTime>> {
        (0..length).map(|i| self.step(start, i)).collect()
    }
}

fn is_weekend(ts: &NaiveDateTime) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

fn add_business_days(ts: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
    let mut current = ts;
    while is_weekend(&current) {
        current = current.checked_add_signed(Duration::days(1))?;
    }
    let weeks = n / 5;
    current = current.checked_add_signed(Duration::days(weeks.checked_mul(7)?))?;
    for _ in 0..(n % 5) {
        current = current.checked_add_signed(Duration::days(1))?;
        while is_weekend(&current) {
            current = current.checked_add_signed(Duration::days(1))?;
        }
    }
    Some(current)
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    match code {
        "MON" => Some(Weekday::Mon),
        "TUE" => Some(Weekday::Tue),
        "WED" => Some(Weekday::Wed),
        "THU" => Some(Weekday::Thu),
        "FRI" => Some(Weekday::Fri),
        "SAT" => Some(Weekday::Sat),
        "SUN" => Some(Weekday::Sun),
        _ => None,
    }
}

impl FromStr for Frequency {
    type Err = KolosalError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| KolosalError::config(format!("frequency '{}' has no unit", s)))?;
        let multiple = if digits_end == 0 {
            1
        } else {
            trimmed[..digits_end]
                .parse::<u32>()
                .map_err(|e| KolosalError::config(format!("frequency '{}': {}", s, e)))?
        };

        let (code, suffix) = match trimmed[digits_end..].split_once('-') {
            Some((code, suffix)) => (code, Some(suffix)),
            None => (&trimmed[digits_end..], None),
        };

        let unit = match code {
            "S" | "s" => FrequencyUnit::Second,
            "T" | "min" => FrequencyUnit::Minute,
            "H" | "h" => FrequencyUnit::Hour,
            "D" => FrequencyUnit::Day,
            "B" => FrequencyUnit::BusinessDay,
            "W" => FrequencyUnit::Week,
            "M" | "MS" | "ME" => FrequencyUnit::Month,
            "Q" | "QS" | "QE" => FrequencyUnit::Quarter,
            "A" | "AS" | "Y" | "YS" | "YE" => FrequencyUnit::Year,
            other => {
                return Err(KolosalError::config(format!(
                    "unsupported frequency unit '{}' in '{}'",
                    other, s
                )))
            }
        };

        let anchor = match (unit, suffix) {
            (FrequencyUnit::Week, Some(day)) => Some(parse_weekday(day).ok_or_else(|| {
                KolosalError::config(format!("unknown weekly anchor '{}' in '{}'", day, s))
            })?),
            _ => None,
        };

        let mut freq = Frequency::new(multiple, unit)?;
        freq.anchor = anchor;
        Ok(freq)
    }
}

impl TryFrom<String> for Frequency {
    type Error = KolosalError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiple != 1 {
            write!(f, "{}", self.multiple)?;
        }
        f.write_str(self.unit.code())?;
        if let Some(day) = self.anchor {
            let code = match day {
                Weekday::Mon => "MON",
                Weekday::Tue => "TUE",
                Weekday::Wed => "WED",
                Weekday::Thu => "THU",
                Weekday::Fri => "FRI",
                Weekday::Sat => "SAT",
                Weekday::Sun => "SUN",
            };
            write!(f, "-{}", code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse() {
        let freq: Frequency = "15min".parse().unwrap();
        assert_eq!(freq.multiple(), 15);
        assert_eq!(freq.unit(), FrequencyUnit::Minute);

        let weekly: Frequency = "W-SUN".parse().unwrap();
        assert_eq!(weekly.unit(), FrequencyUnit::Week);
        assert_eq!(weekly.anchor(), Some(Weekday::Sun));
        assert_eq!(weekly.to_string(), "W-SUN");

        assert!("".parse::<Frequency>().is_err());
        assert!("12".parse::<Frequency>().is_err());
        assert!("X".parse::<Frequency>().is_err());
        assert!("0D".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_month_step_clamps_to_month_end() {
        let freq = Frequency::monthly();
        assert_eq!(freq.step(ts(1949, 1, 31), 1).unwrap(), ts(1949, 2, 28));
        assert_eq!(freq.step(ts(1949, 1, 1), 12).unwrap(), ts(1950, 1, 1));
    }

    #[test]
    fn test_weekly_anchor_aligns_steps() {
        // 2024-01-03 is a Wednesday
        let anchored: Frequency = "W-SUN".parse().unwrap();
        assert_eq!(anchored.step(ts(2024, 1, 3), 0).unwrap(), ts(2024, 1, 7));
        assert_eq!(anchored.step(ts(2024, 1, 3), 2).unwrap(), ts(2024, 1, 21));
        assert_eq!(anchored.step(ts(2024, 1, 7), 1).unwrap(), ts(2024, 1, 14));

        let plain: Frequency = "W".parse().unwrap();
        assert_eq!(plain.step(ts(2024, 1, 3), 1).unwrap(), ts(2024, 1, 10));
    }

    #[test]
    fn test_business_day_skips_weekend() {
        let freq: Frequency = "B".parse().unwrap();
        // 2024-01-05 is a Friday
        assert_eq!(freq.step(ts(2024, 1, 5), 1).unwrap(), ts(2024, 1, 8));
        assert_eq!(freq.step(ts(2024, 1, 5), 5).unwrap(), ts(2024, 1, 12));
    }

    #[test]
    fn test_serde_as_string() {
        let freq: Frequency = serde_json::from_str("\"3H\"").unwrap();
        assert_eq!(freq.multiple(), 3);
        assert_eq!(serde_json::to_string(&freq).unwrap(), "\"3H\"");
    }
}
