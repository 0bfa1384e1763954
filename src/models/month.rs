//! Month identity used to key the budget
//!
//! `MonthCode` stores a zero-indexed month (0 = January, 11 = December).
//! Its canonical key is the four-digit year followed by the two-digit
//! calendar month number, so January 2024 is `"202401"`. Keys sort
//! chronologically as plain strings.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 9999;

/// A (year, zero-indexed month) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthCode {
    year: i32,
    month: u32,
}

impl MonthCode {
    /// Create a month code, rejecting out-of-range parts
    pub fn new(year: i32, month: u32) -> LedgerResult<Self> {
        let code = Self { year, month };
        if code.is_valid() {
            Ok(code)
        } else {
            Err(LedgerError::InvalidShape(format!(
                "month code out of range: year {}, month {}",
                year, month
            )))
        }
    }

    /// The month a date falls in
    ///
    /// Dates outside the supported year range have no month code.
    pub fn from_date(date: NaiveDate) -> LedgerResult<Self> {
        Self::new(date.year(), date.month0())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Zero-indexed month (0 = January)
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Canonical storage key, e.g. `"202403"` for March 2024
    pub fn to_key(&self) -> String {
        format!("{:04}{:02}", self.year, self.month + 1)
    }

    /// Parse a canonical key back into a month code
    pub fn parse_key(key: &str) -> LedgerResult<Self> {
        let invalid = || LedgerError::InvalidShape(format!("invalid month key: {:?}", key));

        if key.len() != 6 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = key[..4].parse().map_err(|_| invalid())?;
        let calendar_month: u32 = key[4..].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&calendar_month) {
            return Err(invalid());
        }
        Self::new(year, calendar_month - 1).map_err(|_| invalid())
    }

    /// The following month; fails past December 9999
    pub fn next(&self) -> LedgerResult<Self> {
        if self.month == 11 {
            Self::new(self.year + 1, 0)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// The preceding month; fails before January 1000
    pub fn prev(&self) -> LedgerResult<Self> {
        if self.month == 0 {
            Self::new(self.year - 1, 11)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    /// Guard against corrupted persisted keys
    pub fn is_valid(&self) -> bool {
        self.month <= 11 && (MIN_YEAR..=MAX_YEAR).contains(&self.year)
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
    }

    /// Check if a date falls within this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date).is_ok_and(|code| code == *self)
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl FromStr for MonthCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s.trim())
    }
}

impl TryFrom<String> for MonthCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_key(&value)
    }
}

impl From<MonthCode> for String {
    fn from(code: MonthCode) -> Self {
        code.to_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_from_date_is_zero_indexed() {
        let code = MonthCode::from_date(date(2024, 1, 15)).unwrap();
        assert_eq!(code.year(), 2024);
        assert_eq!(code.month(), 0);
        assert_eq!(code.to_key(), "202401");

        assert_eq!(MonthCode::from_date(date(2024, 3, 2)).unwrap().to_key(), "202403");
        assert_eq!(MonthCode::from_date(date(2024, 12, 31)).unwrap().month(), 11);
    }

    #[test]
    fn test_key_stable_within_month() {
        let key = |y, m, d| MonthCode::from_date(date(y, m, d)).unwrap().to_key();
        let first = key(2023, 2, 1);
        assert_eq!(first, key(2023, 2, 28));
        assert_ne!(first, key(2023, 3, 1));
        assert_ne!(first, key(2024, 2, 1));
    }

    #[test]
    fn test_from_date_outside_year_range() {
        assert!(MonthCode::from_date(date(999, 12, 31)).is_err());
        assert!(MonthCode::from_date(date(10000, 1, 1)).is_err());
        assert_eq!(MonthCode::from_date(date(9999, 12, 31)).unwrap().to_key(), "999912");
    }

    #[test]
    fn test_year_boundaries() {
        let dec = MonthCode::new(2024, 11).unwrap();
        assert_eq!(dec.next().unwrap(), MonthCode::new(2025, 0).unwrap());

        let jan = MonthCode::new(2025, 0).unwrap();
        assert_eq!(jan.prev().unwrap(), MonthCode::new(2024, 11).unwrap());
    }

    #[test]
    fn test_next_prev_stay_in_range() {
        let last = MonthCode::parse_key("999912").unwrap();
        assert!(last.next().unwrap_err().is_invalid_shape());
        let first = MonthCode::parse_key("100001").unwrap();
        assert!(first.prev().is_err());
    }

    #[test]
    fn test_next_prev_round_trip() {
        for year in [1999, 2024] {
            for month in 0..12 {
                let code = MonthCode::new(year, month).unwrap();
                assert_eq!(code.prev().unwrap().next().unwrap(), code);
                assert_eq!(code.next().unwrap().prev().unwrap(), code);
            }
        }
    }

    #[test]
    fn test_validate() {
        assert!(MonthCode::new(2024, 0).is_ok());
        assert!(MonthCode::new(2024, 12).is_err());
        assert!(MonthCode::new(99, 3).is_err());
        assert!(MonthCode::new(10000, 3).is_err());
    }

    #[test]
    fn test_parse_key() {
        let code = MonthCode::parse_key("202412").unwrap();
        assert_eq!(code, MonthCode::new(2024, 11).unwrap());
        assert_eq!(code.to_key(), "202412");

        for bad in ["202400", "202413", "2024-01", "20241", "abcdef", ""] {
            assert!(MonthCode::parse_key(bad).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_ordering_matches_key_ordering() {
        let a = MonthCode::parse_key("202312").unwrap();
        let b = MonthCode::parse_key("202401").unwrap();
        assert!(a < b);
        assert!(a.to_key() < b.to_key());
    }

    #[test]
    fn test_contains_and_first_day() {
        let code = MonthCode::parse_key("202402").unwrap();
        assert_eq!(code.first_day(), Some(date(2024, 2, 1)));
        assert!(code.contains(date(2024, 2, 29)));
        assert!(!code.contains(date(2024, 3, 1)));
    }

    #[test]
    fn test_serializes_as_key() {
        let code = MonthCode::parse_key("202405").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"202405\"");
        let back: MonthCode = serde_json::from_str("\"202405\"").unwrap();
        assert_eq!(back, code);
        assert!(serde_json::from_str::<MonthCode>("\"202413\"").is_err());
    }
}
