use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CapGainsError;

/// Calendar month on which a new fiscal year starts.
pub const FISCAL_YEAR_START_MONTH: u32 = 4;
/// Day of [`FISCAL_YEAR_START_MONTH`] on which a new fiscal year starts.
pub const FISCAL_YEAR_START_DAY: u32 = 1;

/// A fiscal year identified by the calendar year it starts in.
///
/// Displays and serializes as the statutory label, e.g. `"2024-25"` for the
/// year running 1 April 2024 to 31 March 2025.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalYear(i32);

impl FiscalYear {
    pub const fn starting(year: i32) -> Self {
        FiscalYear(year)
    }

    pub fn start_year(&self) -> i32 {
        self.0
    }

    /// Fiscal year containing `date`.
    pub fn for_date(date: NaiveDate) -> Self {
        let on_or_after_cutover = (date.month(), date.day())
            >= (FISCAL_YEAR_START_MONTH, FISCAL_YEAR_START_DAY);
        if on_or_after_cutover {
            FiscalYear(date.year())
        } else {
            FiscalYear(date.year() - 1)
        }
    }

    /// First day of the fiscal year.
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, FISCAL_YEAR_START_MONTH, FISCAL_YEAR_START_DAY)
    }

    pub fn next(&self) -> Self {
        FiscalYear(self.0 + 1)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

/// Fiscal year label for a calendar date.
pub fn fiscal_year_for_date(date: NaiveDate) -> FiscalYear {
    FiscalYear::for_date(date)
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.0, (self.0 + 1).rem_euclid(100))
    }
}

impl FromStr for FiscalYear {
    type Err = CapGainsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CapGainsError::InvalidFiscalYear(s.to_string());

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start: i32 = start.parse().map_err(|_| invalid())?;
        let end: i32 = end.parse().map_err(|_| invalid())?;

        // Accept both "2024-25" and "2024-2025".
        let expected_end = start + 1;
        if end == expected_end.rem_euclid(100) || end == expected_end {
            Ok(FiscalYear(start))
        } else {
            Err(invalid())
        }
    }
}

impl Serialize for FiscalYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FiscalYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
