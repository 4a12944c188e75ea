//! School-year and fiscal-year calendar conventions
//!
//! A school year runs September to August and is identified by the calendar year it
//! starts in. A fiscal year Y runs January to December of Y, so it overlaps the last
//! eight months of school year `(Y-1)/Y` and the first four months of `Y/(Y+1)`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Calendar month (1-12) in which a school year starts
pub const SCHOOL_YEAR_START_MONTH: u32 = 9;

/// Months of fiscal year Y that fall in school year `(Y-1)/Y`
pub const PRIOR_SCHOOL_YEAR_MONTHS: u32 = 8;

/// Months of fiscal year Y that fall in school year `Y/(Y+1)`
pub const CURRENT_SCHOOL_YEAR_MONTHS: u32 = 4;

/// Academic year identified by its starting calendar year, displayed as `"2025/2026"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchoolYear(i32);

impl SchoolYear {
    pub const fn new(start_year: i32) -> Self {
        Self(start_year)
    }

    pub fn start_year(&self) -> i32 {
        self.0
    }

    pub fn end_year(&self) -> i32 {
        self.0 + 1
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn previous(&self) -> Self {
        Self(self.0 - 1)
    }

    /// Offset by a signed number of years
    pub fn offset(&self, years: i32) -> Self {
        Self(self.0 + years)
    }

    /// School year in session on the given date
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= SCHOOL_YEAR_START_MONTH {
            Self(date.year())
        } else {
            Self(date.year() - 1)
        }
    }

    /// The two school years overlapped by a fiscal year: `((Y-1)/Y, Y/(Y+1))`
    pub fn pair_for_fiscal_year(fiscal_year: i32) -> (Self, Self) {
        (Self(fiscal_year - 1), Self(fiscal_year))
    }
}

impl fmt::Display for SchoolYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, self.end_year())
    }
}

/// Error returned when a school-year label cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid school year '{0}' (expected e.g. 2025/2026)")]
pub struct ParseSchoolYearError(String);

impl FromStr for SchoolYear {
    type Err = ParseSchoolYearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSchoolYearError(s.to_string());
        let trimmed = s.trim();
        let (start, end) = trimmed
            .split_once('/')
            .or_else(|| trimmed.split_once('-'))
            .ok_or_else(err)?;
        let start: i32 = start.trim().parse().map_err(|_| err())?;
        let end: i32 = end.trim().parse().map_err(|_| err())?;
        if start.checked_add(1) != Some(end) {
            return Err(err());
        }
        Ok(Self(start))
    }
}

impl Serialize for SchoolYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchoolYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
