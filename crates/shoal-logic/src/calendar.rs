//! Month-day dates and their day offsets from an anchor.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A calendar day without a year, written `MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, ConfigError> {
        // 2000 is a leap year, so 02-29 is accepted here and rejected later
        // only if it falls in a non-leap year.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(ConfigError::InvalidDate(format!("{month:02}-{day:02}")));
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// This month-day in a given year.
    pub fn in_year(&self, year: i32) -> Result<NaiveDate, ConfigError> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .ok_or_else(|| ConfigError::InvalidDate(format!("{year}-{self}")))
    }

    /// Days from `anchor` to the next occurrence of this month-day on or
    /// after it. A month-day earlier in the year than the anchor rolls into
    /// the following year.
    pub fn offset_from(&self, anchor: NaiveDate) -> Result<u32, ConfigError> {
        let mut date = self.in_year(anchor.year())?;
        if date < anchor {
            date = self.in_year(anchor.year() + 1)?;
        }
        Ok((date - anchor).num_days() as u32)
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidDate(s.to_string());
        let (month, day) = s.trim().split_once('-').ok_or_else(invalid)?;
        let month = month.parse().map_err(|_| invalid())?;
        let day = day.parse().map_err(|_| invalid())?;
        Self::new(month, day)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthDay> for String {
    fn from(value: MonthDay) -> Self {
        value.to_string()
    }
}
