//! Run identity: one published cycle of upstream model output.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four synoptic hours eligible for run discovery.
pub const ELIGIBLE_HOURS: [u8; 4] = [0, 6, 12, 18];

/// Errors from parsing a run identifier.
#[derive(Debug, Error)]
pub enum RunIdError {
    /// Input was not `YYYYMMDDHH`.
    #[error("malformed run id '{0}': expected YYYYMMDDHH")]
    Malformed(String),

    /// The date portion did not name a calendar date.
    #[error("invalid date in run id '{0}'")]
    InvalidDate(String),

    /// The hour portion was outside 0..=23.
    #[error("invalid hour {hour} in run id '{raw}'")]
    InvalidHour { raw: String, hour: u8 },
}

/// Identifies one published model run: a calendar date plus a cycle hour.
///
/// The canonical string form is `YYYYMMDDHH`. Ordering is chronological:
/// later date wins, then later hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId {
    date: NaiveDate,
    hour: u8,
}

impl RunId {
    /// Create a run id from a date and an hour (0..=23).
    pub fn new(date: NaiveDate, hour: u8) -> Option<Self> {
        (hour < 24).then_some(Self { date, hour })
    }

    /// The run's calendar date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The run's cycle hour.
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Whether the hour is one of the four eligible synoptic hours.
    pub fn is_eligible(&self) -> bool {
        ELIGIBLE_HOURS.contains(&self.hour)
    }

    /// Date portion as `YYYYMMDD`.
    pub fn date_str(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Hour portion as zero-padded `HH`.
    pub fn hour_str(&self) -> String {
        format!("{:02}", self.hour)
    }

    /// Parse the `YYYYMMDD` + `HH` pieces separately (how they appear in
    /// upstream directory listings).
    pub fn from_parts(date: &str, hour: &str) -> Result<Self, RunIdError> {
        Self::from_str(&format!("{date}{hour}"))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.date.format("%Y%m%d"), self.hour)
    }
}

impl FromStr for RunId {
    type Err = RunIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RunIdError::Malformed(s.to_string()));
        }
        let date = NaiveDate::parse_from_str(&s[..8], "%Y%m%d")
            .map_err(|_| RunIdError::InvalidDate(s.to_string()))?;
        let hour: u8 = s[8..].parse().map_err(|_| RunIdError::Malformed(s.to_string()))?;
        if hour >= 24 {
            return Err(RunIdError::InvalidHour {
                raw: s.to_string(),
                hour,
            });
        }
        Ok(Self { date, hour })
    }
}
