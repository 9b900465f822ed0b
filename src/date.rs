//! Attendance dates and their on-disk naming.
//!
//! An attendance date identifies exactly one event log and one pending
//! queue. Dates map deterministically to a `MM-DD-YYYY` file stem; the
//! inverse parse drives the all-dates reconciliation sweep.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Errors that can occur constructing or parsing an attendance date.
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum DateError {
    /// The (month, day, year) triple names no calendar day.
    #[snafu(display("invalid calendar date {month:02}-{day:02}-{year:04}"))]
    InvalidDate { month: u32, day: u32, year: i32 },

    /// A file stem did not match the `MM-DD-YYYY` shape.
    #[snafu(display("malformed date stem {stem:?}"))]
    MalformedStem { stem: String },
}

/// A calendar (month, day, year) triple identifying one attendance day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceDate {
    month: u32,
    day: u32,
    year: i32,
}

impl AttendanceDate {
    /// Construct an explicitly chosen date (for backfilling past days).
    ///
    /// Rejects triples that name no real calendar day.
    pub fn new(month: u32, day: u32, year: i32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day).context(InvalidDateSnafu { month, day, year })?;
        Ok(Self { month, day, year })
    }

    /// Today's date, from the local clock.
    pub fn today() -> Self {
        let now = Local::now().date_naive();
        Self {
            month: now.month(),
            day: now.day(),
            year: now.year(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The `MM-DD-YYYY` stem shared by this date's store files.
    pub fn file_stem(&self) -> String {
        format!("{:02}-{:02}-{:04}", self.month, self.day, self.year)
    }

    /// Parse a date back out of a `MM-DD-YYYY` file stem.
    pub fn parse_stem(stem: &str) -> Result<Self, DateError> {
        let malformed = || MalformedStemSnafu { stem }.build();
        let mut parts = stem.splitn(3, '-');
        let month: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let day: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let year: i32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        Self::new(month, day, year)
    }
}

impl std::str::FromStr for AttendanceDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_stem(s)
    }
}

impl fmt::Display for AttendanceDate {
    /// Renders as e.g. "March 01, 2024" for operator notices.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NaiveDate::from_ymd_opt(self.year, self.month, self.day) {
            Some(date) => write!(f, "{}", date.format("%B %d, %Y")),
            None => write!(f, "{}", self.file_stem()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let date = AttendanceDate::new(3, 1, 2024).unwrap();
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 1);
        assert_eq!(date.year(), 2024);
    }

    #[test]
    fn test_new_rejects_impossible_dates() {
        assert!(AttendanceDate::new(2, 30, 2024).is_err());
        assert!(AttendanceDate::new(13, 1, 2024).is_err());
        assert!(AttendanceDate::new(0, 1, 2024).is_err());
    }

    #[test]
    fn test_leap_day() {
        assert!(AttendanceDate::new(2, 29, 2024).is_ok());
        assert!(AttendanceDate::new(2, 29, 2023).is_err());
    }

    #[test]
    fn test_file_stem_zero_padded() {
        let date = AttendanceDate::new(3, 1, 2024).unwrap();
        assert_eq!(date.file_stem(), "03-01-2024");
    }

    #[test]
    fn test_parse_stem_round_trip() {
        let date = AttendanceDate::new(11, 28, 2023).unwrap();
        assert_eq!(AttendanceDate::parse_stem(&date.file_stem()).unwrap(), date);
    }

    #[test]
    fn test_parse_stem_malformed() {
        assert!(matches!(
            AttendanceDate::parse_stem("notadate"),
            Err(DateError::MalformedStem { .. })
        ));
        assert!(AttendanceDate::parse_stem("03-2024").is_err());
        assert!(AttendanceDate::parse_stem("").is_err());
    }

    #[test]
    fn test_parse_stem_rejects_impossible_date() {
        assert!(matches!(
            AttendanceDate::parse_stem("02-30-2024"),
            Err(DateError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_display_long_form() {
        let date = AttendanceDate::new(3, 1, 2024).unwrap();
        assert_eq!(date.to_string(), "March 01, 2024");
    }
}
