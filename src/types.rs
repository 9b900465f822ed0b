//! Core identifier types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Number of decimal digits in a person identifier.
pub const ID_DIGITS: usize = 9;

/// Error returned when parsing a [`PersonId`] from text.
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
#[snafu(display("invalid person id {input:?}: expected exactly {ID_DIGITS} decimal digits"))]
pub struct InvalidPersonId {
    pub input: String,
}

/// Fixed-width nine-digit identifier uniquely naming a person.
///
/// Identifiers are never reused. The width is fixed: a value with fewer
/// digits (including anything that would need a leading zero) is not a
/// valid barcode and is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(u32);

/// Smallest value with exactly nine decimal digits.
const MIN_NINE_DIGIT: u32 = 100_000_000;

impl PersonId {
    /// Parse an identifier from scanned input.
    pub fn parse(input: &str) -> Result<Self, InvalidPersonId> {
        let trimmed = input.trim();
        if trimmed.len() != ID_DIGITS || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return InvalidPersonIdSnafu { input: trimmed }.fail();
        }
        let value: u32 = trimmed.parse().map_err(|_| InvalidPersonId {
            input: trimmed.to_string(),
        })?;
        if value < MIN_NINE_DIGIT {
            return InvalidPersonIdSnafu { input: trimmed }.fail();
        }
        Ok(Self(value))
    }

    /// The raw numeric value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonId {
    type Err = InvalidPersonId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_id() {
        let id = PersonId::parse("123456789").unwrap();
        assert_eq!(id.value(), 123_456_789);
        assert_eq!(id.to_string(), "123456789");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = PersonId::parse("  987654321\n").unwrap();
        assert_eq!(id.value(), 987_654_321);
    }

    #[test]
    fn test_parse_rejects_wrong_width() {
        assert!(PersonId::parse("12345678").is_err());
        assert!(PersonId::parse("1234567890").is_err());
        assert!(PersonId::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_leading_zero() {
        // "012345678" would collapse to eight digits; not a valid barcode.
        assert!(PersonId::parse("012345678").is_err());
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert!(PersonId::parse("12345678a").is_err());
        assert!(PersonId::parse("+23456789").is_err());
        assert!(PersonId::parse("back").is_err());
    }
}
