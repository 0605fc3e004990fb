//! Human-readable order numbers: `PZ-YYYYMMDD-NNNN`.
//!
//! The sequence is per calendar day (UTC) and derived by scanning recent
//! order numbers, not by a storage-side counter. Two checkouts racing on the
//! same day can therefore draw the same number.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const PREFIX: &str = "PZ";
const MAX_SEQUENCE: u32 = 9999;

/// Errors from parsing or generating order numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderNumberError {
    /// Not of the form `PZ-YYYYMMDD-NNNN`.
    #[error("malformed order number: {0}")]
    Malformed(String),
    /// Four digits are exhausted for the day.
    #[error("order sequence for {0} is exhausted")]
    SequenceExhausted(NaiveDate),
}

/// A validated order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber {
    date: NaiveDate,
    sequence: u32,
}

impl OrderNumber {
    /// Build from parts.
    ///
    /// # Errors
    ///
    /// Returns `SequenceExhausted` if `sequence` is zero or above 9999.
    pub const fn new(date: NaiveDate, sequence: u32) -> Result<Self, OrderNumberError> {
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(OrderNumberError::SequenceExhausted(date));
        }
        Ok(Self { date, sequence })
    }

    /// Parse `PZ-20251126-0001`.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for anything else.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let malformed = || OrderNumberError::Malformed(s.to_owned());

        let mut parts = s.trim().split('-');
        let (Some(prefix), Some(date), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        if prefix != PREFIX || date.len() != 8 || seq.len() != 4 {
            return Err(malformed());
        }
        if !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| malformed())?;
        let sequence = seq.parse::<u32>().map_err(|_| malformed())?;
        Self::new(date, sequence).map_err(|_| malformed())
    }

    /// Next number for `date` given a sample of existing order numbers.
    ///
    /// Numbers from other days and unparseable values are ignored; with no
    /// same-day match the sequence starts at `0001`.
    ///
    /// # Errors
    ///
    /// Returns `SequenceExhausted` after `9999`.
    pub fn next_for<'a, I>(date: NaiveDate, existing: I) -> Result<Self, OrderNumberError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing
            .into_iter()
            .filter_map(|raw| Self::parse(raw).ok())
            .filter(|number| number.date == date)
            .map(|number| number.sequence)
            .max()
            .unwrap_or(0);

        Self::new(date, max + 1)
    }

    /// Calendar day the order was placed.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Per-day sequence (1-based).
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}-{}-{:04}",
            self.date.format("%Y%m%d"),
            self.sequence
        )
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_order_of_the_day() {
        let number = OrderNumber::next_for(day(2025, 11, 26), []).unwrap();
        assert_eq!(number.to_string(), "PZ-20251126-0001");
    }

    #[test]
    fn test_increments_max_same_day_sequence() {
        let existing = [
            "PZ-20251126-0003",
            "PZ-20251126-0001",
            "PZ-20251125-0042",
            "garbage",
        ];
        let number = OrderNumber::next_for(day(2025, 11, 26), existing).unwrap();
        assert_eq!(number.to_string(), "PZ-20251126-0004");
    }

    #[test]
    fn test_other_days_do_not_count() {
        let number = OrderNumber::next_for(day(2025, 11, 27), ["PZ-20251126-0009"]).unwrap();
        assert_eq!(number.sequence(), 1);
    }

    #[test]
    fn test_sequence_exhausted() {
        let result = OrderNumber::next_for(day(2025, 11, 26), ["PZ-20251126-9999"]);
        assert!(matches!(result, Err(OrderNumberError::SequenceExhausted(_))));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "PZ-2025112-0001",
            "XX-20251126-0001",
            "PZ-20251126-001",
            "PZ-20251126-00a1",
            "PZ-20251126-0000",
            "PZ-20251340-0001",
            "PZ-20251126-0001-1",
        ] {
            assert!(OrderNumber::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_parse_round_trip() {
        let number = OrderNumber::parse("PZ-20251126-0012").unwrap();
        assert_eq!(number.date(), day(2025, 11, 26));
        assert_eq!(number.sequence(), 12);
        assert_eq!(number.to_string(), "PZ-20251126-0012");
    }
}
