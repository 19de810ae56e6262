//! DATE values and the typed side of a property value (RFC 5545 §3.3).

use std::fmt;

use chrono::NaiveDate;

use super::datetime::parse_compact_date;
use super::{DateTime, Duration};
use crate::error::{RfcError, RfcResult};

/// A DATE: a whole calendar day with no time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date(NaiveDate);

impl Date {
    #[must_use]
    pub const fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// ## Summary
    /// Reads `YYYYMMDD`.
    ///
    /// ## Errors
    /// Returns [`RfcError::InvalidValue`] if the text is not a valid calendar date.
    pub fn parse(text: &str) -> RfcResult<Self> {
        parse_compact_date(text.trim())
            .map(Self)
            .ok_or_else(|| RfcError::invalid_value("DATE", text))
    }

    #[must_use]
    pub const fn to_naive(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

/// The typed reading of a property value. The stored text stays on the
/// property as `raw_value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Date(Date),
    /// RDATE/EXDATE with `VALUE=DATE` and several entries.
    DateList(Vec<Date>),
    DateTime(DateTime),
    DateTimeList(Vec<DateTime>),
    Duration(Duration),
    Integer(i32),
    /// An RRULE or EXRULE body.
    Recur(String),
    /// Unescaped text.
    Text(String),
    TextList(Vec<String>),
}

impl Value {
    /// The single textual form, if the value has one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Recur(text) => Some(text),
            _ => None,
        }
    }

    /// Every textual form, one per list entry. Empty for non-text values.
    #[must_use]
    pub fn text_values(&self) -> Vec<&str> {
        match self {
            Self::TextList(texts) => texts.iter().map(String::as_str).collect(),
            other => other.as_text().into_iter().collect(),
        }
    }
}
