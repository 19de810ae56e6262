//! DATE-TIME values (RFC 5545 §3.3.5).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{RfcError, RfcResult};

const COMPACT_DATE: &str = "%Y%m%d";
const COMPACT_DATETIME: &str = "%Y%m%dT%H%M%S";

/// How a DATE-TIME reading is tied to the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeForm {
    /// `19980118T230000`: the same wall clock everywhere.
    Floating,
    /// `19980119T070000Z`
    Utc,
    /// `TZID=America/New_York:19980119T020000`, with the id as written.
    Zoned { tzid: String },
}

/// A wall-clock reading plus its [`DateTimeForm`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub local: NaiveDateTime,
    pub form: DateTimeForm,
}

impl DateTime {
    #[must_use]
    pub fn floating(local: NaiveDateTime) -> Self {
        Self {
            local,
            form: DateTimeForm::Floating,
        }
    }

    #[must_use]
    pub fn utc(local: NaiveDateTime) -> Self {
        Self {
            local,
            form: DateTimeForm::Utc,
        }
    }

    #[must_use]
    pub fn zoned(local: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self {
            local,
            form: DateTimeForm::Zoned { tzid: tzid.into() },
        }
    }

    /// ## Summary
    /// Reads `YYYYMMDDTHHMMSS[Z]`. With no `Z`, a `tzid` makes the value
    /// zoned and its absence makes it floating.
    ///
    /// ## Errors
    /// Returns [`RfcError::InvalidValue`] if the text is not a valid
    /// DATE-TIME and [`RfcError::ConflictingZone`] if it carries both a `Z`
    /// suffix and a TZID.
    pub fn parse(text: &str, tzid: Option<&str>) -> RfcResult<Self> {
        let text = text.trim();
        let (reading, utc) = text
            .strip_suffix('Z')
            .map_or((text, false), |reading| (reading, true));
        let local = parse_compact_datetime(reading)
            .ok_or_else(|| RfcError::invalid_value("DATE-TIME", text))?;

        match (utc, tzid) {
            (true, None) => Ok(Self::utc(local)),
            (true, Some(tzid)) => Err(RfcError::ConflictingZone {
                text: text.to_owned(),
                tzid: tzid.to_owned(),
            }),
            (false, Some(tzid)) => Ok(Self::zoned(local, tzid)),
            (false, None) => Ok(Self::floating(local)),
        }
    }

    #[must_use]
    pub fn to_naive(&self) -> NaiveDateTime {
        self.local
    }

    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.form == DateTimeForm::Utc
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        if let DateTimeForm::Zoned { tzid } = &self.form {
            Some(tzid)
        } else {
            None
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format(COMPACT_DATETIME))?;
        if self.is_utc() {
            f.write_str("Z")?;
        }
        Ok(())
    }
}

/// Strict `YYYYMMDDTHHMMSS`, no zone suffix.
#[must_use]
pub fn parse_compact_datetime(text: &str) -> Option<NaiveDateTime> {
    let (date, time) = text.split_once('T')?;
    if time.len() != 6 || !time.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    parse_compact_date(date)?;
    NaiveDateTime::parse_from_str(text, COMPACT_DATETIME).ok()
}

/// Strict `YYYYMMDD`.
#[must_use]
pub fn parse_compact_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(text, COMPACT_DATE).ok()
}
