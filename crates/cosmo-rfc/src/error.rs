use thiserror::Error;

use crate::rfc::dav::parse::ParseError as QueryParseError;
use crate::rfc::ical::expand::{ConversionError, VTimezoneError};

/// Errors from the calendar object model and request parsing.
#[derive(Debug, Error)]
pub enum RfcError {
    /// Text that does not read as a value of the named iCalendar type.
    #[error("invalid {value_type} value: {text}")]
    InvalidValue {
        value_type: &'static str,
        text: String,
    },

    /// A UTC date-time that also names a zone.
    #[error("UTC DATE-TIME {text} must not carry TZID {tzid}")]
    ConflictingZone { text: String, tzid: String },

    #[error(transparent)]
    Timezone(#[from] ConversionError),

    #[error(transparent)]
    VTimezone(#[from] VTimezoneError),

    #[error(transparent)]
    Query(#[from] QueryParseError),
}

impl RfcError {
    pub(crate) fn invalid_value(value_type: &'static str, text: &str) -> Self {
        Self::InvalidValue {
            value_type,
            text: text.to_owned(),
        }
    }
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
