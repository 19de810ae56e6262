use thiserror::Error;

use cosmo_rfc::rfc::dav::parse::ParseError;

/// Problems with a single date or date-time value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Missing VALUE parameter in {0}")]
    MissingValueType(String),

    #[error("Bad VALUE parameter: {0}")]
    BadValueType(String),

    #[error("Invalid date value: {0}")]
    InvalidDate(String),

    #[error("Invalid date-time value: {0}")]
    InvalidDateTime(String),

    #[error("Malformed value text: {0}")]
    Malformed(String),

    #[error("Any-time value has no instant")]
    AnyTime,

    #[error("Floating value {0} has no zone to resolve against")]
    FloatingWithoutZone(String),

    #[error("{0} is outside the supported date range")]
    OutOfRange(String),
}

/// A request the engine refuses to evaluate. Maps to HTTP 400.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Unsupported collation: {0}")]
    UnsupportedCollation(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid time-range: {0}")]
    InvalidTimeRange(String),

    #[error(transparent)]
    Temporal(#[from] TemporalError),
}

/// Stored data the engine cannot interpret. The entity is skipped.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid recurrence rule {rule}: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Invalid override of {uid}: {reason}")]
    InvalidOverride { uid: String, reason: String },

    #[error("Unknown modification field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Missing {0}")]
    MissingProperty(&'static str),

    #[error(transparent)]
    Temporal(#[from] TemporalError),
}

/// Engine errors - combines all error types
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Core(#[from] cosmo_core::error::CoreError),
}

impl From<ParseError> for CalendarError {
    fn from(error: ParseError) -> Self {
        Self::Request(RequestError::Parse(error))
    }
}

pub type CalendarResult<T> = std::result::Result<T, CalendarError>;
