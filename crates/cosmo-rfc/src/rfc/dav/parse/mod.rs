//! Calendar-query XML parsing with `quick-xml`.

mod error;
mod report;

pub use error::{ParseError, ParseResult};
pub use report::{parse_calendar_query, parse_utc_datetime};
