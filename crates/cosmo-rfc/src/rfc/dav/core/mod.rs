//! CalDAV request types (RFC 4791).
//!
//! The filter tree and the calendar-query request it arrives in. Both
//! are immutable once parsed.

mod filter;
mod query;

pub use filter::{CalendarFilter, CompFilter, MatchType, ParamFilter, PropFilter, TextMatch, TimeRange};
pub use query::{CalendarQuery, ComponentSelection};
