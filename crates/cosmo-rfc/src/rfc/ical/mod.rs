//! iCalendar (RFC 5545) object model and timezone resolution.

pub mod core;
pub mod expand;
