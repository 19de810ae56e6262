//! RFC 4791 `calendar-query`: the request model and its XML reader.

pub mod core;
pub mod parse;
