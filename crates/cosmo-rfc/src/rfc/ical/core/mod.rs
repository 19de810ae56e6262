//! The iCalendar object tree that filters run against.
//!
//! Every property keeps the text it was stored with alongside its typed
//! value, so `text-match` compares what the client actually sent.

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod value;

pub use component::{Component, ComponentKind};
pub use datetime::{DateTime, DateTimeForm, parse_compact_date, parse_compact_datetime};
pub use duration::Duration;
pub use parameter::Parameter;
pub use property::{Property, names};
pub use value::{Date, Value};
