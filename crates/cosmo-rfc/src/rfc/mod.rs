//! Calendar data model and CalDAV request types.

pub mod dav;
pub mod ical;
