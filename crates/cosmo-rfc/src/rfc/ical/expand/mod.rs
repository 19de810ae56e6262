//! Zone resolution for iCalendar date-times.

mod timezone;
mod vtimezone;

pub use timezone::{ConversionError, TimeZoneResolver, Zone, normalize_tzid};
pub use vtimezone::{AnnualRule, Observance, ObservanceKind, UtcOffset, VTimezone, VTimezoneError};
