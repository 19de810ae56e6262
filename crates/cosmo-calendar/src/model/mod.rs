//! Calendar items as the filtering engine sees them.
//!
//! Masters are flat entities with keyed capability records; overrides are
//! patch records keyed by recurrence-id; occurrences are derived per query.

mod alarm;
mod entity;
mod modification;
mod occurrence;
mod temporal;

pub use alarm::{AlarmRelated, AlarmTrigger, DisplayAlarm};
pub use entity::{
    CalendarEntity, Capabilities, Capability, CapabilityKey, EventData, EventEnd, RecurrenceRule,
    RecurrenceSet,
};
pub use modification::{Modification, ModificationField, Patch};
pub use occurrence::{Occurrence, OccurrenceSource};
pub use temporal::{TemporalValue, TimeReference, ZoneContext};
