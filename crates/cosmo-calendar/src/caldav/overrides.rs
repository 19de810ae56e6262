//! Applying modifications to expanded occurrences.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};

use cosmo_rfc::rfc::ical::expand::TimeZoneResolver;

use super::time_range::TimeRangePredicate;
use crate::error::{SchemaError, TemporalError};
use crate::model::{
    CalendarEntity, EventData, EventEnd, Modification, Occurrence, OccurrenceSource, Patch,
    TemporalValue, ZoneContext,
};

/// Replaces, removes and adds occurrences according to a master's
/// modifications.
#[derive(Debug, Clone, Copy)]
pub struct OverrideMerger<'r> {
    resolver: &'r TimeZoneResolver,
    window: Option<&'r TimeRangePredicate>,
}

impl<'r> OverrideMerger<'r> {
    #[must_use]
    pub fn new(resolver: &'r TimeZoneResolver, window: Option<&'r TimeRangePredicate>) -> Self {
        Self { resolver, window }
    }

    fn zone_context(&self) -> ZoneContext<'r> {
        self.window.map_or_else(
            || ZoneContext::new(self.resolver),
            |w| w.zone_context(self.resolver),
        )
    }

    fn in_window(&self, occurrence: &Occurrence<'_>) -> bool {
        match (self.window, &occurrence.start) {
            (Some(window), Some(start)) => {
                window.matches(start, occurrence.end.as_ref(), self.resolver)
            }
            _ => true,
        }
    }

    /// ## Summary
    /// Merges `overrides` into the occurrences expanded from `master`.
    ///
    /// A modification matches the occurrence whose recurrence-id is the same
    /// instant. Deleted modifications remove their occurrence. Others are
    /// applied and the result is tested against the window again, so a
    /// rescheduled instance is placed by its new time. Modifications that
    /// match nothing are added when their effective time is in the window.
    ///
    /// ## Errors
    /// Returns [`SchemaError::InvalidOverride`] for a modification of
    /// another master, two modifications of one instance, or a cleared
    /// start.
    pub fn merge<'a>(
        &self,
        master: &'a CalendarEntity,
        occurrences: Vec<Occurrence<'a>>,
        overrides: &'a [Modification],
    ) -> Result<Vec<Occurrence<'a>>, SchemaError> {
        let Some(event) = master.event_data() else {
            return Ok(occurrences);
        };
        if overrides.is_empty() {
            return Ok(occurrences);
        }

        let ctx = self.zone_context();
        let mut pending = BTreeMap::new();
        for modification in overrides {
            let invalid = |reason: &str| SchemaError::InvalidOverride {
                uid: master.uid.clone(),
                reason: format!("{reason} at {}", modification.recurrence_id),
            };
            if modification.master_uid != master.uid {
                return Err(invalid(&format!("belongs to {}", modification.master_uid)));
            }
            if modification.start == Patch::Clear {
                return Err(invalid("start cleared"));
            }
            let key = modification
                .recurrence_id
                .local_in_frame_of(&event.start, &ctx)?;
            if pending.insert(key, modification).is_some() {
                return Err(invalid("duplicate modification"));
            }
        }

        let duration = event.duration(&ctx)?;
        let mut merged = Vec::with_capacity(occurrences.len());
        for occurrence in occurrences {
            let key = occurrence
                .recurrence_id
                .as_ref()
                .or(occurrence.start.as_ref())
                .map(TemporalValue::local);
            let Some(modification) = key.and_then(|key| pending.remove(&key)) else {
                merged.push(occurrence);
                continue;
            };
            if modification.deleted {
                tracing::trace!(uid = %master.uid, rid = %modification.recurrence_id, "Occurrence deleted");
                continue;
            }
            let modified = apply(occurrence, modification, duration)?;
            if self.in_window(&modified) {
                merged.push(modified);
            }
        }

        for (key, modification) in pending {
            if modification.deleted {
                continue;
            }
            let added = apply(base_occurrence(master, event, key, duration)?, modification, duration)?;
            if self.in_window(&added) {
                tracing::trace!(uid = %master.uid, rid = %modification.recurrence_id, "Occurrence added");
                merged.push(added);
            }
        }
        Ok(merged)
    }
}

/// The occurrence a modification would replace, rebuilt from its key.
fn base_occurrence<'a>(
    master: &'a CalendarEntity,
    event: &EventData,
    key: NaiveDateTime,
    duration: Option<TimeDelta>,
) -> Result<Occurrence<'a>, TemporalError> {
    let start = event.start.with_local(key);
    let end = duration.map(|d| start.shifted(d)).transpose()?;
    Ok(Occurrence::generated(master, start, end))
}

fn apply<'a>(
    base: Occurrence<'a>,
    modification: &'a Modification,
    duration: Option<TimeDelta>,
) -> Result<Occurrence<'a>, TemporalError> {
    let start = match (&modification.start, base.start) {
        (Patch::Set(start), _) => Some(start.clone()),
        (_, inherited) => inherited,
    };
    let start = start.map(|start| match modification.any_time {
        Patch::Inherit => start,
        Patch::Clear => start.with_any_time(false),
        Patch::Set(any_time) => start.with_any_time(any_time),
    });

    let end = match (&modification.end, &start) {
        (Patch::Clear, _) | (_, None) => None,
        (Patch::Set(EventEnd::End(end)), _) => Some(end.clone()),
        (Patch::Set(EventEnd::Duration(d)), Some(start)) => Some(start.shifted(d.to_time_delta())?),
        (Patch::Inherit, Some(start)) => duration.map(|d| start.shifted(d)).transpose()?,
    };

    Ok(Occurrence {
        master: base.master,
        recurrence_id: base.recurrence_id,
        start,
        end,
        source: OccurrenceSource::Modification(modification),
    })
}
