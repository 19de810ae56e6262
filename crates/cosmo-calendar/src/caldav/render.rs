//! Shaping matched items into `calendar-data`.

use cosmo_rfc::rfc::dav::core::ComponentSelection;
use cosmo_rfc::rfc::ical::core::Component;

use crate::model::{Occurrence, TemporalValue, ZoneContext};

/// ## Summary
/// Prunes a component tree to a `CALDAV:comp` selection.
///
/// Properties are kept when the selection names them or asks for all.
/// Children are kept when named or under `allcomp`, each pruned by its own
/// selection.
#[must_use]
pub fn select(component: &Component, selection: &ComponentSelection) -> Component {
    Component {
        kind: component.kind,
        name: component.name.clone(),
        properties: component
            .properties
            .iter()
            .filter(|p| selection.keeps_prop(&p.name))
            .cloned()
            .collect(),
        children: component
            .children
            .iter()
            .filter_map(|child| {
                selection
                    .child(&child.name)
                    .map(|sel| select(child, &sel))
            })
            .collect(),
    }
}

/// ## Summary
/// A VCALENDAR holding one component per occurrence, with times in UTC.
///
/// Values that cannot be placed in time stay as they are.
#[must_use]
pub fn expanded_calendar(occurrences: &[Occurrence<'_>], ctx: &ZoneContext<'_>) -> Component {
    let to_utc = |value: &TemporalValue| {
        if value.is_date_only() || value.is_utc() {
            return value.clone();
        }
        value.to_utc(ctx).unwrap_or_else(|error| {
            tracing::debug!(%value, %error, "Left in its own frame");
            value.clone()
        })
    };

    let mut calendar = Component::calendar();
    for occurrence in occurrences {
        let mut instance = occurrence.clone();
        instance.start = instance.start.as_ref().map(to_utc);
        instance.end = instance.end.as_ref().map(to_utc);
        instance.recurrence_id = instance.recurrence_id.as_ref().map(to_utc);
        calendar.add_child(instance.to_component());
    }
    calendar
}
