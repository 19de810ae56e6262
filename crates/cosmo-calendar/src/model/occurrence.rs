//! Transient instances produced while evaluating a query.

use std::borrow::Cow;

use cosmo_rfc::rfc::ical::core::{Component, Property, names};

use super::alarm::DisplayAlarm;
use super::entity::{CalendarEntity, push_text};
use super::modification::Modification;
use super::temporal::{TemporalValue, ZoneContext};
use crate::error::TemporalError;

/// Where an occurrence's fields come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OccurrenceSource<'a> {
    Master,
    Modification(&'a Modification),
}

/// One concrete instance of a master, with its effective times.
///
/// Text fields and the reminder are resolved on access: a modification's
/// patch wins, otherwise the master's value shows through.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence<'a> {
    pub master: &'a CalendarEntity,
    /// Original start of the instance; `None` for a non-recurring master.
    pub recurrence_id: Option<TemporalValue>,
    pub start: Option<TemporalValue>,
    pub end: Option<TemporalValue>,
    pub source: OccurrenceSource<'a>,
}

impl<'a> Occurrence<'a> {
    /// The master standing for itself.
    #[must_use]
    pub fn single(master: &'a CalendarEntity) -> Self {
        let event = master.event_data();
        Self {
            master,
            recurrence_id: None,
            start: event.map(|e| e.start.clone()),
            end: None,
            source: OccurrenceSource::Master,
        }
    }

    /// A generated instance of a recurring master.
    #[must_use]
    pub fn generated(
        master: &'a CalendarEntity,
        start: TemporalValue,
        end: Option<TemporalValue>,
    ) -> Self {
        Self {
            master,
            recurrence_id: Some(start.clone()),
            start: Some(start),
            end,
            source: OccurrenceSource::Master,
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: Option<TemporalValue>) -> Self {
        self.end = end;
        self
    }

    #[must_use]
    pub fn modification(&self) -> Option<&'a Modification> {
        match self.source {
            OccurrenceSource::Master => None,
            OccurrenceSource::Modification(modification) => Some(modification),
        }
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modification().is_some()
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        let inherited = self.master.summary.as_ref();
        match self.modification() {
            None => inherited,
            Some(m) => m.summary.resolve(inherited),
        }
        .map(String::as_str)
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        let inherited = self.master.description.as_ref();
        match self.modification() {
            None => inherited,
            Some(m) => m.description.resolve(inherited),
        }
        .map(String::as_str)
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        let inherited = self.master.event_data().and_then(|e| e.location.as_ref());
        match self.modification() {
            None => inherited,
            Some(m) => m.location.resolve(inherited),
        }
        .map(String::as_str)
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        let inherited = self.master.event_data().and_then(|e| e.status.as_ref());
        match self.modification() {
            None => inherited,
            Some(m) => m.status.resolve(inherited),
        }
        .map(String::as_str)
    }

    /// Effective reminder. The master's alarm is copied, never shared.
    #[must_use]
    pub fn alarm(&self) -> Option<Cow<'a, DisplayAlarm>> {
        match self.modification() {
            None => self.master.alarm().map(Cow::Borrowed),
            Some(m) => m.effective_alarm(self.master.alarm()),
        }
    }

    /// ## Summary
    /// Key naming this instance: the recurrence-id text, or the start for a
    /// non-recurring master. With `utc` set, date-times are converted to
    /// UTC first.
    ///
    /// ## Errors
    /// Returns [`TemporalError::FloatingWithoutZone`] when a floating key
    /// must be converted and no zone is available.
    pub fn instance_key(&self, utc: bool, ctx: &ZoneContext<'_>) -> Result<String, TemporalError> {
        let Some(key) = self.recurrence_id.as_ref().or(self.start.as_ref()) else {
            return Ok(self.master.uid.clone());
        };
        if utc && !key.is_date_only() && !key.is_utc() {
            return Ok(TemporalValue::from_instant(key.position(ctx)?).value_text());
        }
        Ok(key.value_text())
    }

    /// ## Summary
    /// Renders the instance as a component of the master's kind.
    ///
    /// Times and text are the effective ones. Recurring masters get a
    /// RECURRENCE-ID; recurrence properties are never rendered.
    #[must_use]
    pub fn to_component(&self) -> Component {
        let mut component = Component::new(self.master.kind)
            .with_property(Property::text(names::UID, self.master.uid.as_str()));

        if let Some(start) = &self.start {
            component.add_property(start.to_property(names::DTSTART));
        }
        if let Some(end) = &self.end {
            component.add_property(end.to_property(names::DTEND));
        }
        if self.master.is_recurring()
            && let Some(rid) = &self.recurrence_id
        {
            component.add_property(rid.to_property(names::RECURRENCE_ID));
        }
        push_text(&mut component, names::SUMMARY, self.summary());
        push_text(&mut component, names::DESCRIPTION, self.description());
        push_text(&mut component, names::LOCATION, self.location());
        push_text(&mut component, names::STATUS, self.status());
        component
            .properties
            .extend(self.master.extra_properties.iter().cloned());

        if let Some(alarm) = self.alarm() {
            component.add_child(alarm.to_component());
        }
        component
            .children
            .extend(self.master.extra_components.iter().cloned());
        component
    }

    /// The instance wrapped in a VCALENDAR, the shape filters are evaluated
    /// against.
    #[must_use]
    pub fn calendar_component(&self) -> Component {
        Component::calendar().with_child(self.to_component())
    }
}
