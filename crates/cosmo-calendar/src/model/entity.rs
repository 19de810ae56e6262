//! Master calendar entities and their capability records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::TimeDelta;

use cosmo_rfc::rfc::ical::core::{Component, ComponentKind, Duration, Property, names};

use super::alarm::DisplayAlarm;
use super::temporal::{TemporalValue, ZoneContext};
use crate::error::SchemaError;

/// Properties the entity model reads into typed fields.
const MODELLED_PROPERTIES: [&str; 12] = [
    names::UID,
    names::SUMMARY,
    names::DESCRIPTION,
    names::LOCATION,
    names::STATUS,
    names::DTSTART,
    names::DTEND,
    names::DURATION,
    names::RRULE,
    names::RDATE,
    names::EXRULE,
    names::EXDATE,
];

/// The text of one RRULE or EXRULE value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceRule(String);

impl RecurrenceRule {
    #[must_use]
    pub fn new(rule: impl Into<String>) -> Self {
        Self(rule.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusion and exclusion sources of a recurring master.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurrenceSet {
    pub rules: Vec<RecurrenceRule>,
    pub dates: Vec<TemporalValue>,
    pub exception_rules: Vec<RecurrenceRule>,
    pub exception_dates: Vec<TemporalValue>,
}

impl RecurrenceSet {
    /// No rule and no extra date: the master occurs once.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.dates.is_empty()
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(RecurrenceRule::new(rule));
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: TemporalValue) -> Self {
        self.dates.push(date);
        self
    }

    #[must_use]
    pub fn with_exception_rule(mut self, rule: impl Into<String>) -> Self {
        self.exception_rules.push(RecurrenceRule::new(rule));
        self
    }

    #[must_use]
    pub fn with_exception_date(mut self, date: TemporalValue) -> Self {
        self.exception_dates.push(date);
        self
    }

    fn to_properties(&self) -> Vec<Property> {
        let rules = self
            .rules
            .iter()
            .map(|rule| Property::recur(names::RRULE, rule.as_str()));
        let dates = self.dates.iter().map(|d| d.to_property(names::RDATE));
        let exception_rules = self
            .exception_rules
            .iter()
            .map(|rule| Property::recur(names::EXRULE, rule.as_str()));
        let exception_dates = self
            .exception_dates
            .iter()
            .map(|d| d.to_property(names::EXDATE));
        rules
            .chain(dates)
            .chain(exception_rules)
            .chain(exception_dates)
            .collect()
    }

    fn from_component(component: &Component) -> Result<Self, SchemaError> {
        let rules = |name: &str| -> Vec<RecurrenceRule> {
            component
                .get_properties(name)
                .into_iter()
                .map(|prop| RecurrenceRule::new(prop.raw_value.clone()))
                .collect()
        };
        let dates = |name: &str| -> Result<Vec<TemporalValue>, SchemaError> {
            let mut out = Vec::new();
            for prop in component.get_properties(name) {
                out.extend(TemporalValue::from_property_list(prop)?);
            }
            Ok(out)
        };

        Ok(Self {
            rules: rules(names::RRULE),
            dates: dates(names::RDATE)?,
            exception_rules: rules(names::EXRULE),
            exception_dates: dates(names::EXDATE)?,
        })
    }
}

/// How an event's end is written.
#[derive(Debug, Clone, PartialEq)]
pub enum EventEnd {
    End(TemporalValue),
    Duration(Duration),
}

/// Timing of an event or other scheduled item.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub start: TemporalValue,
    pub end: Option<EventEnd>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub recurrence: RecurrenceSet,
}

impl EventData {
    #[must_use]
    pub fn new(start: TemporalValue) -> Self {
        Self {
            start,
            end: None,
            location: None,
            status: None,
            recurrence: RecurrenceSet::default(),
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: TemporalValue) -> Self {
        self.end = Some(EventEnd::End(end));
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.end = Some(EventEnd::Duration(duration));
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_recurrence(mut self, recurrence: RecurrenceSet) -> Self {
        self.recurrence = recurrence;
        self
    }

    /// ## Summary
    /// Length of each occurrence, or `None` when the event has no end.
    ///
    /// Ends written in the start's frame give a wall-clock length; ends in
    /// another frame are measured between instants.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when the end is in another frame and one
    /// of the two values cannot be placed on the time line.
    pub fn duration(&self, ctx: &ZoneContext<'_>) -> Result<Option<TimeDelta>, SchemaError> {
        match &self.end {
            None => Ok(None),
            Some(EventEnd::Duration(duration)) => Ok(Some(duration.to_time_delta())),
            Some(EventEnd::End(end)) => {
                if end.reference() == self.start.reference() {
                    Ok(Some(end.local() - self.start.local()))
                } else {
                    Ok(Some(end.position(ctx)? - self.start.position(ctx)?))
                }
            }
        }
    }

    fn end_properties(&self) -> Option<Property> {
        match &self.end {
            None => None,
            Some(EventEnd::End(end)) => Some(end.to_property(names::DTEND)),
            Some(EventEnd::Duration(duration)) => {
                Some(Property::duration(names::DURATION, *duration))
            }
        }
    }
}

/// Key of a capability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKey {
    Event,
    Alarm,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Event(EventData),
    Alarm(DisplayAlarm),
}

impl Capability {
    #[must_use]
    pub fn key(&self) -> CapabilityKey {
        match self {
            Self::Event(_) => CapabilityKey::Event,
            Self::Alarm(_) => CapabilityKey::Alarm,
        }
    }
}

/// Optional records attached to an entity, at most one per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities(BTreeMap<CapabilityKey, Capability>);

impl Capabilities {
    /// Stores a record, returning the one it replaces.
    pub fn insert(&mut self, capability: Capability) -> Option<Capability> {
        self.0.insert(capability.key(), capability)
    }

    pub fn remove(&mut self, key: CapabilityKey) -> Option<Capability> {
        self.0.remove(&key)
    }

    #[must_use]
    pub fn get(&self, key: CapabilityKey) -> Option<&Capability> {
        self.0.get(&key)
    }

    #[must_use]
    pub fn contains(&self, key: CapabilityKey) -> bool {
        self.0.contains_key(&key)
    }

    #[must_use]
    pub fn event(&self) -> Option<&EventData> {
        match self.get(CapabilityKey::Event) {
            Some(Capability::Event(event)) => Some(event),
            _ => None,
        }
    }

    #[must_use]
    pub fn alarm(&self) -> Option<&DisplayAlarm> {
        match self.get(CapabilityKey::Alarm) {
            Some(Capability::Alarm(alarm)) => Some(alarm),
            _ => None,
        }
    }
}

/// A stored calendar item: the master of any recurrence it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntity {
    pub uid: String,
    pub kind: ComponentKind,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Properties without a typed field (DTSTAMP, CATEGORIES, ...).
    pub extra_properties: Vec<Property>,
    /// Sub-components without a typed record, such as AUDIO alarms.
    pub extra_components: Vec<Component>,
    pub capabilities: Capabilities,
}

impl CalendarEntity {
    #[must_use]
    pub fn new(uid: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            uid: uid.into(),
            kind,
            summary: None,
            description: None,
            extra_properties: Vec::new(),
            extra_components: Vec::new(),
            capabilities: Capabilities::default(),
        }
    }

    /// A VEVENT with the given timing.
    #[must_use]
    pub fn event(uid: impl Into<String>, event: EventData) -> Self {
        let mut entity = Self::new(uid, ComponentKind::Event);
        entity.capabilities.insert(Capability::Event(event));
        entity
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, prop: Property) -> Self {
        self.extra_properties.push(prop);
        self
    }

    #[must_use]
    pub fn with_alarm(mut self, alarm: DisplayAlarm) -> Self {
        self.capabilities.insert(Capability::Alarm(alarm));
        self
    }

    #[must_use]
    pub fn event_data(&self) -> Option<&EventData> {
        self.capabilities.event()
    }

    #[must_use]
    pub fn alarm(&self) -> Option<&DisplayAlarm> {
        self.capabilities.alarm()
    }

    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.event_data()
            .is_some_and(|event| !event.recurrence.is_empty())
    }

    /// Renders the master as stored, recurrence properties included.
    #[must_use]
    pub fn to_component(&self) -> Component {
        let mut component = Component::new(self.kind)
            .with_property(Property::text(names::UID, self.uid.as_str()));

        if let Some(event) = self.event_data() {
            component.add_property(event.start.to_property(names::DTSTART));
            if let Some(end) = event.end_properties() {
                component.add_property(end);
            }
        }
        push_text(&mut component, names::SUMMARY, self.summary.as_deref());
        push_text(&mut component, names::DESCRIPTION, self.description.as_deref());
        if let Some(event) = self.event_data() {
            push_text(&mut component, names::LOCATION, event.location.as_deref());
            push_text(&mut component, names::STATUS, event.status.as_deref());
            component
                .properties
                .extend(event.recurrence.to_properties());
        }
        component
            .properties
            .extend(self.extra_properties.iter().cloned());

        if let Some(alarm) = self.alarm() {
            component.add_child(alarm.to_component());
        }
        component
            .children
            .extend(self.extra_components.iter().cloned());
        component
    }

    /// ## Summary
    /// Reads a master from an iCalendar component.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when UID is missing or a date, duration or
    /// alarm cannot be read.
    pub fn from_component(component: &Component) -> Result<Self, SchemaError> {
        let uid = component
            .uid()
            .ok_or(SchemaError::MissingProperty(names::UID))?;
        let kind = component.kind.unwrap_or(ComponentKind::Unknown);
        let text = |name: &str| {
            component
                .get_property(name)
                .map(|p| p.as_text().unwrap_or(p.raw_value.as_str()).to_string())
        };

        let mut entity = Self::new(uid, kind);
        entity.summary = text(names::SUMMARY);
        entity.description = text(names::DESCRIPTION);

        if let Some(dtstart) = component.get_property(names::DTSTART) {
            let start = TemporalValue::from_property(dtstart)?;
            let end = if let Some(dtend) = component.get_property(names::DTEND) {
                Some(EventEnd::End(TemporalValue::from_property(dtend)?))
            } else if let Some(prop) = component.get_property(names::DURATION) {
                let duration = match prop.as_duration() {
                    Some(duration) => *duration,
                    None => Duration::parse(&prop.raw_value).map_err(|e| {
                        SchemaError::InvalidField {
                            field: names::DURATION.to_string(),
                            reason: e.to_string(),
                        }
                    })?,
                };
                Some(EventEnd::Duration(duration))
            } else {
                None
            };

            entity.capabilities.insert(Capability::Event(EventData {
                start,
                end,
                location: text(names::LOCATION),
                status: text(names::STATUS),
                recurrence: RecurrenceSet::from_component(component)?,
            }));
        }

        entity.extra_properties = component
            .properties
            .iter()
            .filter(|p| !MODELLED_PROPERTIES.contains(&p.name.as_str()))
            .filter(|p| p.name != names::RECURRENCE_ID)
            .cloned()
            .collect();

        for child in &component.children {
            match DisplayAlarm::from_component(child) {
                Ok(alarm) if child.kind == Some(ComponentKind::Alarm) && entity.alarm().is_none() => {
                    entity.capabilities.insert(Capability::Alarm(alarm));
                }
                _ => entity.extra_components.push(child.clone()),
            }
        }

        Ok(entity)
    }
}

pub(crate) fn push_text(component: &mut Component, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        component.add_property(Property::text(name, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::alarm::AlarmTrigger;
    use chrono::NaiveDate;
    use cosmo_rfc::rfc::ical::expand::TimeZoneResolver;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn daily_standup() -> CalendarEntity {
        let start = TemporalValue::zoned(local(2007, 2, 10, 9, 0), "America/Chicago");
        CalendarEntity::event(
            "standup",
            EventData::new(start.clone())
                .with_end(start.shifted(TimeDelta::minutes(30)).unwrap())
                .with_location("here")
                .with_recurrence(
                    RecurrenceSet::default()
                        .with_rule("FREQ=DAILY")
                        .with_exception_date(start.shifted(TimeDelta::days(3)).unwrap()),
                ),
        )
        .with_summary("Standup")
        .with_alarm(DisplayAlarm::new(AlarmTrigger::Relative {
            offset: Duration {
                minutes: 5,
                ..Duration::zero()
            }
            .negate(),
            related: crate::model::alarm::AlarmRelated::Start,
        }))
        .with_property(Property::text("CATEGORIES", "WORK"))
    }

    #[test]
    fn capabilities_are_keyed() {
        let mut caps = Capabilities::default();
        assert!(caps.event().is_none());
        let event = EventData::new(TemporalValue::date(
            NaiveDate::from_ymd_opt(2007, 2, 12).unwrap(),
        ));
        assert!(caps.insert(Capability::Event(event.clone())).is_none());
        assert!(caps.contains(CapabilityKey::Event));
        assert_eq!(caps.event(), Some(&event));
        assert!(caps.insert(Capability::Event(event)).is_some());
        assert!(caps.remove(CapabilityKey::Event).is_some());
        assert!(!caps.contains(CapabilityKey::Event));
    }

    #[test]
    fn component_round_trip() {
        let entity = daily_standup();
        assert!(entity.is_recurring());

        let component = entity.to_component();
        assert_eq!(component.uid(), Some("standup"));
        assert_eq!(
            component.get_property(names::RRULE).map(|p| p.raw_value.as_str()),
            Some("FREQ=DAILY")
        );
        assert_eq!(component.alarms().len(), 1);

        let parsed = CalendarEntity::from_component(&component).unwrap();
        assert_eq!(parsed, entity);
    }

    #[test]
    fn non_display_alarms_are_kept_aside() {
        let component = Component::event()
            .with_property(Property::text(names::UID, "x"))
            .with_child(
                Component::alarm()
                    .with_property(Property::text(names::ACTION, "AUDIO"))
                    .with_property(Property::text(names::TRIGGER, "-PT5M")),
            );
        let entity = CalendarEntity::from_component(&component).unwrap();
        assert!(entity.alarm().is_none());
        assert_eq!(entity.extra_components.len(), 1);
        assert!(entity.event_data().is_none());
        assert!(!entity.is_recurring());
    }

    #[test]
    fn missing_uid_is_a_schema_error() {
        assert!(matches!(
            CalendarEntity::from_component(&Component::event()),
            Err(SchemaError::MissingProperty("UID"))
        ));
    }

    #[test]
    fn duration_in_and_across_frames() {
        let resolver = TimeZoneResolver::new();
        let ctx = ZoneContext::new(&resolver);
        let start = TemporalValue::zoned(local(2007, 2, 12, 9, 0), "America/Chicago");

        let same_frame = EventData::new(start.clone()).with_end(start.shifted(TimeDelta::hours(1)).unwrap());
        assert_eq!(same_frame.duration(&ctx).unwrap(), Some(TimeDelta::hours(1)));

        let utc_end = EventData::new(start.clone())
            .with_end(TemporalValue::utc(local(2007, 2, 12, 16, 30)));
        assert_eq!(utc_end.duration(&ctx).unwrap(), Some(TimeDelta::minutes(90)));

        assert_eq!(EventData::new(start.clone()).duration(&ctx).unwrap(), None);

        let by_duration = EventData::new(start).with_duration(Duration {
            hours: 2,
            ..Duration::zero()
        });
        assert_eq!(by_duration.duration(&ctx).unwrap(), Some(TimeDelta::hours(2)));
    }

    #[test]
    fn status_and_duration_survive_a_round_trip() {
        let entity = CalendarEntity::event(
            "review",
            EventData::new(TemporalValue::utc(local(2007, 3, 1, 15, 0)))
                .with_duration(Duration {
                    minutes: 45,
                    ..Duration::zero()
                })
                .with_status("TENTATIVE"),
        );
        let component = entity.to_component();
        assert_eq!(
            component.get_property(names::STATUS).map(|p| p.raw_value.as_str()),
            Some("TENTATIVE")
        );
        assert_eq!(CalendarEntity::from_component(&component).unwrap(), entity);
    }
}
