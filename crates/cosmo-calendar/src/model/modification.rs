//! Overrides of single occurrences of a recurring master.
//!
//! Each overridable field is a [`Patch`]: a field that was never sent
//! inherits the master's value, a field sent as null clears it.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use cosmo_rfc::rfc::ical::core::{Component, DateTime as ICalDateTime, Duration, names};

use super::alarm::{AlarmTrigger, DisplayAlarm};
use super::entity::EventEnd;
use super::temporal::TemporalValue;
use crate::error::SchemaError;

/// One overridable field.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Missing: the master's value applies.
    Inherit,
    /// Present but null: the occurrence has no value.
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Inherit
    }
}

impl<T> Patch<T> {
    /// Effective value given the inherited one.
    #[must_use]
    pub fn resolve<'a>(&'a self, inherited: Option<&'a T>) -> Option<&'a T> {
        match self {
            Self::Inherit => inherited,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Inherit => Patch::Inherit,
            Self::Clear => Patch::Clear,
            Self::Set(value) => Patch::Set(f(value)),
        }
    }

    #[must_use]
    pub fn is_inherit(&self) -> bool {
        matches!(self, Self::Inherit)
    }
}

/// Override record for the occurrence originally at `recurrence_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub master_uid: String,
    pub recurrence_id: TemporalValue,
    /// The occurrence is removed rather than changed.
    pub deleted: bool,
    pub start: Patch<TemporalValue>,
    pub end: Patch<EventEnd>,
    pub any_time: Patch<bool>,
    pub summary: Patch<String>,
    pub description: Patch<String>,
    pub location: Patch<String>,
    pub status: Patch<String>,
    pub reminder: Patch<AlarmTrigger>,
}

impl Modification {
    #[must_use]
    pub fn new(master_uid: impl Into<String>, recurrence_id: TemporalValue) -> Self {
        Self {
            master_uid: master_uid.into(),
            recurrence_id,
            deleted: false,
            start: Patch::Inherit,
            end: Patch::Inherit,
            any_time: Patch::Inherit,
            summary: Patch::Inherit,
            description: Patch::Inherit,
            location: Patch::Inherit,
            status: Patch::Inherit,
            reminder: Patch::Inherit,
        }
    }

    /// Removes the occurrence at `recurrence_id`.
    #[must_use]
    pub fn deletion(master_uid: impl Into<String>, recurrence_id: TemporalValue) -> Self {
        Self {
            deleted: true,
            ..Self::new(master_uid, recurrence_id)
        }
    }

    #[must_use]
    pub fn with(mut self, field: ModificationField) -> Self {
        field.apply(&mut self);
        self
    }

    /// ## Summary
    /// Applies one named record field; `None` is a null value.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] for unknown names and unreadable values.
    pub fn apply_field(&mut self, name: &str, value: Option<&str>) -> Result<(), SchemaError> {
        ModificationField::parse(name, value)?.apply(self);
        Ok(())
    }

    /// Effective reminder given the master's.
    #[must_use]
    pub fn effective_alarm<'a>(
        &self,
        master: Option<&'a DisplayAlarm>,
    ) -> Option<Cow<'a, DisplayAlarm>> {
        match &self.reminder {
            Patch::Inherit => master.map(Cow::Borrowed),
            Patch::Clear => None,
            Patch::Set(trigger) => {
                let mut alarm = master.cloned().unwrap_or_else(|| DisplayAlarm::new(trigger.clone()));
                alarm.trigger = trigger.clone();
                Some(Cow::Owned(alarm))
            }
        }
    }

    /// ## Summary
    /// Reads an override component carrying RECURRENCE-ID. Properties it
    /// carries are set; the rest are inherited.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when UID or RECURRENCE-ID is missing or a
    /// value cannot be read.
    pub fn from_component(component: &Component) -> Result<Self, SchemaError> {
        let uid = component
            .uid()
            .ok_or(SchemaError::MissingProperty(names::UID))?;
        let recurrence_id = component
            .get_property(names::RECURRENCE_ID)
            .ok_or(SchemaError::MissingProperty(names::RECURRENCE_ID))
            .and_then(|p| TemporalValue::from_property(p).map_err(SchemaError::from))?;

        let text = |name: &str| {
            component.get_property(name).map_or(Patch::Inherit, |p| {
                Patch::Set(p.as_text().unwrap_or(p.raw_value.as_str()).to_string())
            })
        };

        let mut modification = Self::new(uid, recurrence_id);
        if let Some(dtstart) = component.get_property(names::DTSTART) {
            modification.start = Patch::Set(TemporalValue::from_property(dtstart)?);
        }
        if let Some(dtend) = component.get_property(names::DTEND) {
            modification.end = Patch::Set(EventEnd::End(TemporalValue::from_property(dtend)?));
        } else if let Some(duration) = component
            .get_property(names::DURATION)
            .and_then(|p| p.as_duration())
        {
            modification.end = Patch::Set(EventEnd::Duration(*duration));
        }
        modification.summary = text(names::SUMMARY);
        modification.description = text(names::DESCRIPTION);
        modification.location = text(names::LOCATION);
        modification.status = text(names::STATUS);
        if let Some(alarm) = component
            .alarms()
            .into_iter()
            .find_map(|c| DisplayAlarm::from_component(c).ok())
        {
            modification.reminder = Patch::Set(alarm.trigger);
        }
        Ok(modification)
    }
}

/// A typed override field, applied through [`ModificationField::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModificationField {
    Start(Patch<TemporalValue>),
    End(Patch<TemporalValue>),
    Duration(Patch<Duration>),
    AnyTime(Patch<bool>),
    Location(Patch<String>),
    Status(Patch<String>),
    Title(Patch<String>),
    Body(Patch<String>),
    ReminderTime(Patch<DateTime<Utc>>),
}

impl ModificationField {
    /// ## Summary
    /// Reads a record field by name; `None` is a null value.
    ///
    /// ## Errors
    /// Returns [`SchemaError::UnknownField`] for names without a setter and
    /// [`SchemaError::InvalidField`] for values that do not parse. The
    /// start date cannot be nulled.
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidField {
            field: name.to_string(),
            reason,
        };
        let text = |value: Option<&str>| value.map_or(Patch::Clear, |v| Patch::Set(v.to_string()));

        Ok(match name {
            "dtstart" => {
                let text = value.ok_or_else(|| invalid("start date cannot be null".into()))?;
                Self::Start(Patch::Set(TemporalValue::parse_text(text)?))
            }
            "dtend" => Self::End(match value {
                None => Patch::Clear,
                Some(text) => Patch::Set(TemporalValue::parse_text(text)?),
            }),
            "duration" => Self::Duration(match value {
                None => Patch::Clear,
                Some(text) => {
                    Patch::Set(Duration::parse(text).map_err(|e| invalid(e.to_string()))?)
                }
            }),
            "anytime" => Self::AnyTime(match value {
                None => Patch::Clear,
                Some("1" | "true" | "TRUE") => Patch::Set(true),
                Some("0" | "false" | "FALSE") => Patch::Set(false),
                Some(other) => return Err(invalid(format!("not a flag: {other}"))),
            }),
            "location" => Self::Location(text(value)),
            "status" => Self::Status(text(value)),
            "title" => Self::Title(text(value)),
            "body" => Self::Body(text(value)),
            "reminderTime" => Self::ReminderTime(match value {
                None => Patch::Clear,
                Some(text) => {
                    let dt = ICalDateTime::parse(text, None)
                        .ok()
                        .filter(ICalDateTime::is_utc)
                        .map(|dt| dt.to_naive())
                        .ok_or_else(|| invalid(format!("not a UTC date-time: {text}")))?;
                    Patch::Set(dt.and_utc())
                }
            }),
            other => return Err(SchemaError::UnknownField(other.to_string())),
        })
    }

    /// Record field name this setter answers to.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "dtstart",
            Self::End(_) => "dtend",
            Self::Duration(_) => "duration",
            Self::AnyTime(_) => "anytime",
            Self::Location(_) => "location",
            Self::Status(_) => "status",
            Self::Title(_) => "title",
            Self::Body(_) => "body",
            Self::ReminderTime(_) => "reminderTime",
        }
    }

    pub fn apply(self, target: &mut Modification) {
        match self {
            Self::Start(patch) => target.start = patch,
            Self::End(patch) => target.end = patch.map(EventEnd::End),
            Self::Duration(patch) => target.end = patch.map(EventEnd::Duration),
            Self::AnyTime(patch) => target.any_time = patch,
            Self::Location(patch) => target.location = patch,
            Self::Status(patch) => target.status = patch,
            Self::Title(patch) => target.summary = patch,
            Self::Body(patch) => target.description = patch,
            Self::ReminderTime(patch) => target.reminder = patch.map(AlarmTrigger::Absolute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn rid() -> TemporalValue {
        TemporalValue::zoned(
            NaiveDate::from_ymd_opt(2007, 2, 12)
                .unwrap()
                .and_hms_opt(7, 45, 0)
                .unwrap(),
            "America/Chicago",
        )
    }

    #[test]
    fn missing_and_null_are_distinct() {
        let master = Some("Weekly sync".to_string());
        let inherit: Patch<String> = Patch::Inherit;
        let clear: Patch<String> = Patch::Clear;
        let set = Patch::Set("Moved sync".to_string());

        assert_eq!(inherit.resolve(master.as_ref()), master.as_ref());
        assert_eq!(clear.resolve(master.as_ref()), None);
        assert_eq!(
            set.resolve(master.as_ref()).map(String::as_str),
            Some("Moved sync")
        );
    }

    #[test]
    fn fields_apply_by_name() {
        let mut modification = Modification::new("standup", rid());
        modification
            .apply_field("dtstart", Some(";VALUE=DATE-TIME;TZID=America/Chicago:20070213T074500"))
            .unwrap();
        modification.apply_field("location", None).unwrap();
        modification.apply_field("title", Some("Moved")).unwrap();
        modification.apply_field("duration", Some("PT30M")).unwrap();
        modification
            .apply_field("reminderTime", Some("20070213T133000Z"))
            .unwrap();

        assert!(matches!(&modification.start, Patch::Set(v) if v.local().date() == NaiveDate::from_ymd_opt(2007, 2, 13).unwrap()));
        assert_eq!(modification.location, Patch::Clear);
        assert_eq!(modification.summary, Patch::Set("Moved".into()));
        assert!(matches!(modification.end, Patch::Set(EventEnd::Duration(_))));
        assert_eq!(
            modification.reminder,
            Patch::Set(AlarmTrigger::Absolute(
                Utc.with_ymd_and_hms(2007, 2, 13, 13, 30, 0).unwrap()
            ))
        );
        assert!(modification.description.is_inherit());
    }

    #[test]
    fn unknown_and_invalid_fields_are_rejected() {
        assert!(matches!(
            ModificationField::parse("triageStatus", Some("NOW")),
            Err(SchemaError::UnknownField(name)) if name == "triageStatus"
        ));
        assert!(matches!(
            ModificationField::parse("dtstart", None),
            Err(SchemaError::InvalidField { .. })
        ));
        assert!(matches!(
            ModificationField::parse("anytime", Some("maybe")),
            Err(SchemaError::InvalidField { .. })
        ));
        assert!(matches!(
            ModificationField::parse("dtend", Some("20070213T074500")),
            Err(SchemaError::Temporal(_))
        ));
        assert!(matches!(
            ModificationField::parse("reminderTime", Some("20070213T133000")),
            Err(SchemaError::InvalidField { .. })
        ));
    }

    #[test]
    fn field_names_round_trip() {
        for (name, value) in [
            ("dtend", Some(";VALUE=DATE:20070213")),
            ("anytime", Some("1")),
            ("status", Some("CONFIRMED")),
            ("body", None),
        ] {
            assert_eq!(ModificationField::parse(name, value).unwrap().name(), name);
        }
    }

    #[test]
    fn reminder_inherits_alarm_fields() {
        let master = DisplayAlarm::new(AlarmTrigger::Absolute(
            Utc.with_ymd_and_hms(2007, 2, 12, 13, 30, 0).unwrap(),
        ))
        .with_description("Standup soon");
        let moved = Utc.with_ymd_and_hms(2007, 2, 13, 13, 30, 0).unwrap();

        let modification = Modification::new("standup", rid())
            .with(ModificationField::ReminderTime(Patch::Set(moved)));
        let alarm = modification.effective_alarm(Some(&master)).unwrap();
        assert_eq!(alarm.trigger, AlarmTrigger::Absolute(moved));
        assert_eq!(alarm.description.as_deref(), Some("Standup soon"));
        // the master is untouched
        assert_ne!(master.trigger, AlarmTrigger::Absolute(moved));

        let cleared = Modification::new("standup", rid())
            .with(ModificationField::ReminderTime(Patch::Clear));
        assert!(cleared.effective_alarm(Some(&master)).is_none());
        assert!(Modification::new("standup", rid())
            .effective_alarm(None)
            .is_none());
    }

    #[test]
    fn reads_override_components() {
        let component = Component::event()
            .with_property(cosmo_rfc::rfc::ical::core::Property::text(names::UID, "standup"))
            .with_property(rid().to_property(names::RECURRENCE_ID))
            .with_property(
                TemporalValue::parse_text(";VALUE=DATE-TIME;TZID=America/Chicago:20070213T074500")
                    .unwrap()
                    .to_property(names::DTSTART),
            )
            .with_property(cosmo_rfc::rfc::ical::core::Property::text(names::SUMMARY, "Moved"));

        let modification = Modification::from_component(&component).unwrap();
        assert_eq!(modification.master_uid, "standup");
        assert_eq!(modification.recurrence_id, rid());
        assert!(matches!(modification.start, Patch::Set(_)));
        assert_eq!(modification.summary, Patch::Set("Moved".into()));
        assert!(modification.location.is_inherit());
        assert!(modification.end.is_inherit());
        assert!(!modification.deleted);

        assert!(matches!(
            Modification::from_component(&Component::event().with_property(
                cosmo_rfc::rfc::ical::core::Property::text(names::UID, "standup")
            )),
            Err(SchemaError::MissingProperty("RECURRENCE-ID"))
        ));
    }
}
