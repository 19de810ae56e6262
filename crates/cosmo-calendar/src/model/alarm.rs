//! Display reminders attached to events.

use chrono::{DateTime, Utc};

use cosmo_rfc::rfc::ical::core::{
    Component, DateTime as ICalDateTime, Duration, Parameter, Property, Value, names,
};

use crate::error::SchemaError;

const ACTION_DISPLAY: &str = "DISPLAY";

/// Which end of the event a relative trigger counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmRelated {
    #[default]
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlarmTrigger {
    Relative {
        offset: Duration,
        related: AlarmRelated,
    },
    Absolute(DateTime<Utc>),
}

impl AlarmTrigger {
    /// First firing time for an event occupying `[start, end)`, or `None`
    /// when the offset leaves the representable range.
    #[must_use]
    pub fn fire_time(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Absolute(at) => Some(*at),
            Self::Relative {
                offset,
                related: AlarmRelated::Start,
            } => start.checked_add_signed(offset.to_time_delta()),
            Self::Relative {
                offset,
                related: AlarmRelated::End,
            } => end.checked_add_signed(offset.to_time_delta()),
        }
    }

    fn to_property(&self) -> Property {
        match self {
            Self::Absolute(at) => Property::datetime(names::TRIGGER, ICalDateTime::utc(at.naive_utc()))
                .with_param(Parameter::value_type("DATE-TIME")),
            Self::Relative { offset, related } => {
                let prop = Property::duration(names::TRIGGER, *offset);
                match related {
                    AlarmRelated::Start => prop,
                    AlarmRelated::End => prop.with_param(Parameter::related("END")),
                }
            }
        }
    }

    /// ## Summary
    /// Reads a TRIGGER property.
    ///
    /// ## Errors
    /// Returns [`SchemaError::InvalidField`] when the value is neither a
    /// duration nor a UTC date-time.
    pub fn from_property(prop: &Property) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidField {
            field: names::TRIGGER.to_string(),
            reason: format!("{reason}: {}", prop.raw_value),
        };

        let absolute = |dt: &ICalDateTime| {
            if !dt.is_utc() {
                return Err(invalid("absolute trigger must be UTC"));
            }
            Ok(Self::Absolute(dt.to_naive().and_utc()))
        };

        let related = if prop
            .get_param("RELATED")
            .is_some_and(|p| p.has_value("END"))
        {
            AlarmRelated::End
        } else {
            AlarmRelated::Start
        };

        match &prop.value {
            Value::Duration(offset) => Ok(Self::Relative {
                offset: *offset,
                related,
            }),
            Value::DateTime(dt) => absolute(dt),
            _ if prop.get_param("VALUE").is_some_and(|p| p.has_value("DATE-TIME")) => {
                let dt = ICalDateTime::parse(&prop.raw_value, None)
                    .map_err(|_e| invalid("bad date-time"))?;
                absolute(&dt)
            }
            _ => Duration::parse(&prop.raw_value)
                .map(|offset| Self::Relative { offset, related })
                .map_err(|_e| invalid("bad duration")),
        }
    }
}

/// A DISPLAY reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayAlarm {
    pub trigger: AlarmTrigger,
    pub description: Option<String>,
    /// Additional repetitions after the first firing.
    pub repeat: u32,
    /// Gap between repetitions.
    pub duration: Option<Duration>,
}

impl DisplayAlarm {
    #[must_use]
    pub fn new(trigger: AlarmTrigger) -> Self {
        Self {
            trigger,
            description: None,
            repeat: 0,
            duration: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, repeat: u32, every: Duration) -> Self {
        self.repeat = repeat;
        self.duration = Some(every);
        self
    }

    /// Every firing time, the first one included.
    #[must_use]
    pub fn fire_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let Some(first) = self.trigger.fire_time(start, end) else {
            return Vec::new();
        };
        let step = self.duration.map(|d| d.to_time_delta()).unwrap_or_default();
        let mut times = vec![first];
        if step > chrono::TimeDelta::zero() {
            let mut at = first;
            for _ in 0..self.repeat {
                let Some(next) = at.checked_add_signed(step) else {
                    break;
                };
                at = next;
                times.push(at);
            }
        }
        times
    }

    #[must_use]
    pub fn to_component(&self) -> Component {
        let mut alarm = Component::alarm()
            .with_property(Property::text(names::ACTION, ACTION_DISPLAY))
            .with_property(self.trigger.to_property());
        if let Some(description) = &self.description {
            alarm.add_property(Property::text(names::DESCRIPTION, description));
        }
        if let Some(duration) = self.duration
            && self.repeat > 0
        {
            alarm.add_property(Property::integer(
                names::REPEAT,
                i32::try_from(self.repeat).unwrap_or(i32::MAX),
            ));
            alarm.add_property(Property::duration(names::DURATION, duration));
        }
        alarm
    }

    /// ## Summary
    /// Reads a VALARM component. Only DISPLAY alarms are modelled.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when the component is not a DISPLAY alarm
    /// or its trigger cannot be read.
    pub fn from_component(component: &Component) -> Result<Self, SchemaError> {
        let action = component
            .get_property(names::ACTION)
            .and_then(Property::as_text)
            .ok_or(SchemaError::MissingProperty(names::ACTION))?;
        if !action.eq_ignore_ascii_case(ACTION_DISPLAY) {
            return Err(SchemaError::InvalidField {
                field: names::ACTION.to_string(),
                reason: format!("unsupported alarm action {action}"),
            });
        }

        let trigger = component
            .get_property(names::TRIGGER)
            .ok_or(SchemaError::MissingProperty(names::TRIGGER))
            .and_then(AlarmTrigger::from_property)?;

        let repeat = component
            .get_property(names::REPEAT)
            .and_then(Property::as_integer)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or_default();

        Ok(Self {
            trigger,
            description: component
                .get_property(names::DESCRIPTION)
                .and_then(Property::as_text)
                .map(str::to_string),
            repeat,
            duration: component
                .get_property(names::DURATION)
                .and_then(Property::as_duration)
                .copied(),
        })
    }
}
