//! Date and date-time values carrying an explicit reference frame.
//!
//! A [`TemporalValue`] keeps the wall-clock reading it was written with and
//! says how that reading becomes an instant: it is UTC, it belongs to a named
//! zone, or it floats and takes whatever zone the caller supplies.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use cosmo_core::constants::PARAM_X_OSAF_ANYTIME;
use cosmo_rfc::rfc::ical::core::{
    Date, DateTime as ICalDateTime, DateTimeForm, Parameter, Property, Value,
};
use cosmo_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

use crate::error::TemporalError;

const VALUE_DATE: &str = "DATE";
const VALUE_DATE_TIME: &str = "DATE-TIME";
const VALUE_TRUE: &str = "TRUE";

/// How a wall-clock reading maps onto the time line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimeReference {
    Floating,
    Utc,
    Zoned(String),
}

/// Zones available while turning values into instants.
///
/// `floating` is the zone picked for floating values by the timezone
/// policy. When it is `None`, floating values have no instant.
#[derive(Debug, Clone, Copy)]
pub struct ZoneContext<'a> {
    resolver: &'a TimeZoneResolver,
    floating: Option<&'a Zone>,
}

impl<'a> ZoneContext<'a> {
    #[must_use]
    pub fn new(resolver: &'a TimeZoneResolver) -> Self {
        Self {
            resolver,
            floating: None,
        }
    }

    #[must_use]
    pub fn with_floating(mut self, zone: Option<&'a Zone>) -> Self {
        self.floating = zone;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &'a TimeZoneResolver {
        self.resolver
    }

    #[must_use]
    pub fn floating_zone(&self) -> Option<&'a Zone> {
        self.floating
    }
}

/// A single point in time: a date or a date-time, with its frame.
///
/// Values are immutable; attaching a zone or flag yields a new value.
/// Structural equality compares the written form. Use
/// [`TemporalValue::cmp_instant`] to compare instants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemporalValue {
    local: NaiveDateTime,
    date_only: bool,
    reference: TimeReference,
    any_time: bool,
}

impl TemporalValue {
    /// A floating all-day value.
    #[must_use]
    pub fn date(date: NaiveDate) -> Self {
        Self {
            local: date.and_time(NaiveTime::MIN),
            date_only: true,
            reference: TimeReference::Floating,
            any_time: false,
        }
    }

    #[must_use]
    pub fn floating(local: NaiveDateTime) -> Self {
        Self {
            local,
            date_only: false,
            reference: TimeReference::Floating,
            any_time: false,
        }
    }

    #[must_use]
    pub fn utc(local: NaiveDateTime) -> Self {
        Self {
            reference: TimeReference::Utc,
            ..Self::floating(local)
        }
    }

    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self::utc(instant.naive_utc())
    }

    #[must_use]
    pub fn zoned(local: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self {
            reference: TimeReference::Zoned(tzid.into()),
            ..Self::floating(local)
        }
    }

    #[must_use]
    pub fn with_any_time(mut self, any_time: bool) -> Self {
        self.any_time = any_time;
        self
    }

    /// Attaches a zone, or makes the value floating when `tzid` is `None`.
    #[must_use]
    pub fn with_timezone(mut self, tzid: Option<String>) -> Self {
        self.reference = tzid.map_or(TimeReference::Floating, TimeReference::Zoned);
        self
    }

    /// Same frame and flags, different wall-clock reading.
    #[must_use]
    pub fn with_local(&self, local: NaiveDateTime) -> Self {
        Self {
            local,
            ..self.clone()
        }
    }

    /// ## Summary
    /// The same frame, moved by `delta` on the wall clock.
    ///
    /// ## Errors
    /// Returns [`TemporalError::OutOfRange`] when the result is not a
    /// representable date-time.
    pub fn shifted(&self, delta: TimeDelta) -> Result<Self, TemporalError> {
        self.local
            .checked_add_signed(delta)
            .map(|local| self.with_local(local))
            .ok_or_else(|| TemporalError::OutOfRange(format!("{self} shifted by {delta}")))
    }

    #[must_use]
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    #[must_use]
    pub fn date_value(&self) -> NaiveDate {
        self.local.date()
    }

    #[must_use]
    pub fn is_date_only(&self) -> bool {
        self.date_only
    }

    #[must_use]
    pub fn is_any_time(&self) -> bool {
        self.any_time
    }

    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.reference == TimeReference::Floating
    }

    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.reference == TimeReference::Utc
    }

    #[must_use]
    pub fn timezone_id(&self) -> Option<&str> {
        match &self.reference {
            TimeReference::Zoned(tzid) => Some(tzid),
            _ => None,
        }
    }

    #[must_use]
    pub fn reference(&self) -> &TimeReference {
        &self.reference
    }

    /// ## Summary
    /// Zone this value's wall-clock reading belongs to.
    ///
    /// A TZID that does not resolve is read as UTC.
    ///
    /// ## Errors
    /// Returns [`TemporalError::FloatingWithoutZone`] for a floating value
    /// when the context has no floating zone.
    pub fn zone(&self, ctx: &ZoneContext<'_>) -> Result<Zone, TemporalError> {
        match &self.reference {
            TimeReference::Utc => Ok(Zone::Utc),
            TimeReference::Zoned(tzid) => Ok(ctx.resolver().resolve(tzid).unwrap_or_else(|error| {
                tracing::debug!(%tzid, %error, "Unresolvable TZID read as UTC");
                Zone::Utc
            })),
            TimeReference::Floating => ctx
                .floating_zone()
                .cloned()
                .ok_or_else(|| TemporalError::FloatingWithoutZone(self.to_string())),
        }
    }

    /// ## Summary
    /// Instant of the wall-clock reading, ignoring the any-time flag.
    ///
    /// ## Errors
    /// Returns [`TemporalError::FloatingWithoutZone`] when the value floats
    /// and no zone is available.
    pub fn position(&self, ctx: &ZoneContext<'_>) -> Result<DateTime<Utc>, TemporalError> {
        Ok(self.zone(ctx)?.to_utc(self.local))
    }

    /// ## Summary
    /// Instant this value stands for.
    ///
    /// ## Errors
    /// Any-time values have no instant and return [`TemporalError::AnyTime`].
    /// Floating values need a zone in `ctx`.
    pub fn utc_instant(&self, ctx: &ZoneContext<'_>) -> Result<DateTime<Utc>, TemporalError> {
        if self.any_time {
            return Err(TemporalError::AnyTime);
        }
        self.position(ctx)
    }

    /// ## Summary
    /// The same instant as a UTC date-time value.
    ///
    /// ## Errors
    /// As [`TemporalValue::utc_instant`].
    pub fn to_utc(&self, ctx: &ZoneContext<'_>) -> Result<Self, TemporalError> {
        Ok(Self::from_instant(self.utc_instant(ctx)?))
    }

    /// ## Summary
    /// Orders two values by instant.
    ///
    /// ## Errors
    /// As [`TemporalValue::utc_instant`], for either operand.
    pub fn cmp_instant(
        &self,
        other: &Self,
        ctx: &ZoneContext<'_>,
    ) -> Result<Ordering, TemporalError> {
        Ok(self.utc_instant(ctx)?.cmp(&other.utc_instant(ctx)?))
    }

    /// ## Summary
    /// Wall-clock reading of this value in `frame`'s reference frame.
    ///
    /// Values already in the same frame are returned unchanged, so floating
    /// values compare without any zone.
    ///
    /// ## Errors
    /// Returns [`TemporalError::FloatingWithoutZone`] when a conversion is
    /// needed and either side floats without a zone.
    pub fn local_in_frame_of(
        &self,
        frame: &Self,
        ctx: &ZoneContext<'_>,
    ) -> Result<NaiveDateTime, TemporalError> {
        if self.reference == frame.reference {
            return Ok(self.local);
        }
        let instant = self.position(ctx)?;
        Ok(frame.zone(ctx)?.from_utc(instant))
    }

    /// ## Summary
    /// Parses the textual form `;VALUE=DATE-TIME;TZID=America/Chicago:20070212T074500`.
    ///
    /// ## Errors
    /// Returns a [`TemporalError`] when the `VALUE` parameter is missing or
    /// unknown, when the text holds more than one value, or when the value
    /// does not parse.
    pub fn parse_text(text: &str) -> Result<Self, TemporalError> {
        let mut values = Self::parse_text_list(text)?;
        match (values.pop(), values.is_empty()) {
            (Some(value), true) => Ok(value),
            _ => Err(TemporalError::Malformed(format!(
                "expected a single value in {text}"
            ))),
        }
    }

    /// ## Summary
    /// Parses the textual form with a comma-separated value list, as used
    /// for recurrence and exception dates.
    ///
    /// ## Errors
    /// As [`TemporalValue::parse_text`].
    pub fn parse_text_list(text: &str) -> Result<Vec<Self>, TemporalError> {
        let (params, body) = text
            .split_once(':')
            .ok_or_else(|| TemporalError::Malformed(text.to_string()))?;

        let mut date_only = None;
        let mut tzid = None;
        let mut any_time = false;
        for param in params.split(';').filter(|p| !p.is_empty()) {
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| TemporalError::Malformed(text.to_string()))?;
            match name.to_ascii_uppercase().as_str() {
                "VALUE" => date_only = Some(parse_value_type(value)?),
                "TZID" => tzid = Some(value.to_string()),
                name if name == PARAM_X_OSAF_ANYTIME => {
                    any_time = value.eq_ignore_ascii_case(VALUE_TRUE);
                }
                name => tracing::warn!(param = %name, "Skipping unknown parameter"),
            }
        }

        let date_only =
            date_only.ok_or_else(|| TemporalError::MissingValueType(text.to_string()))?;

        body.split(',')
            .map(|item| {
                parse_value(item, date_only, tzid.as_deref())
                    .map(|value| value.with_any_time(any_time))
            })
            .collect()
    }

    /// ## Summary
    /// Reads a DTSTART-like property.
    ///
    /// ## Errors
    /// Returns a [`TemporalError`] when the property holds something other
    /// than one date or date-time.
    pub fn from_property(prop: &Property) -> Result<Self, TemporalError> {
        let mut values = Self::from_property_list(prop)?;
        match (values.pop(), values.is_empty()) {
            (Some(value), true) => Ok(value),
            _ => Err(TemporalError::Malformed(format!(
                "{} must hold a single value",
                prop.name
            ))),
        }
    }

    /// ## Summary
    /// Reads an RDATE/EXDATE-like property holding one or more values.
    ///
    /// ## Errors
    /// Returns a [`TemporalError`] when a value does not parse or its type
    /// cannot be told from the property.
    pub fn from_property_list(prop: &Property) -> Result<Vec<Self>, TemporalError> {
        let any_time = prop
            .get_param(PARAM_X_OSAF_ANYTIME)
            .is_some_and(|p| p.has_value(VALUE_TRUE));
        let param_tzid = prop.get_param_value("TZID");

        let values = match &prop.value {
            Value::Date(date) => vec![from_ical_date(*date, param_tzid)],
            Value::DateList(dates) => dates
                .iter()
                .map(|date| from_ical_date(*date, param_tzid))
                .collect(),
            Value::DateTime(dt) => vec![from_ical_datetime(dt, param_tzid)],
            Value::DateTimeList(dts) => dts
                .iter()
                .map(|dt| from_ical_datetime(dt, param_tzid))
                .collect(),
            _ => {
                let date_only = match prop.get_param_value("VALUE") {
                    Some(value) => parse_value_type(value)?,
                    None => discover_value_type(&prop.raw_value)?,
                };
                prop.raw_value
                    .split(',')
                    .map(|item| parse_value(item, date_only, param_tzid))
                    .collect::<Result<_, _>>()?
            }
        };

        Ok(values
            .into_iter()
            .map(|value| value.with_any_time(any_time))
            .collect())
    }

    /// Renders the value as an iCalendar property named `name`.
    #[must_use]
    pub fn to_property(&self, name: &str) -> Property {
        let mut prop = if self.date_only {
            Property::date(name, Date::from_naive(self.local.date()))
        } else {
            Property::datetime(name, self.to_ical_datetime())
                .with_param(Parameter::value_type(VALUE_DATE_TIME))
        };
        if let (true, Some(tzid)) = (self.date_only, self.timezone_id()) {
            prop.set_param(Parameter::tzid(tzid));
        }
        if self.any_time {
            prop.set_param(Parameter::new(PARAM_X_OSAF_ANYTIME, VALUE_TRUE));
        }
        prop
    }

    fn to_ical_datetime(&self) -> ICalDateTime {
        match &self.reference {
            TimeReference::Floating => ICalDateTime::floating(self.local),
            TimeReference::Utc => ICalDateTime::utc(self.local),
            TimeReference::Zoned(tzid) => ICalDateTime::zoned(self.local, tzid.clone()),
        }
    }

    /// Value text without parameters, e.g. `20070212T074500Z`.
    #[must_use]
    pub fn value_text(&self) -> String {
        if self.date_only {
            self.local.format("%Y%m%d").to_string()
        } else if self.is_utc() {
            self.local.format("%Y%m%dT%H%M%SZ").to_string()
        } else {
            self.local.format("%Y%m%dT%H%M%S").to_string()
        }
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value_type = if self.date_only {
            VALUE_DATE
        } else {
            VALUE_DATE_TIME
        };
        write!(f, ";VALUE={value_type}")?;
        if let Some(tzid) = self.timezone_id() {
            write!(f, ";TZID={tzid}")?;
        }
        if self.any_time {
            write!(f, ";{PARAM_X_OSAF_ANYTIME}={VALUE_TRUE}")?;
        }
        write!(f, ":{}", self.value_text())
    }
}

/// `true` for DATE, `false` for DATE-TIME.
fn parse_value_type(value: &str) -> Result<bool, TemporalError> {
    if value.eq_ignore_ascii_case(VALUE_DATE) {
        Ok(true)
    } else if value.eq_ignore_ascii_case(VALUE_DATE_TIME) {
        Ok(false)
    } else {
        Err(TemporalError::BadValueType(value.to_string()))
    }
}

fn discover_value_type(raw: &str) -> Result<bool, TemporalError> {
    let first = raw.split(',').next().unwrap_or_default().trim();
    match first.len() {
        8 => Ok(true),
        15 | 16 if first.contains('T') => Ok(false),
        _ => Err(TemporalError::MissingValueType(raw.to_string())),
    }
}

fn parse_value(text: &str, date_only: bool, tzid: Option<&str>) -> Result<TemporalValue, TemporalError> {
    if date_only {
        let date = Date::parse(text).map_err(|_e| TemporalError::InvalidDate(text.to_string()))?;
        Ok(from_ical_date(date, tzid))
    } else {
        let dt = ICalDateTime::parse(text, tzid)
            .map_err(|_e| TemporalError::InvalidDateTime(text.to_string()))?;
        Ok(from_ical_datetime(&dt, None))
    }
}

fn from_ical_date(date: Date, tzid: Option<&str>) -> TemporalValue {
    TemporalValue::date(date.to_naive()).with_timezone(tzid.map(str::to_string))
}

/// A floating reading with a TZID parameter beside it is zoned.
fn from_ical_datetime(dt: &ICalDateTime, param_tzid: Option<&str>) -> TemporalValue {
    let local = dt.to_naive();
    match (&dt.form, param_tzid) {
        (DateTimeForm::Utc, _) => TemporalValue::utc(local),
        (DateTimeForm::Zoned { tzid }, _) => TemporalValue::zoned(local, tzid.clone()),
        (DateTimeForm::Floating, Some(tzid)) => TemporalValue::zoned(local, tzid),
        (DateTimeForm::Floating, None) => TemporalValue::floating(local),
    }
}
