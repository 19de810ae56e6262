//! Offset rules for zones defined inline by a VTIMEZONE (RFC 5545 §3.6.5).

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};

use crate::rfc::ical::core::{
    Component, ComponentKind, Property, Value, names, parse_compact_datetime,
};

/// Error raised while reading a VTIMEZONE definition.
#[derive(Debug, thiserror::Error)]
pub enum VTimezoneError {
    #[error("VTIMEZONE has no TZID")]
    MissingTzid,

    #[error("Component is not a VTIMEZONE: {0}")]
    NotATimezone(String),

    #[error("VTIMEZONE {0} has no STANDARD or DAYLIGHT observance")]
    NoObservances(String),

    #[error("{1} observance is missing {0}")]
    MissingProperty(&'static str, &'static str),

    #[error("Invalid {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Signed distance from UTC, east positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UtcOffset {
    pub seconds: i32,
}

impl UtcOffset {
    #[must_use]
    pub const fn new(hours: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    #[must_use]
    pub fn as_delta(self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.seconds))
    }

    /// ## Summary
    /// Reads the `(+|-)HHMM[SS]` form used by TZOFFSETFROM and TZOFFSETTO.
    ///
    /// ## Errors
    /// Returns [`VTimezoneError::InvalidValue`] for anything else.
    pub fn parse(text: &str) -> Result<Self, VTimezoneError> {
        let text = text.trim();
        let invalid = || VTimezoneError::InvalidValue("UTC offset", text.to_string());

        let (sign, digits) = match text.as_bytes().first() {
            Some(b'+') => (1, &text[1..]),
            Some(b'-') => (-1, &text[1..]),
            _ => return Err(invalid()),
        };
        if !(digits.len() == 4 || digits.len() == 6) || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| -> Result<i32, VTimezoneError> {
            digits
                .get(range)
                .and_then(|part| part.parse().ok())
                .ok_or_else(invalid)
        };
        let hours = field(0..2)?;
        let minutes = field(2..4)?;
        let seconds = if digits.len() == 6 { field(4..6)? } else { 0 };

        Ok(Self::new(sign * hours, sign * minutes, sign * seconds))
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        let total = self.seconds.abs();
        let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
        if seconds == 0 {
            write!(f, "{sign}{hours:02}{minutes:02}")
        } else {
            write!(f, "{sign}{hours:02}{minutes:02}{seconds:02}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

impl ObservanceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

/// One STANDARD or DAYLIGHT block: the offset that starts at `onset`
/// and at each later transition its rule or RDATEs produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Observance {
    pub kind: ObservanceKind,
    pub offset_from: UtcOffset,
    pub offset_to: UtcOffset,
    /// Local wall time of the first transition.
    pub onset: NaiveDateTime,
    pub rule: Option<AnnualRule>,
    pub rdates: Vec<NaiveDateTime>,
    pub tzname: Option<String>,
}

/// The yearly `BYMONTH` + `BYDAY` shape every published zone uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnualRule {
    pub month: u32,
    pub weekday: Weekday,
    /// 1-based from the start of the month, or negative from its end.
    pub ordinal: i32,
    pub until: Option<NaiveDateTime>,
}

impl AnnualRule {
    /// Reads an RRULE value. Rules outside the yearly weekday shape
    /// return `None` and the observance falls back to its onset.
    #[must_use]
    pub fn parse(rule: &str) -> Option<Self> {
        let mut freq = None;
        let mut month = None;
        let mut byday = None;
        let mut until = None;

        for part in rule.split(';') {
            let (key, value) = part.split_once('=')?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => freq = Some(value.to_ascii_uppercase()),
                "BYMONTH" => month = value.parse::<u32>().ok(),
                "BYDAY" => byday = parse_byday(value),
                "UNTIL" => {
                    let trimmed = value.trim_end_matches(['Z', 'z']);
                    until = parse_compact_datetime(trimmed);
                }
                _ => {}
            }
        }

        if freq.as_deref() != Some("YEARLY") {
            return None;
        }
        let (ordinal, weekday) = byday?;
        Some(Self {
            month: month?,
            weekday,
            ordinal,
            until,
        })
    }

    fn occurrence_in(&self, year: i32, time: NaiveTime) -> Option<NaiveDateTime> {
        nth_weekday_of_month(year, self.month, self.weekday, self.ordinal)
            .map(|date| date.and_time(time))
    }
}

/// A zone whose transitions come from an inline definition rather than
/// the IANA database.
#[derive(Debug, Clone, PartialEq)]
pub struct VTimezone {
    pub tzid: String,
    pub observances: Vec<Observance>,
}

impl VTimezone {
    /// A zone with one offset for all time.
    #[must_use]
    pub fn fixed(tzid: impl Into<String>, offset: UtcOffset) -> Self {
        Self {
            tzid: tzid.into(),
            observances: vec![Observance {
                kind: ObservanceKind::Standard,
                offset_from: offset,
                offset_to: offset,
                onset: NaiveDateTime::default(),
                rule: None,
                rdates: Vec::new(),
                tzname: None,
            }],
        }
    }

    /// ## Summary
    /// Reads a VTIMEZONE component and its observances.
    ///
    /// ## Errors
    /// Fails when TZID is absent, when there are no observances, or when
    /// an observance lacks DTSTART or one of its offsets.
    pub fn parse(component: &Component) -> Result<Self, VTimezoneError> {
        if component.kind != Some(ComponentKind::Timezone) {
            return Err(VTimezoneError::NotATimezone(component.name.clone()));
        }

        let tzid = component
            .get_property(names::TZID)
            .and_then(Property::as_text)
            .ok_or(VTimezoneError::MissingTzid)?
            .to_string();

        let observances = component
            .children
            .iter()
            .filter_map(|child| match child.kind {
                Some(ComponentKind::Standard) => Some((child, ObservanceKind::Standard)),
                Some(ComponentKind::Daylight) => Some((child, ObservanceKind::Daylight)),
                _ => None,
            })
            .map(|(child, kind)| parse_observance(child, kind))
            .collect::<Result<Vec<_>, _>>()?;

        if observances.is_empty() {
            return Err(VTimezoneError::NoObservances(tzid));
        }

        tracing::trace!(tzid = %tzid, observances = observances.len(), "Parsed VTIMEZONE");
        Ok(Self { tzid, observances })
    }

    /// ## Summary
    /// Offset in force at a local wall time.
    ///
    /// Before the earliest onset the earliest observance's `offset_from`
    /// applies.
    #[must_use]
    pub fn offset_at(&self, local: NaiveDateTime) -> UtcOffset {
        self.latest_local(local)
            .map_or_else(|| self.initial_offset(), |(_, obs)| obs.offset_to)
    }

    /// Local wall time to UTC.
    ///
    /// Transitions are written in the offset before them, so the repeated
    /// hour of a backward jump lies before the transition and is read with
    /// the earlier offset. A wall time inside a forward gap is read with
    /// the offset that applied before the gap, which moves it past the
    /// transition.
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        let offset = match self.latest_local(local) {
            Some((at, obs)) => {
                let jump = obs.offset_to.as_delta() - obs.offset_from.as_delta();
                if jump > TimeDelta::zero() && local < at + jump {
                    obs.offset_from
                } else {
                    obs.offset_to
                }
            }
            None => self.initial_offset(),
        };
        local - offset.as_delta()
    }

    /// UTC to local wall time.
    #[must_use]
    pub fn from_utc(&self, utc: NaiveDateTime) -> NaiveDateTime {
        let offset = self
            .observances
            .iter()
            .filter_map(|obs| {
                // transitions are written in the pre-transition offset
                let shift = obs.offset_from.as_delta();
                latest_transition(obs, utc + shift).map(|at| (at - shift, obs.offset_to))
            })
            .max_by_key(|(instant, _)| *instant)
            .map_or_else(|| self.initial_offset(), |(_, offset)| offset);
        utc + offset.as_delta()
    }

    fn latest_local(&self, local: NaiveDateTime) -> Option<(NaiveDateTime, &Observance)> {
        self.observances
            .iter()
            .filter_map(|obs| latest_transition(obs, local).map(|at| (at, obs)))
            .max_by_key(|(at, _)| *at)
    }

    fn initial_offset(&self) -> UtcOffset {
        self.observances
            .iter()
            .min_by_key(|obs| obs.onset)
            .map_or_else(UtcOffset::default, |obs| obs.offset_from)
    }
}

fn parse_observance(
    component: &Component,
    kind: ObservanceKind,
) -> Result<Observance, VTimezoneError> {
    let label = kind.as_str();

    let onset_value = component
        .get_property(names::DTSTART)
        .and_then(Property::as_datetime)
        .ok_or(VTimezoneError::MissingProperty(names::DTSTART, label))?;
    let onset = onset_value.to_naive();

    let offset = |name: &'static str| -> Result<UtcOffset, VTimezoneError> {
        let prop = component
            .get_property(name)
            .ok_or(VTimezoneError::MissingProperty(name, label))?;
        UtcOffset::parse(&prop.raw_value)
    };
    let offset_from = offset(names::TZOFFSETFROM)?;
    let offset_to = offset(names::TZOFFSETTO)?;

    let rule = component
        .get_property(names::RRULE)
        .and_then(|prop| AnnualRule::parse(&prop.raw_value));

    let rdates = component
        .get_properties(names::RDATE)
        .into_iter()
        .flat_map(|prop| match &prop.value {
            Value::DateTime(dt) => vec![dt.clone()],
            Value::DateTimeList(list) => list.clone(),
            _ => Vec::new(),
        })
        .map(|dt| dt.to_naive())
        .collect();

    let tzname = component
        .get_property(names::TZNAME)
        .and_then(Property::as_text)
        .map(str::to_owned);

    Ok(Observance {
        kind,
        offset_from,
        offset_to,
        onset,
        rule,
        rdates,
        tzname,
    })
}

/// Most recent transition of `obs` at or before `local`.
fn latest_transition(obs: &Observance, local: NaiveDateTime) -> Option<NaiveDateTime> {
    if local < obs.onset {
        return None;
    }

    let from_rdates = obs.rdates.iter().copied().filter(|at| *at <= local).max();

    let from_rule = obs.rule.and_then(|rule| {
        let bound = rule.until.map_or(local, |until| until.min(local));
        let time = obs.onset.time();
        (obs.onset.year()..=bound.year())
            .rev()
            .filter_map(|year| rule.occurrence_in(year, time))
            .find(|at| *at <= bound && *at >= obs.onset)
    });

    [Some(obs.onset), from_rdates, from_rule]
        .into_iter()
        .flatten()
        .max()
}

/// Reads `1SU`, `-1SU`, `+2MO`. A bare weekday carries ordinal 0.
fn parse_byday(text: &str) -> Option<(i32, Weekday)> {
    let text = text.trim();
    let split = text.len().checked_sub(2)?;
    let (ordinal, day) = (text.get(..split)?, text.get(split..)?);

    let ordinal = if ordinal.is_empty() {
        0
    } else {
        ordinal.trim_start_matches('+').parse().ok()?
    };
    let weekday = match day.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    };
    Some((ordinal, weekday))
}

/// The `ordinal`-th `weekday` of a month; negative counts from the end.
fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, ordinal: i32) -> Option<NaiveDate> {
    let count = u8::try_from(ordinal.unsigned_abs()).ok()?;
    if count == 0 {
        return None;
    }
    if ordinal > 0 {
        return NaiveDate::from_weekday_of_month_opt(year, month, weekday, count);
    }

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    let date = last - TimeDelta::days(i64::from(back) + 7 * (i64::from(count) - 1));
    (date.month() == month).then_some(date)
}
