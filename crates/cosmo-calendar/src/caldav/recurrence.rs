//! Recurrence expansion of master entities.
//!
//! Rules are enumerated with `rrule` on the master's wall clock: the start
//! is handed to the rule engine as a UTC reading, so every generated value
//! is a local reading in the master's frame. Positions on the time line are
//! computed from the master's zone only when a window has to be tested.

use std::collections::HashSet;
use std::iter::Peekable;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};

use cosmo_rfc::rfc::ical::core::{Date, DateTime as ICalDateTime};
use cosmo_rfc::rfc::ical::expand::TimeZoneResolver;

use super::time_range::TimeRangePredicate;
use crate::error::{SchemaError, TemporalError};
use crate::model::{CalendarEntity, EventData, EventEnd, Occurrence, RecurrenceRule, TemporalValue, ZoneContext};

/// Consecutive excluded candidates after which enumeration gives up.
const MAX_SKIPPED: usize = 100_000;

type Starts<'p> = Peekable<Box<dyn Iterator<Item = NaiveDateTime> + 'p>>;

fn boxed<'p>(iter: impl Iterator<Item = NaiveDateTime> + 'p) -> Starts<'p> {
    let iter: Box<dyn Iterator<Item = NaiveDateTime> + 'p> = Box::new(iter);
    iter.peekable()
}

#[derive(Debug, Clone)]
struct CompiledRule {
    set: RRuleSet,
    /// Last local reading the rule may produce.
    until: Option<NaiveDateTime>,
}

impl CompiledRule {
    fn compile(
        rule: &RecurrenceRule,
        dt_start: NaiveDateTime,
        frame: &TemporalValue,
        ctx: &ZoneContext<'_>,
    ) -> Result<Self, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidRule {
            rule: rule.to_string(),
            reason,
        };

        let text = rule.as_str().trim();
        let text = text
            .strip_prefix("RRULE:")
            .or_else(|| text.strip_prefix("EXRULE:"))
            .unwrap_or(text);

        // UNTIL is applied on the local reading, so the rule engine never
        // sees it.
        let mut until_text = None;
        let parts: Vec<&str> = text
            .split(';')
            .filter(|part| match part.split_once('=') {
                Some((name, value)) if name.eq_ignore_ascii_case("UNTIL") => {
                    until_text = Some(value);
                    false
                }
                _ => !part.is_empty(),
            })
            .collect();

        let until = until_text
            .map(|value| parse_until(value, frame, ctx))
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;

        let set = parts
            .join(";")
            .parse::<RRule<Unvalidated>>()
            .map_err(|e| invalid(e.to_string()))?
            .build(dt_start.and_utc().with_timezone(&Tz::UTC))
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self { set, until })
    }

    fn starts(&self) -> Starts<'_> {
        let until = self.until;
        boxed(
            (&self.set)
                .into_iter()
                .map(|dt| dt.naive_utc())
                .take_while(move |start| until.is_none_or(|until| *start <= until)),
        )
    }
}

/// UNTIL as a local reading in `frame`. Dates include their whole day.
fn parse_until(
    value: &str,
    frame: &TemporalValue,
    ctx: &ZoneContext<'_>,
) -> Result<NaiveDateTime, TemporalError> {
    if value.len() == 8 {
        let date = Date::parse(value)
            .map(Date::to_naive)
            .map_err(|_e| TemporalError::InvalidDate(value.to_string()))?;
        return Ok(date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)));
    }

    let dt = ICalDateTime::parse(value, None)
        .map_err(|_e| TemporalError::InvalidDateTime(value.to_string()))?;
    let local = dt.to_naive();
    if !dt.is_utc() {
        return Ok(local);
    }
    Ok(TemporalValue::utc(local)
        .local_in_frame_of(frame, ctx)
        .unwrap_or_else(|error| {
            tracing::debug!(until = %value, %error, "UNTIL compared as a UTC reading");
            local
        }))
}

/// A master's recurrence set, compiled for enumeration.
///
/// Compiling validates every rule; enumeration itself cannot fail.
#[derive(Debug, Clone)]
pub struct RecurrencePlan {
    dt_start: NaiveDateTime,
    rules: Vec<CompiledRule>,
    dates: Vec<NaiveDateTime>,
    exception_rules: Vec<CompiledRule>,
    exception_dates: HashSet<NaiveDateTime>,
    /// Date-only exceptions against a date-time start remove whole days.
    exception_days: HashSet<NaiveDate>,
}

impl RecurrencePlan {
    /// ## Summary
    /// Compiles the recurrence set of `event`, converting every date into
    /// the frame of its start.
    ///
    /// ## Errors
    /// Returns [`SchemaError::InvalidRule`] for a rule the engine rejects
    /// and [`SchemaError::Temporal`] for a date that cannot be converted.
    pub fn compile(event: &EventData, ctx: &ZoneContext<'_>) -> Result<Self, SchemaError> {
        let frame = &event.start;
        let dt_start = frame.local();
        let recurrence = &event.recurrence;

        let compile = |rules: &[RecurrenceRule]| {
            rules
                .iter()
                .map(|rule| CompiledRule::compile(rule, dt_start, frame, ctx))
                .collect::<Result<Vec<_>, _>>()
        };

        let mut dates = recurrence
            .dates
            .iter()
            .map(|date| {
                if date.is_date_only() {
                    Ok(date.local())
                } else {
                    date.local_in_frame_of(frame, ctx)
                }
            })
            .collect::<Result<Vec<_>, TemporalError>>()?;
        dates.sort_unstable();
        dates.dedup();

        let mut exception_dates = HashSet::new();
        let mut exception_days = HashSet::new();
        for date in &recurrence.exception_dates {
            match (date.is_date_only(), frame.is_date_only()) {
                (true, false) => {
                    exception_days.insert(date.date_value());
                }
                (true, true) => {
                    exception_dates.insert(date.local());
                }
                (false, _) => {
                    exception_dates.insert(date.local_in_frame_of(frame, ctx)?);
                }
            }
        }

        Ok(Self {
            dt_start,
            rules: compile(&recurrence.rules)?,
            dates,
            exception_rules: compile(&recurrence.exception_rules)?,
            exception_dates,
            exception_days,
        })
    }

    /// Occurrence starts in ascending order, as local readings in the
    /// master's frame. The master's own start always comes first.
    #[must_use]
    pub fn starts(&self) -> OccurrenceStarts<'_> {
        let mut sources: Vec<Starts<'_>> = self.rules.iter().map(CompiledRule::starts).collect();
        sources.push(boxed(std::iter::once(self.dt_start)));
        sources.push(boxed(self.dates.iter().copied()));

        OccurrenceStarts {
            plan: self,
            sources,
            exclusions: self
                .exception_rules
                .iter()
                .map(CompiledRule::starts)
                .collect(),
            last: None,
        }
    }
}

/// Lazy merge of a plan's inclusion sources minus its exclusions.
pub struct OccurrenceStarts<'p> {
    plan: &'p RecurrencePlan,
    sources: Vec<Starts<'p>>,
    exclusions: Vec<Starts<'p>>,
    last: Option<NaiveDateTime>,
}

impl OccurrenceStarts<'_> {
    fn is_excluded(&mut self, start: NaiveDateTime) -> bool {
        if self.plan.exception_dates.contains(&start)
            || self.plan.exception_days.contains(&start.date())
        {
            return true;
        }
        self.exclusions.iter_mut().any(|rule| {
            while rule.next_if(|excluded| *excluded < start).is_some() {}
            rule.peek() == Some(&start)
        })
    }
}

impl Iterator for OccurrenceStarts<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let mut skipped = 0_usize;
        loop {
            let index = self
                .sources
                .iter_mut()
                .enumerate()
                .filter_map(|(index, source)| source.peek().map(|start| (index, *start)))
                .min_by_key(|(_, start)| *start)
                .map(|(index, _)| index)?;
            let start = self.sources.get_mut(index)?.next()?;

            if self.last.is_some_and(|last| start <= last) {
                continue;
            }
            self.last = Some(start);

            if !self.is_excluded(start) {
                return Some(start);
            }
            skipped += 1;
            if skipped >= MAX_SKIPPED {
                tracing::warn!(%start, "Recurrence excludes every candidate, stopping");
                return None;
            }
        }
    }
}

/// Expands masters into occurrences.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceExpander {
    max_instances: usize,
}

impl RecurrenceExpander {
    #[must_use]
    pub fn new(max_instances: u32) -> Self {
        Self {
            max_instances: usize::try_from(max_instances).unwrap_or(usize::MAX),
        }
    }

    /// Cap on instances per master when no window bounds the expansion.
    #[must_use]
    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// ## Summary
    /// Occurrences of `entity` that intersect `window`, in ascending order.
    ///
    /// A master without recurrence yields itself when it matches. Without a
    /// window every occurrence is produced, up to the instance cap. A
    /// master without timing yields itself unconditionally and is left to
    /// the component filter.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when a rule is malformed or the master's
    /// dates cannot be related to each other. The caller skips the entity.
    pub fn expand<'a>(
        &self,
        entity: &'a CalendarEntity,
        window: Option<&TimeRangePredicate>,
        resolver: &TimeZoneResolver,
    ) -> Result<Vec<Occurrence<'a>>, SchemaError> {
        let Some(event) = entity.event_data() else {
            return Ok(vec![Occurrence::single(entity)]);
        };
        let ctx = window.map_or_else(|| ZoneContext::new(resolver), |w| w.zone_context(resolver));
        let duration = event.duration(&ctx)?;

        if event.recurrence.is_empty() {
            let end = match &event.end {
                Some(EventEnd::End(end)) => Some(end.clone()),
                _ => duration.map(|d| event.start.shifted(d)).transpose()?,
            };
            let matched = window.is_none_or(|w| w.matches(&event.start, end.as_ref(), resolver));
            tracing::trace!(uid = %entity.uid, matched, "Single occurrence");
            return Ok(if matched {
                vec![Occurrence::single(entity).with_end(end)]
            } else {
                Vec::new()
            });
        }

        let plan = RecurrencePlan::compile(event, &ctx)?;
        let occurrence = |start: NaiveDateTime| -> Result<Occurrence<'a>, SchemaError> {
            let start = event.start.with_local(start);
            let end = duration.map(|d| start.shifted(d)).transpose()?;
            Ok(Occurrence::generated(entity, start, end))
        };

        let Some(window) = window else {
            let occurrences = plan
                .starts()
                .take(self.max_instances)
                .map(occurrence)
                .collect::<Result<Vec<_>, _>>()?;
            if occurrences.len() == self.max_instances {
                tracing::debug!(uid = %entity.uid, cap = self.max_instances, "Expansion capped");
            }
            return Ok(occurrences);
        };

        let zone = match event.start.zone(&ctx) {
            Ok(zone) => zone,
            Err(error) => {
                tracing::warn!(uid = %entity.uid, %error, "Floating master has no zone, not expanded");
                return Ok(Vec::new());
            }
        };
        let date_only = event.start.is_date_only();
        let occurrences: Vec<_> = plan
            .starts()
            .map(|start| (start, zone.to_utc(start)))
            .take_while(|(_, position)| *position < window.end())
            .filter(|(start, position)| {
                let end = duration
                    .and_then(|d| start.checked_add_signed(d))
                    .map(|end| zone.to_utc(end));
                window.overlaps(*position, end, date_only)
            })
            .map(|(start, _)| occurrence(start))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::trace!(
            uid = %entity.uid,
            count = occurrences.len(),
            window_start = %window.start(),
            window_end = %window.end(),
            "Expanded recurrence"
        );
        Ok(occurrences)
    }
}
