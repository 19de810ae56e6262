//! `CALDAV:time-range` evaluation (RFC 4791 §9.9).

use chrono::{DateTime, TimeDelta, Utc};

use cosmo_rfc::rfc::dav::core::TimeRange;
use cosmo_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

use crate::error::RequestError;
use crate::model::{TemporalValue, ZoneContext};

/// A closed-open UTC interval `[start, end)`.
///
/// `context_zone` is the zone floating operands are read in. Without one,
/// floating operands never match.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRangePredicate {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    context_zone: Option<Zone>,
}

impl TimeRangePredicate {
    /// ## Summary
    /// Builds a predicate from two UTC bounds. `context_zone` is kept for
    /// the floating operands tested later.
    ///
    /// ## Errors
    /// Returns [`RequestError::InvalidTimeRange`] when a bound is not UTC
    /// or start is not before end, and [`RequestError::Temporal`] for an
    /// any-time bound.
    pub fn new(
        start: &TemporalValue,
        end: &TemporalValue,
        context_zone: Option<Zone>,
        resolver: &TimeZoneResolver,
    ) -> Result<Self, RequestError> {
        if let Some(bound) = [start, end].into_iter().find(|bound| !bound.is_utc()) {
            return Err(RequestError::InvalidTimeRange(format!("bound {bound} is not UTC")));
        }
        let ctx = ZoneContext::new(resolver).with_floating(context_zone.as_ref());
        let start_utc = start.utc_instant(&ctx)?;
        let end_utc = end.utc_instant(&ctx)?;
        if start_utc >= end_utc {
            return Err(RequestError::InvalidTimeRange(format!(
                "start {start_utc} is not before end {end_utc}"
            )));
        }
        Ok(Self {
            start: start_utc,
            end: end_utc,
            context_zone,
        })
    }

    /// Wraps an already validated UTC range.
    #[must_use]
    pub fn from_range(range: TimeRange, context_zone: Option<Zone>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            context_zone,
        }
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn context_zone(&self) -> Option<&Zone> {
        self.context_zone.as_ref()
    }

    #[must_use]
    pub fn as_time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Zones for reading operands against this predicate.
    #[must_use]
    pub fn zone_context<'a>(&'a self, resolver: &'a TimeZoneResolver) -> ZoneContext<'a> {
        ZoneContext::new(resolver).with_floating(self.context_zone.as_ref())
    }

    /// `start <= instant < end`.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// ## Summary
    /// Interval test on instants.
    ///
    /// Date-only values without a usable end last one day. Other values
    /// without a positive length are points.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>, date_only: bool) -> bool {
        let end = match end {
            Some(end) if end > start => Some(end),
            _ if date_only => start.checked_add_signed(TimeDelta::days(1)),
            _ => None,
        };
        match end {
            Some(end) => start < self.end && end > self.start,
            None => self.contains(start),
        }
    }

    /// ## Summary
    /// Tests an occurrence `[start, end)` against the interval.
    ///
    /// Any-time starts always match. A floating operand without a context
    /// zone does not match and is logged.
    #[must_use]
    pub fn matches(
        &self,
        start: &TemporalValue,
        end: Option<&TemporalValue>,
        resolver: &TimeZoneResolver,
    ) -> bool {
        if start.is_any_time() {
            return true;
        }
        let ctx = self.zone_context(resolver);
        let position = |value: &TemporalValue| {
            value
                .position(&ctx)
                .inspect_err(|error| {
                    tracing::warn!(value = %value, %error, "Operand cannot be placed in time");
                })
                .ok()
        };

        let Some(start_utc) = position(start) else {
            return false;
        };
        let end_utc = match end {
            Some(end) => match position(end) {
                Some(end_utc) => Some(end_utc),
                None => return false,
            },
            None => None,
        };
        self.overlaps(start_utc, end_utc, start.is_date_only())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2007, 2, d, h, 0, 0).unwrap()
    }

    fn local(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2007, 2, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn feb_12() -> TimeRangePredicate {
        TimeRangePredicate::from_range(TimeRange::new(utc(12, 0), utc(13, 0)).unwrap(), None)
    }

    #[test]
    fn interval_overlap() {
        let window = feb_12();
        assert!(window.overlaps(utc(11, 23), Some(utc(12, 1)), false));
        assert!(window.overlaps(utc(12, 23), Some(utc(13, 1)), false));
        assert!(!window.overlaps(utc(11, 22), Some(utc(12, 0)), false));
        assert!(!window.overlaps(utc(13, 0), Some(utc(13, 1)), false));
    }

    #[test]
    fn points_are_inclusive_at_start_only() {
        let window = feb_12();
        assert!(window.overlaps(utc(12, 0), None, false));
        assert!(window.overlaps(utc(12, 0), Some(utc(12, 0)), false));
        assert!(!window.overlaps(utc(13, 0), None, false));
    }

    #[test]
    fn dates_last_one_day() {
        let window = TimeRangePredicate::from_range(
            TimeRange::new(utc(12, 12), utc(12, 13)).unwrap(),
            None,
        );
        assert!(window.overlaps(utc(12, 0), None, true));
        assert!(!window.overlaps(utc(12, 0), None, false));
        assert!(!window.overlaps(utc(11, 0), None, true));
    }

    #[test_log::test]
    fn floating_operands_need_a_zone() {
        let resolver = TimeZoneResolver::new();
        let floating = TemporalValue::floating(local(12, 9));
        assert!(!feb_12().matches(&floating, None, &resolver));

        let chicago = resolver.resolve("America/Chicago").unwrap();
        let window = TimeRangePredicate::from_range(
            TimeRange::new(utc(12, 15), utc(12, 16)).unwrap(),
            Some(chicago),
        );
        assert!(window.matches(&floating, None, &resolver));
        assert!(!window.matches(&TemporalValue::floating(local(12, 15)), None, &resolver));
    }

    #[test]
    fn any_time_always_matches() {
        let resolver = TimeZoneResolver::new();
        let any_time = TemporalValue::date(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap())
            .with_any_time(true);
        assert!(feb_12().matches(&any_time, None, &resolver));
    }

    #[test]
    fn zoned_occurrences() {
        let resolver = TimeZoneResolver::new();
        let start = TemporalValue::zoned(local(11, 20), "America/Chicago");
        let end = start.shifted(TimeDelta::hours(1)).unwrap();
        // 02:00Z-03:00Z on the 12th
        assert!(feb_12().matches(&start, Some(&end), &resolver));
        let earlier = TemporalValue::zoned(local(11, 17), "America/Chicago");
        assert!(!feb_12().matches(&earlier, Some(&earlier.shifted(TimeDelta::hours(1)).unwrap()), &resolver));
    }

    #[test]
    fn construction_checks_bounds() {
        let resolver = TimeZoneResolver::new();
        let start = TemporalValue::utc(local(12, 0));
        let end = TemporalValue::utc(local(13, 0));
        let predicate = TimeRangePredicate::new(&start, &end, None, &resolver).unwrap();
        assert_eq!(predicate.as_time_range(), feb_12().as_time_range());

        assert!(matches!(
            TimeRangePredicate::new(&end, &start, None, &resolver),
            Err(RequestError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            TimeRangePredicate::new(&start, &start, None, &resolver),
            Err(RequestError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            TimeRangePredicate::new(&start.clone().with_any_time(true), &end, None, &resolver),
            Err(RequestError::Temporal(_))
        ));

        // zoned and floating bounds are refused even when a zone could place them
        let chicago = resolver.resolve("America/Chicago").unwrap();
        let floating = TemporalValue::floating(local(12, 0));
        let zoned = TemporalValue::zoned(local(12, 0), "America/Chicago");
        for bound in [&floating, &zoned] {
            assert!(matches!(
                TimeRangePredicate::new(bound, &end, Some(chicago.clone()), &resolver),
                Err(RequestError::InvalidTimeRange(_))
            ));
            assert!(matches!(
                TimeRangePredicate::new(&start, bound, None, &resolver),
                Err(RequestError::InvalidTimeRange(_))
            ));
        }

        let with_zone = TimeRangePredicate::new(&start, &end, Some(chicago), &resolver).unwrap();
        assert_eq!(with_zone.start(), utc(12, 0));
        assert_eq!(with_zone.context_zone().map(Zone::id), Some("America/Chicago"));
    }
}
