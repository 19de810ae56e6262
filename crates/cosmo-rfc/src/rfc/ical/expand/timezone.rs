//! Zone lookup and wall-clock conversion.
//!
//! ICU4X maps Windows zone names and IANA aliases onto canonical IANA
//! identifiers before `chrono-tz` is consulted.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;

use super::vtimezone::{UtcOffset, VTimezone, VTimezoneError};
use crate::rfc::ical::core::Component;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),
}

/// A resolved zone.
#[derive(Debug, Clone, PartialEq)]
pub enum Zone {
    Utc,
    Iana(Tz),
    /// Defined by a VTIMEZONE or registered as a fixed offset.
    Defined(Arc<VTimezone>),
}

impl Zone {
    /// Identifier the zone was resolved under.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Utc => "UTC",
            Self::Iana(tz) => tz.name(),
            Self::Defined(vtz) => &vtz.tzid,
        }
    }

    /// ## Summary
    /// Wall time in this zone to an absolute instant.
    ///
    /// Every wall time maps to exactly one instant. A wall time that
    /// falls in a forward gap is read with the offset in force before the
    /// gap; a repeated wall time takes its earlier instant.
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Self::Utc => local.and_utc(),
            Self::Defined(vtz) => vtz.to_utc(local).and_utc(),
            Self::Iana(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => {
                    let before = tz
                        .offset_from_utc_datetime(&(local - TimeDelta::days(1)))
                        .fix();
                    let utc = local - TimeDelta::seconds(i64::from(before.local_minus_utc()));
                    tracing::trace!(%local, zone = tz.name(), %utc, "Wall time falls in a DST gap");
                    utc.and_utc()
                }
            },
        }
    }

    /// Absolute instant to wall time in this zone.
    #[must_use]
    pub fn from_utc(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Utc => instant.naive_utc(),
            Self::Iana(tz) => instant.with_timezone(tz).naive_local(),
            Self::Defined(vtz) => vtz.from_utc(instant.naive_utc()),
        }
    }
}

/// Resolves TZIDs to zones.
///
/// Inline definitions registered on the resolver take precedence over the
/// IANA database.
#[derive(Debug, Clone, Default)]
pub struct TimeZoneResolver {
    defined: HashMap<String, Arc<VTimezone>>,
}

impl TimeZoneResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_vtimezone(&mut self, vtimezone: VTimezone) {
        tracing::debug!(tzid = %vtimezone.tzid, "Registered VTIMEZONE");
        self.defined
            .insert(vtimezone.tzid.clone(), Arc::new(vtimezone));
    }

    /// ## Summary
    /// Parses and registers a VTIMEZONE component.
    ///
    /// ## Errors
    /// Returns the parse error when the component is not a usable
    /// definition.
    pub fn register_component(&mut self, component: &Component) -> Result<(), VTimezoneError> {
        let vtimezone = VTimezone::parse(component)?;
        self.register_vtimezone(vtimezone);
        Ok(())
    }

    /// Registers a zone with a single offset under `tzid`.
    pub fn register_fixed(&mut self, tzid: impl Into<String>, offset: UtcOffset) {
        self.register_vtimezone(VTimezone::fixed(tzid, offset));
    }

    #[must_use]
    pub fn has_vtimezone(&self, tzid: &str) -> bool {
        self.defined.contains_key(tzid)
    }

    /// ## Summary
    /// Resolves a TZID.
    ///
    /// ## Errors
    /// Returns [`ConversionError::UnknownTimezone`] when the identifier is
    /// neither registered nor known to the IANA database.
    pub fn resolve(&self, tzid: &str) -> Result<Zone, ConversionError> {
        if let Some(vtz) = self.defined.get(tzid) {
            return Ok(Zone::Defined(Arc::clone(vtz)));
        }

        let normalized = normalize_tzid(tzid);
        let tz = Tz::from_str(&normalized)
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))?;

        Ok(match tz {
            Tz::UTC | Tz::Etc__UTC => Zone::Utc,
            other => Zone::Iana(other),
        })
    }

    /// ## Summary
    /// Converts a wall time in `tzid` to UTC.
    ///
    /// ## Errors
    /// Returns [`ConversionError::UnknownTimezone`] when `tzid` does not
    /// resolve.
    pub fn convert_to_utc(
        &self,
        local: NaiveDateTime,
        tzid: &str,
    ) -> Result<DateTime<Utc>, ConversionError> {
        Ok(self.resolve(tzid)?.to_utc(local))
    }
}

/// Maps vendor TZIDs onto canonical IANA names.
///
/// Unknown identifiers come back with any vendor prefix removed.
#[must_use]
pub fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/20050126_1/")
        .or_else(|| tzid.strip_prefix("/mozilla.org/"))
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/Olson_20011030_5/"))
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let iana_parser = IanaParserExtended::new();

    let from_windows = WindowsParser::new()
        .parse(stripped, None)
        .and_then(|zone| iana_parser.iter().find(|entry| entry.time_zone == zone));
    if let Some(entry) = from_windows {
        return entry.canonical.to_string();
    }

    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone == icu::time::TimeZone::UNKNOWN {
        stripped.to_string()
    } else {
        parsed.canonical.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{ComponentKind, DateTime as ICalDateTime, Property, names};
    use chrono::NaiveDate;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn resolves_iana_and_utc() {
        let resolver = TimeZoneResolver::new();
        assert_eq!(
            resolver.resolve("America/Chicago").unwrap(),
            Zone::Iana(Tz::America__Chicago)
        );
        assert_eq!(resolver.resolve("UTC").unwrap(), Zone::Utc);
        assert!(matches!(
            resolver.resolve("Not/AZone"),
            Err(ConversionError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn normalizes_vendor_names() {
        assert_eq!(normalize_tzid("Central Standard Time"), "America/Chicago");
        assert_eq!(normalize_tzid("Eastern Standard Time"), "America/New_York");
        assert_eq!(
            normalize_tzid("/mozilla.org/America/New_York"),
            "America/New_York"
        );
        assert_eq!(normalize_tzid("US/Eastern"), "America/New_York");
        assert_eq!(normalize_tzid("Europe/Kiev"), "Europe/Kyiv");
    }

    #[test]
    fn chicago_winter_and_summer() {
        let zone = TimeZoneResolver::new().resolve("America/Chicago").unwrap();
        assert_eq!(
            zone.to_utc(local(2007, 2, 12, 9, 0)),
            Utc.with_ymd_and_hms(2007, 2, 12, 15, 0, 0).unwrap()
        );
        assert_eq!(
            zone.to_utc(local(2007, 7, 12, 9, 0)),
            Utc.with_ymd_and_hms(2007, 7, 12, 14, 0, 0).unwrap()
        );
        assert_eq!(
            zone.from_utc(Utc.with_ymd_and_hms(2007, 2, 12, 15, 0, 0).unwrap()),
            local(2007, 2, 12, 9, 0)
        );
    }

    #[test]
    fn gap_and_fold_are_total() {
        let zone = TimeZoneResolver::new().resolve("America/Chicago").unwrap();
        // 2007-03-11 02:30 is skipped; read with CST it lands at 03:30 CDT
        assert_eq!(
            zone.to_utc(local(2007, 3, 11, 2, 30)),
            Utc.with_ymd_and_hms(2007, 3, 11, 8, 30, 0).unwrap()
        );
        // 2007-11-04 01:30 repeats; the CDT reading comes first
        assert_eq!(
            zone.to_utc(local(2007, 11, 4, 1, 30)),
            Utc.with_ymd_and_hms(2007, 11, 4, 6, 30, 0).unwrap()
        );
    }

    #[test]
    fn registered_definitions_win() {
        let mut resolver = TimeZoneResolver::new();
        resolver.register_fixed("America/Chicago", UtcOffset::new(2, 0, 0));
        let zone = resolver.resolve("America/Chicago").unwrap();
        assert!(matches!(zone, Zone::Defined(_)));
        assert_eq!(zone.id(), "America/Chicago");
        assert_eq!(
            zone.to_utc(local(2026, 1, 15, 10, 0)),
            Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn registers_components() {
        let standard = Component::new(ComponentKind::Standard)
            .with_property(Property::datetime(
                names::DTSTART,
                ICalDateTime::floating(local(1970, 1, 1, 0, 0)),
            ))
            .with_property(Property::text(names::TZOFFSETFROM, "+0530"))
            .with_property(Property::text(names::TZOFFSETTO, "+0530"));
        let tz = Component::timezone()
            .with_property(Property::text(names::TZID, "Custom/India"))
            .with_child(standard);

        let mut resolver = TimeZoneResolver::new();
        resolver.register_component(&tz).unwrap();
        assert!(resolver.has_vtimezone("Custom/India"));
        assert_eq!(
            resolver
                .convert_to_utc(local(2026, 1, 15, 10, 0), "Custom/India")
                .unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 15, 4, 30, 0).unwrap()
        );
    }
}
