//! Choosing the zone floating values are read in.

use cosmo_core::error::CoreError;
use cosmo_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

use crate::error::RequestError;

/// Server-wide fallback for the context zone.
#[derive(Debug, Clone, PartialEq)]
pub struct TimezonePolicy {
    default_zone: Zone,
}

impl TimezonePolicy {
    /// ## Summary
    /// Resolves the configured default zone. Floating values always need a
    /// zone, so the default is required.
    ///
    /// ## Errors
    /// Returns [`CoreError::ConfigurationError`] when no default is
    /// configured or the id is unknown.
    pub fn new(
        default_timezone: Option<&str>,
        resolver: &TimeZoneResolver,
    ) -> Result<Self, CoreError> {
        let tzid = default_timezone.ok_or_else(|| {
            CoreError::ConfigurationError(
                "calendar.default_timezone is required to place floating values".to_owned(),
            )
        })?;
        let default_zone = resolver
            .resolve(tzid)
            .map_err(|e| CoreError::ConfigurationError(format!("default timezone {tzid}: {e}")))?;
        tracing::debug!(tzid = default_zone.id(), "Default timezone resolved");
        Ok(Self { default_zone })
    }

    #[must_use]
    pub fn default_zone(&self) -> &Zone {
        &self.default_zone
    }

    /// ## Summary
    /// Picks the context zone: the request's timezone, then the
    /// collection's, then the configured default.
    ///
    /// ## Errors
    /// Returns [`RequestError::UnknownTimezone`] when the request names a
    /// zone the resolver does not know.
    pub fn context_zone(
        &self,
        request_tzid: Option<&str>,
        collection_zone: Option<Zone>,
        resolver: &TimeZoneResolver,
    ) -> Result<Zone, RequestError> {
        if let Some(tzid) = request_tzid {
            return resolver
                .resolve(tzid)
                .map_err(|_e| RequestError::UnknownTimezone(tzid.to_string()));
        }
        Ok(collection_zone.unwrap_or_else(|| self.default_zone.clone()))
    }
}
