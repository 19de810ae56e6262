//! `CALDAV:calendar-query` REPORT execution.

use std::collections::HashSet;

use cosmo_core::config::Settings;
use cosmo_rfc::rfc::dav::core::{CalendarQuery, ComponentSelection, TimeRange};
use cosmo_rfc::rfc::dav::parse::parse_calendar_query;
use cosmo_rfc::rfc::ical::core::Component;
use cosmo_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

use super::filter::ComponentFilter;
use super::overrides::OverrideMerger;
use super::policy::TimezonePolicy;
use super::query::{CandidateSet, QueryEvaluator, StoredItem};
use super::recurrence::RecurrenceExpander;
use super::render;
use super::repository::{CollectionId, ItemRepository};
use super::time_range::TimeRangePredicate;
use crate::error::CalendarResult;

/// One resource in a report response.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedResource {
    pub uid: String,
    /// A VCALENDAR, already narrowed by the request's selection.
    pub calendar_data: Component,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    pub resources: Vec<MatchedResource>,
    /// Set when `DAV:limit` cut the result short.
    pub truncated: bool,
}

/// Runs calendar-query requests against a repository.
#[derive(Debug, Clone)]
pub struct QueryEngine<'r> {
    resolver: &'r TimeZoneResolver,
    policy: TimezonePolicy,
    expander: RecurrenceExpander,
}

impl<'r> QueryEngine<'r> {
    /// ## Summary
    /// Builds an engine from settings.
    ///
    /// ## Errors
    /// Returns a configuration error when the default timezone is missing
    /// or unknown.
    pub fn new(resolver: &'r TimeZoneResolver, settings: &Settings) -> CalendarResult<Self> {
        let policy = TimezonePolicy::new(settings.calendar.default_timezone.as_deref(), resolver)?;
        Ok(Self {
            resolver,
            policy,
            expander: RecurrenceExpander::new(settings.calendar.max_instances),
        })
    }

    #[must_use]
    pub fn policy(&self) -> &TimezonePolicy {
        &self.policy
    }

    /// ## Summary
    /// Parses an XML request body and executes it.
    ///
    /// ## Errors
    /// Returns a request error for a malformed body, otherwise as
    /// [`QueryEngine::execute`].
    pub fn execute_xml<R>(
        &self,
        repository: &R,
        collection: &CollectionId,
        body: &[u8],
    ) -> CalendarResult<QueryOutcome>
    where
        R: ItemRepository + ?Sized,
    {
        let query = parse_calendar_query(body)?;
        self.execute(repository, collection, &query)
    }

    /// ## Summary
    /// Executes a parsed query.
    ///
    /// The expansion window is the union of the time-ranges on the
    /// top-level component filters, else the `expand` range. Each matched
    /// master yields one resource, in repository order, until `limit` is
    /// reached.
    ///
    /// ## Errors
    /// Returns a request error for an unknown timezone or collation and a
    /// schema error when the collection cannot be read.
    pub fn execute<R>(
        &self,
        repository: &R,
        collection: &CollectionId,
        query: &CalendarQuery,
    ) -> CalendarResult<QueryOutcome>
    where
        R: ItemRepository + ?Sized,
    {
        let zone = self.policy.context_zone(
            query.timezone_id.as_deref(),
            repository.collection_timezone(collection),
            self.resolver,
        )?;
        let filter = ComponentFilter::compile(&query.filter.root, Some(&zone))?;
        let window = query
            .filter
            .top_level_time_ranges()
            .copied()
            .reduce(TimeRange::union)
            .or(query.expand)
            .map(|range| TimeRangePredicate::from_range(range, Some(zone.clone())));

        let candidates = CandidateSet::load(repository, collection)?;
        let matched = QueryEvaluator::new(self.resolver, self.expander).find_matching_occurrences(
            &candidates,
            &filter,
            window.as_ref(),
        );

        let mut seen = HashSet::new();
        let uids: Vec<&str> = matched
            .iter()
            .map(|(entity, _)| entity.uid.as_str())
            .filter(|uid| seen.insert(*uid))
            .collect();
        let limit = query
            .limit
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let truncated = uids.len() > limit;

        let resources = uids
            .into_iter()
            .take(limit)
            .filter_map(|uid| candidates.iter().find(|item| item.entity.uid == uid))
            .map(|item| {
                let calendar = match query.expand {
                    Some(range) => self.expanded(item, range, zone.clone()),
                    None => self.stored(item),
                };
                MatchedResource {
                    uid: item.entity.uid.clone(),
                    calendar_data: narrow(calendar, query.selection.as_ref()),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            %collection,
            matched = matched.len(),
            resources = resources.len(),
            truncated,
            "Calendar query executed"
        );
        Ok(QueryOutcome {
            resources,
            truncated,
        })
    }

    /// The master and its modifications as stored.
    fn stored(&self, item: &StoredItem) -> Component {
        let mut calendar = Component::calendar().with_child(item.entity.to_component());
        match OverrideMerger::new(self.resolver, None).merge(&item.entity, Vec::new(), &item.overrides) {
            Ok(modified) => {
                for occurrence in modified {
                    calendar.add_child(occurrence.to_component());
                }
            }
            Err(error) => {
                tracing::warn!(uid = %item.entity.uid, %error, "Modifications not rendered");
            }
        }
        calendar
    }

    /// Every instance of the master in `range`, in UTC.
    fn expanded(&self, item: &StoredItem, range: TimeRange, zone: Zone) -> Component {
        let window = TimeRangePredicate::from_range(range, Some(zone));
        let ctx = window.zone_context(self.resolver);
        let occurrences = self
            .expander
            .expand(&item.entity, Some(&window), self.resolver)
            .and_then(|occurrences| {
                OverrideMerger::new(self.resolver, Some(&window)).merge(
                    &item.entity,
                    occurrences,
                    &item.overrides,
                )
            });
        match occurrences {
            Ok(occurrences) => render::expanded_calendar(&occurrences, &ctx),
            Err(error) => {
                tracing::warn!(uid = %item.entity.uid, %error, "Expansion failed, rendering stored data");
                self.stored(item)
            }
        }
    }
}

fn narrow(calendar: Component, selection: Option<&ComponentSelection>) -> Component {
    match selection {
        Some(selection) if calendar.is_named(&selection.name) => render::select(&calendar, selection),
        _ => calendar,
    }
}
