//! Finding the occurrences of a collection that satisfy a filter.

use cosmo_rfc::rfc::ical::expand::TimeZoneResolver;

use super::filter::{ComponentFilter, FilterEvaluator};
use super::overrides::OverrideMerger;
use super::recurrence::RecurrenceExpander;
use super::repository::{CollectionId, ItemRepository};
use super::time_range::TimeRangePredicate;
use crate::error::SchemaError;
use crate::model::{CalendarEntity, Modification, Occurrence};

/// A master together with its stored modifications.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub entity: CalendarEntity,
    pub overrides: Vec<Modification>,
}

/// The items a query is evaluated over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    items: Vec<StoredItem>,
}

impl CandidateSet {
    /// ## Summary
    /// Loads every master of `collection` and its modifications.
    ///
    /// A master whose modifications cannot be read is skipped.
    ///
    /// ## Errors
    /// Returns a [`SchemaError`] when the collection's items cannot be read.
    pub fn load<R>(repo: &R, collection: &CollectionId) -> Result<Self, SchemaError>
    where
        R: ItemRepository + ?Sized,
    {
        let mut items = Vec::new();
        for entity in repo.find_items_by_collection(collection)? {
            match repo.find_overrides(&entity.uid) {
                Ok(overrides) => items.push(StoredItem { entity, overrides }),
                Err(error) => {
                    tracing::warn!(uid = %entity.uid, %error, "Skipping item with unreadable modifications");
                }
            }
        }
        tracing::debug!(%collection, count = items.len(), "Candidates loaded");
        Ok(Self { items })
    }

    #[must_use]
    pub fn from_items(items: Vec<StoredItem>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredItem> {
        self.items.iter()
    }
}

/// Expands, merges and filters candidates.
#[derive(Debug, Clone, Copy)]
pub struct QueryEvaluator<'r> {
    resolver: &'r TimeZoneResolver,
    expander: RecurrenceExpander,
}

impl<'r> QueryEvaluator<'r> {
    #[must_use]
    pub fn new(resolver: &'r TimeZoneResolver, expander: RecurrenceExpander) -> Self {
        Self { resolver, expander }
    }

    /// ## Summary
    /// Every occurrence in `candidates` that satisfies `filter`, paired
    /// with its master.
    ///
    /// Masters are expanded over `window`, modifications are merged in
    /// and each occurrence is tested on its own. An item whose recurrence
    /// or modifications are invalid is logged and skipped. Results keep
    /// candidate order; within a master, generated instances come before
    /// added ones.
    #[must_use]
    pub fn find_matching_occurrences<'a>(
        &self,
        candidates: &'a CandidateSet,
        filter: &ComponentFilter,
        window: Option<&TimeRangePredicate>,
    ) -> Vec<(&'a CalendarEntity, Occurrence<'a>)> {
        let evaluator = FilterEvaluator::new(self.resolver, self.expander);
        let mut matched = Vec::new();
        for item in candidates.iter() {
            let occurrences = match self.occurrences(item, window) {
                Ok(occurrences) => occurrences,
                Err(error) => {
                    tracing::warn!(uid = %item.entity.uid, %error, "Skipping item");
                    continue;
                }
            };
            matched.extend(
                occurrences
                    .into_iter()
                    .filter(|occurrence| evaluator.matches_occurrence(filter, occurrence))
                    .map(|occurrence| (&item.entity, occurrence)),
            );
        }
        tracing::debug!(
            candidates = candidates.len(),
            matched = matched.len(),
            "Filter evaluated"
        );
        matched
    }

    fn occurrences<'a>(
        &self,
        item: &'a StoredItem,
        window: Option<&TimeRangePredicate>,
    ) -> Result<Vec<Occurrence<'a>>, SchemaError> {
        let occurrences = self.expander.expand(&item.entity, window, self.resolver)?;
        OverrideMerger::new(self.resolver, window).merge(&item.entity, occurrences, &item.overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caldav::repository::InMemoryRepository;
    use crate::model::{EventData, ModificationField, Patch, RecurrenceSet, TemporalValue};
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
    use cosmo_rfc::rfc::dav::core::{CompFilter, PropFilter, TextMatch, TimeRange};

    fn local(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2007, 2, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn day(d: u32) -> TimeRange {
        let start = Utc.with_ymd_and_hms(2007, 2, d, 0, 0, 0).unwrap();
        TimeRange::new(start, start + TimeDelta::days(1)).unwrap()
    }

    fn repository() -> (InMemoryRepository, CollectionId) {
        let home = CollectionId::from("home");
        let mut repo = InMemoryRepository::new();
        let start = TemporalValue::utc(local(10, 15));
        repo.add_item(
            &home,
            CalendarEntity::event(
                "daily",
                EventData::new(start.clone())
                    .with_end(start.shifted(TimeDelta::hours(1)).unwrap())
                    .with_recurrence(RecurrenceSet::default().with_rule("FREQ=DAILY;COUNT=10")),
            )
            .with_summary("Daily"),
        );
        repo.add_override(
            Modification::new("daily", TemporalValue::utc(local(12, 15)))
                .with(ModificationField::Title(Patch::Set("Special".into()))),
        );
        repo.add_item(
            &home,
            CalendarEntity::event("once", EventData::new(TemporalValue::utc(local(12, 9))))
                .with_summary("Once"),
        );
        (repo, home)
    }

    fn run(filter: CompFilter, window: Option<TimeRange>) -> Vec<(String, Option<String>)> {
        let resolver = TimeZoneResolver::new();
        let (repo, home) = repository();
        let candidates = CandidateSet::load(&repo, &home).unwrap();
        let compiled = ComponentFilter::compile(&filter, None).unwrap();
        let window = window.map(|range| TimeRangePredicate::from_range(range, None));
        QueryEvaluator::new(&resolver, RecurrenceExpander::new(100))
            .find_matching_occurrences(&candidates, &compiled, window.as_ref())
            .into_iter()
            .map(|(entity, occurrence)| (entity.uid.clone(), occurrence.summary().map(str::to_string)))
            .collect()
    }

    #[test]
    fn occurrences_in_the_window() {
        let filter = CompFilter::new("VCALENDAR")
            .with_comp_filter(CompFilter::new("VEVENT").with_time_range(day(12)));
        let found = run(filter, Some(day(12)));
        assert_eq!(
            found,
            vec![
                ("daily".to_string(), Some("Special".to_string())),
                ("once".to_string(), Some("Once".to_string())),
            ]
        );
    }

    #[test]
    fn modified_text_is_what_gets_matched() {
        let filter = CompFilter::new("VCALENDAR").with_comp_filter(
            CompFilter::new("VEVENT")
                .with_prop_filter(PropFilter::new("SUMMARY").with_text_match(TextMatch::equals("special"))),
        );
        let found = run(filter, None);
        assert_eq!(found, vec![("daily".to_string(), Some("Special".to_string()))]);
    }

    #[test]
    fn windowless_queries_see_every_instance() {
        let filter = CompFilter::new("VCALENDAR").with_comp_filter(CompFilter::new("VEVENT"));
        assert_eq!(run(filter, None).len(), 11);
    }

    #[test_log::test]
    fn invalid_items_are_skipped() {
        let resolver = TimeZoneResolver::new();
        let broken = CalendarEntity::event(
            "broken",
            EventData::new(TemporalValue::utc(local(12, 9)))
                .with_recurrence(RecurrenceSet::default().with_rule("FREQ=SOMETIMES")),
        );
        let fine = CalendarEntity::event("fine", EventData::new(TemporalValue::utc(local(12, 9))));
        let candidates = CandidateSet::from_items(vec![
            StoredItem { entity: broken, overrides: Vec::new() },
            StoredItem { entity: fine, overrides: Vec::new() },
        ]);
        let filter = ComponentFilter::compile(
            &CompFilter::new("VCALENDAR").with_comp_filter(CompFilter::new("VEVENT")),
            None,
        )
        .unwrap();
        let found = QueryEvaluator::new(&resolver, RecurrenceExpander::new(10))
            .find_matching_occurrences(&candidates, &filter, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.uid, "fine");
    }
}
