//! End-to-end calendar-query scenarios over an in-memory collection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use cosmo_calendar::caldav::{
    CollectionId, InMemoryRepository, OverrideMerger, QueryEngine, RecurrenceExpander,
    TimeRangePredicate,
};
use cosmo_calendar::model::{
    CalendarEntity, EventData, Modification, ModificationField, Occurrence, Patch, RecurrenceSet,
    TemporalValue,
};
use cosmo_core::config::Settings;
use cosmo_rfc::rfc::dav::core::TimeRange;
use cosmo_rfc::rfc::ical::expand::TimeZoneResolver;

fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeRangePredicate {
    TimeRangePredicate::from_range(TimeRange::new(start, end).unwrap(), None)
}

fn chicago(d: u32, h: u32, min: u32) -> TemporalValue {
    TemporalValue::zoned(local(2007, 2, d, h, min), "America/Chicago")
}

fn daily_from_the_10th(h: u32, min: u32) -> CalendarEntity {
    let start = chicago(10, h, min);
    CalendarEntity::event(
        "daily",
        EventData::new(start.clone())
            .with_end(start.shifted(TimeDelta::hours(1)).unwrap())
            .with_recurrence(RecurrenceSet::default().with_rule("FREQ=DAILY")),
    )
}

fn expand_and_merge<'a>(
    master: &'a CalendarEntity,
    overrides: &'a [Modification],
    window: &'a TimeRangePredicate,
    resolver: &'a TimeZoneResolver,
) -> Vec<Occurrence<'a>> {
    let occurrences = RecurrenceExpander::new(1000)
        .expand(master, Some(window), resolver)
        .unwrap();
    OverrideMerger::new(resolver, Some(window))
        .merge(master, occurrences, overrides)
        .unwrap()
}

fn positions(occurrences: &[Occurrence<'_>], resolver: &TimeZoneResolver) -> Vec<DateTime<Utc>> {
    let ctx = cosmo_calendar::model::ZoneContext::new(resolver);
    occurrences
        .iter()
        .map(|o| o.start.as_ref().unwrap().utc_instant(&ctx).unwrap())
        .collect()
}

#[test_log::test]
fn daily_event_has_one_instance_per_day() {
    let resolver = TimeZoneResolver::new();
    let master = daily_from_the_10th(9, 0);
    let feb_12 = window(utc(2007, 2, 12, 0), utc(2007, 2, 13, 0));

    let occurrences = expand_and_merge(&master, &[], &feb_12, &resolver);
    assert_eq!(positions(&occurrences, &resolver), [utc(2007, 2, 12, 15)]);
}

#[test_log::test]
fn rescheduled_instance_moves_between_windows() {
    let resolver = TimeZoneResolver::new();
    let master = daily_from_the_10th(7, 45);
    let overrides = [Modification::new("daily", chicago(12, 7, 45))
        .with(ModificationField::Start(Patch::Set(chicago(13, 7, 45))))];

    let feb_12 = window(utc(2007, 2, 12, 0), utc(2007, 2, 13, 0));
    assert!(expand_and_merge(&master, &overrides, &feb_12, &resolver).is_empty());

    let feb_13 = window(utc(2007, 2, 13, 0), utc(2007, 2, 14, 0));
    let occurrences = expand_and_merge(&master, &overrides, &feb_13, &resolver);
    assert_eq!(occurrences.len(), 2);
    let moved = occurrences.iter().find(|o| o.is_modified()).unwrap();
    assert_eq!(moved.recurrence_id, Some(chicago(12, 7, 45)));
    assert_eq!(moved.start, Some(chicago(13, 7, 45)));
}

#[test]
fn infinite_rules_stop_at_the_window_end() {
    let resolver = TimeZoneResolver::new();
    let start = TemporalValue::utc(local(2007, 1, 1, 0, 0));
    let master = CalendarEntity::event(
        "minutely",
        EventData::new(start).with_recurrence(RecurrenceSet::default().with_rule("FREQ=MINUTELY")),
    );
    let window = window(utc(2007, 1, 1, 1), utc(2007, 1, 1, 2));
    let occurrences = expand_and_merge(&master, &[], &window, &resolver);
    assert_eq!(occurrences.len(), 60);
    assert!(
        positions(&occurrences, &resolver)
            .iter()
            .all(|at| *at < window.end())
    );
}

#[test]
fn merging_is_repeatable_and_deletes_exactly_one_instance() {
    let resolver = TimeZoneResolver::new();
    let master = daily_from_the_10th(9, 0);
    let overrides = [Modification::deletion("daily", chicago(12, 9, 0))];
    let week = window(utc(2007, 2, 11, 0), utc(2007, 2, 15, 0));

    let first = expand_and_merge(&master, &overrides, &week, &resolver);
    let second = expand_and_merge(&master, &overrides, &week, &resolver);
    assert_eq!(first, second);
    assert_eq!(
        positions(&first, &resolver),
        [utc(2007, 2, 11, 15), utc(2007, 2, 13, 15), utc(2007, 2, 14, 15)]
    );
}

fn query(filter: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop><C:calendar-data/></D:prop>
  <C:filter>
    <C:comp-filter name="VCALENDAR">
      <C:comp-filter name="VEVENT">
        {filter}
      </C:comp-filter>
    </C:comp-filter>
  </C:filter>
</C:calendar-query>"#
    )
}

fn run(repo: &InMemoryRepository, collection: &CollectionId, filter: &str) -> Vec<String> {
    let resolver = TimeZoneResolver::new();
    let settings = Settings::from_toml_str("[calendar]\ndefault_timezone = \"America/Chicago\"\n").unwrap();
    let engine = QueryEngine::new(&resolver, &settings).unwrap();
    engine
        .execute_xml(repo, collection, query(filter).as_bytes())
        .unwrap()
        .resources
        .into_iter()
        .map(|r| r.uid)
        .collect()
}

#[test_log::test]
fn time_range_selects_spring_events() {
    let collection = CollectionId::from("events");
    let mut repo = InMemoryRepository::new();
    for (uid, month) in [("jan", 1), ("mar", 3), ("apr", 4), ("jun", 6)] {
        let start = TemporalValue::utc(local(2006, month, 15, 10, 0));
        repo.add_item(
            &collection,
            CalendarEntity::event(uid, EventData::new(start.clone()).with_end(start.shifted(TimeDelta::hours(1)).unwrap())),
        );
    }

    let found = run(
        &repo,
        &collection,
        r#"<C:time-range start="20060301T000000Z" end="20060501T000000Z"/>"#,
    );
    assert_eq!(found, ["mar", "apr"]);
}

#[test_log::test]
fn location_text_match_ignores_recurrence() {
    let collection = CollectionId::from("events");
    let mut repo = InMemoryRepository::new();
    let start = TemporalValue::utc(local(2006, 5, 1, 10, 0));
    let event = |uid: &str, location: &str, recurring: bool| {
        let mut data = EventData::new(start.clone()).with_location(location);
        if recurring {
            data = data.with_recurrence(RecurrenceSet::default().with_rule("FREQ=WEEKLY;COUNT=4"));
        }
        CalendarEntity::event(uid, data)
    };
    repo.add_item(&collection, event("here", "here", false));
    repo.add_item(&collection, event("here-weekly", "here", true));
    repo.add_item(&collection, event("shouting", "HERE", false));
    repo.add_item(&collection, event("elsewhere", "over there", true));

    let found = run(
        &repo,
        &collection,
        r#"<C:prop-filter name="LOCATION">
             <C:text-match collation="i;octet" match-type="equals">here</C:text-match>
           </C:prop-filter>"#,
    );
    assert_eq!(found, ["here", "here-weekly"]);

    let found = run(
        &repo,
        &collection,
        r#"<C:prop-filter name="LOCATION">
             <C:text-match match-type="equals">here</C:text-match>
           </C:prop-filter>"#,
    );
    assert_eq!(found, ["here", "here-weekly", "shouting"]);
}

#[test_log::test]
fn any_time_events_match_every_window() {
    let collection = CollectionId::from("events");
    let mut repo = InMemoryRepository::new();
    let start = TemporalValue::date(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()).with_any_time(true);
    repo.add_item(&collection, CalendarEntity::event("someday", EventData::new(start)));

    let found = run(
        &repo,
        &collection,
        r#"<C:time-range start="20300301T000000Z" end="20300302T000000Z"/>"#,
    );
    assert_eq!(found, ["someday"]);
}

#[test_log::test]
fn all_day_events_use_the_default_zone() {
    let collection = CollectionId::from("events");
    let mut repo = InMemoryRepository::new();
    let day = |d: u32| TemporalValue::date(NaiveDate::from_ymd_opt(2007, 2, d).unwrap());
    repo.add_item(&collection, CalendarEntity::event("allday", EventData::new(day(12))));
    repo.add_item(
        &collection,
        CalendarEntity::event(
            "birthday-daily",
            EventData::new(day(1)).with_recurrence(RecurrenceSet::default().with_rule("FREQ=DAILY")),
        ),
    );
    repo.add_item(&collection, CalendarEntity::event("next-week", EventData::new(day(19))));

    // the 12th in Chicago is 06:00Z on the 12th to 06:00Z on the 13th
    let found = run(
        &repo,
        &collection,
        r#"<C:time-range start="20070213T030000Z" end="20070213T040000Z"/>"#,
    );
    assert_eq!(found, ["allday", "birthday-daily"]);
}
