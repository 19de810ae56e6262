//! Component, property and parameter filters (RFC 4791 §9.7).
//!
//! A parsed `CALDAV:filter` is compiled once per request: collations are
//! resolved and time-ranges pick up the request's context zone. The
//! compiled tree is then evaluated against each candidate component.

mod text_match;

pub use text_match::{Collation, TextMatcher};

use cosmo_rfc::rfc::dav::core::{CalendarFilter, CompFilter, ParamFilter, PropFilter};
use cosmo_rfc::rfc::ical::core::{Component, ComponentKind, Duration, Property, names};
use cosmo_rfc::rfc::ical::expand::{TimeZoneResolver, Zone};

use super::recurrence::RecurrenceExpander;
use super::time_range::TimeRangePredicate;
use crate::error::{RequestError, TemporalError};
use crate::model::{AlarmTrigger, CalendarEntity, DisplayAlarm, Occurrence, TemporalValue};

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFilter {
    pub name: String,
    pub is_not_defined: bool,
    pub time_range: Option<TimeRangePredicate>,
    pub properties: Vec<PropertyFilter>,
    pub components: Vec<ComponentFilter>,
}

impl ComponentFilter {
    /// ## Summary
    /// Compiles a parsed comp-filter and everything below it.
    ///
    /// ## Errors
    /// Returns [`RequestError::UnsupportedCollation`] for a text-match
    /// with an unknown collation anywhere in the tree.
    pub fn compile(filter: &CompFilter, context_zone: Option<&Zone>) -> Result<Self, RequestError> {
        Ok(Self {
            name: filter.name.clone(),
            is_not_defined: filter.is_not_defined,
            time_range: filter
                .time_range
                .map(|range| TimeRangePredicate::from_range(range, context_zone.cloned())),
            properties: filter
                .prop_filters
                .iter()
                .map(|p| PropertyFilter::compile(p, context_zone))
                .collect::<Result<_, _>>()?,
            components: filter
                .comp_filters
                .iter()
                .map(|c| Self::compile(c, context_zone))
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatcher>,
    pub time_range: Option<TimeRangePredicate>,
    pub parameters: Vec<ParameterFilter>,
}

impl PropertyFilter {
    /// ## Summary
    /// Compiles a parsed prop-filter.
    ///
    /// ## Errors
    /// As [`ComponentFilter::compile`].
    pub fn compile(filter: &PropFilter, context_zone: Option<&Zone>) -> Result<Self, RequestError> {
        Ok(Self {
            name: filter.name.clone(),
            is_not_defined: filter.is_not_defined,
            text_match: filter.text_match.as_ref().map(TextMatcher::new).transpose()?,
            time_range: filter
                .time_range
                .map(|range| TimeRangePredicate::from_range(range, context_zone.cloned())),
            parameters: filter
                .param_filters
                .iter()
                .map(ParameterFilter::compile)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterFilter {
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatcher>,
}

impl ParameterFilter {
    /// ## Summary
    /// Compiles a parsed param-filter.
    ///
    /// ## Errors
    /// As [`ComponentFilter::compile`].
    pub fn compile(filter: &ParamFilter) -> Result<Self, RequestError> {
        Ok(Self {
            name: filter.name.clone(),
            is_not_defined: filter.is_not_defined,
            text_match: filter.text_match.as_ref().map(TextMatcher::new).transpose()?,
        })
    }
}

/// One node of a compiled filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Component(ComponentFilter),
    Property(PropertyFilter),
    Parameter(ParameterFilter),
}

impl FilterNode {
    /// ## Summary
    /// Compiles a request filter into its root node.
    ///
    /// ## Errors
    /// As [`ComponentFilter::compile`].
    pub fn compile(filter: &CalendarFilter, context_zone: Option<&Zone>) -> Result<Self, RequestError> {
        ComponentFilter::compile(&filter.root, context_zone).map(Self::Component)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Component(f) => &f.name,
            Self::Property(f) => &f.name,
            Self::Parameter(f) => &f.name,
        }
    }
}

/// What a filter node is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'c> {
    Component(&'c Component),
    Property(&'c Property),
}

/// Evaluates compiled filters.
#[derive(Debug, Clone, Copy)]
pub struct FilterEvaluator<'r> {
    resolver: &'r TimeZoneResolver,
    expander: RecurrenceExpander,
}

impl<'r> FilterEvaluator<'r> {
    #[must_use]
    pub fn new(resolver: &'r TimeZoneResolver, expander: RecurrenceExpander) -> Self {
        Self { resolver, expander }
    }

    /// ## Summary
    /// Evaluates `node` against `candidate`.
    ///
    /// Component nodes test a component, property nodes test the named
    /// property of a component or a single property, and parameter nodes
    /// test a property. Other pairings never match.
    #[must_use]
    pub fn evaluate(&self, node: &FilterNode, candidate: Candidate<'_>) -> bool {
        match (node, candidate) {
            (FilterNode::Component(filter), Candidate::Component(component)) => {
                if filter.is_not_defined {
                    !component.is_named(&filter.name)
                } else {
                    self.matches_component(filter, component, None)
                }
            }
            (FilterNode::Property(filter), Candidate::Component(component)) => {
                self.property_matches(filter, component)
            }
            (FilterNode::Property(filter), Candidate::Property(property)) => {
                !filter.is_not_defined
                    && property.name.eq_ignore_ascii_case(&filter.name)
                    && self.property_instance_matches(filter, property)
            }
            (FilterNode::Parameter(filter), Candidate::Property(property)) => {
                parameter_matches(filter, property)
            }
            (FilterNode::Component(_), Candidate::Property(_))
            | (FilterNode::Parameter(_), Candidate::Component(_)) => false,
        }
    }

    /// Evaluates the root filter against `VCALENDAR{occurrence}`.
    #[must_use]
    pub fn matches_occurrence(&self, filter: &ComponentFilter, occurrence: &Occurrence<'_>) -> bool {
        self.matches_component(filter, &occurrence.calendar_component(), None)
    }

    /// Evaluates the root filter against `VCALENDAR{master}` as stored.
    #[must_use]
    pub fn matches_entity(&self, filter: &ComponentFilter, entity: &CalendarEntity) -> bool {
        let calendar = Component::calendar().with_child(entity.to_component());
        self.matches_component(filter, &calendar, None)
    }

    /// ## Summary
    /// Tests one component: its name, its time-range, every property
    /// filter and every nested component filter.
    #[must_use]
    pub fn matches_component(
        &self,
        filter: &ComponentFilter,
        component: &Component,
        parent: Option<&Component>,
    ) -> bool {
        if !component.is_named(&filter.name) {
            return false;
        }
        if let Some(range) = &filter.time_range
            && !self.component_in_range(range, component, parent)
        {
            return false;
        }
        filter
            .properties
            .iter()
            .all(|p| self.property_matches(p, component))
            && filter
                .components
                .iter()
                .all(|c| self.child_matches(c, component))
    }

    fn child_matches(&self, filter: &ComponentFilter, parent: &Component) -> bool {
        let children = parent.children_named(&filter.name);
        if filter.is_not_defined {
            return children.is_empty();
        }
        children
            .into_iter()
            .any(|child| self.matches_component(filter, child, Some(parent)))
    }

    fn component_in_range(
        &self,
        range: &TimeRangePredicate,
        component: &Component,
        parent: Option<&Component>,
    ) -> bool {
        if component.kind == Some(ComponentKind::Alarm) {
            return parent.is_some_and(|parent| self.alarm_in_range(range, component, parent));
        }
        let recurring = component.get_property(names::RRULE).is_some()
            || component.get_property(names::RDATE).is_some();
        if recurring && component.get_property(names::DTSTART).is_some() {
            match CalendarEntity::from_component(component) {
                Ok(entity) => {
                    return match self.expander.expand(&entity, Some(range), self.resolver) {
                        Ok(occurrences) => !occurrences.is_empty(),
                        Err(error) => {
                            tracing::warn!(uid = %entity.uid, %error, "Recurrence not expandable");
                            false
                        }
                    };
                }
                Err(error) => {
                    tracing::debug!(%error, "Testing recurring component by its first instance");
                }
            }
        }

        match component_bounds(component) {
            Ok(Some((start, end))) => range.matches(&start, end.as_ref(), self.resolver),
            Ok(None) if component.kind == Some(ComponentKind::Todo) => {
                match due(component) {
                    Some(due) => range.matches(&due, None, self.resolver),
                    // a task without dates is always in range
                    None => true,
                }
            }
            Ok(None) => false,
            Err(error) => {
                tracing::debug!(component = %component.name, %error, "Unreadable dates");
                false
            }
        }
    }

    fn alarm_in_range(&self, range: &TimeRangePredicate, alarm: &Component, parent: &Component) -> bool {
        let Some(trigger) = alarm
            .get_property(names::TRIGGER)
            .and_then(|p| AlarmTrigger::from_property(p).ok())
        else {
            return false;
        };
        let Ok(Some((start, end))) = component_bounds(parent) else {
            return false;
        };
        let ctx = range.zone_context(self.resolver);
        let Ok(start_utc) = start.position(&ctx) else {
            return false;
        };
        let end_utc = end
            .and_then(|end| end.position(&ctx).ok())
            .unwrap_or(start_utc);

        let mut reminder = DisplayAlarm::new(trigger);
        let repeat = alarm
            .get_property(names::REPEAT)
            .and_then(Property::as_integer)
            .and_then(|n| u32::try_from(n).ok());
        let every = alarm.get_property(names::DURATION).and_then(Property::as_duration);
        if let (Some(repeat), Some(every)) = (repeat, every) {
            reminder = reminder.with_repeat(repeat, *every);
        }
        reminder
            .fire_times(start_utc, end_utc)
            .into_iter()
            .any(|at| range.contains(at))
    }

    fn property_matches(&self, filter: &PropertyFilter, component: &Component) -> bool {
        let properties = component.get_properties(&filter.name);
        if filter.is_not_defined {
            return properties.is_empty();
        }
        properties
            .into_iter()
            .any(|p| self.property_instance_matches(filter, p))
    }

    fn property_instance_matches(&self, filter: &PropertyFilter, property: &Property) -> bool {
        filter
            .text_match
            .as_ref()
            .is_none_or(|m| m.matches_any(property.text_values()))
            && filter
                .time_range
                .as_ref()
                .is_none_or(|range| self.property_in_range(range, property))
            && filter
                .parameters
                .iter()
                .all(|f| parameter_matches(f, property))
    }

    fn property_in_range(&self, range: &TimeRangePredicate, property: &Property) -> bool {
        TemporalValue::from_property(property)
            .is_ok_and(|value| range.matches(&value, None, self.resolver))
    }
}

fn parameter_matches(filter: &ParameterFilter, property: &Property) -> bool {
    let parameter = property.get_param(&filter.name);
    if filter.is_not_defined {
        return parameter.is_none();
    }
    match (parameter, &filter.text_match) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(parameter), Some(m)) => m.matches_any(parameter.values.iter().map(String::as_str)),
    }
}

/// DTSTART and the end it implies through DTEND, DURATION or DUE.
fn component_bounds(
    component: &Component,
) -> Result<Option<(TemporalValue, Option<TemporalValue>)>, TemporalError> {
    let Some(dtstart) = component.get_property(names::DTSTART) else {
        return Ok(None);
    };
    let start = TemporalValue::from_property(dtstart)?;
    let end = if let Some(dtend) = component.get_property(names::DTEND) {
        Some(TemporalValue::from_property(dtend)?)
    } else if let Some(duration) = component.get_property(names::DURATION).and_then(|p| {
        p.as_duration()
            .copied()
            .or_else(|| Duration::parse(&p.raw_value).ok())
    }) {
        Some(start.shifted(duration.to_time_delta())?)
    } else {
        due(component)
    };
    Ok(Some((start, end)))
}

fn due(component: &Component) -> Option<TemporalValue> {
    component
        .get_property(names::DUE)
        .and_then(|p| TemporalValue::from_property(p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
    use cosmo_rfc::rfc::dav::core::{TextMatch, TimeRange};

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

    fn event(uid: &str, start: &TemporalValue) -> Component {
        Component::event()
            .with_property(Property::text(names::UID, uid))
            .with_property(start.to_property(names::DTSTART))
            .with_property(
                start
                    .shifted(TimeDelta::hours(1)).unwrap()
                    .to_property(names::DTEND),
            )
    }

    fn calendar(child: Component) -> Component {
        Component::calendar().with_child(child)
    }

    fn compile(filter: CompFilter) -> ComponentFilter {
        ComponentFilter::compile(&filter, None).unwrap()
    }

    fn check(filter: CompFilter, component: &Component) -> bool {
        let resolver = TimeZoneResolver::new();
        let evaluator = FilterEvaluator::new(&resolver, RecurrenceExpander::new(100));
        evaluator.evaluate(&FilterNode::Component(compile(filter)), Candidate::Component(component))
    }

    fn vevent(inner: CompFilter) -> CompFilter {
        CompFilter::new("VCALENDAR").with_comp_filter(inner)
    }

    #[test]
    fn component_presence() {
        let cal = calendar(event("a", &TemporalValue::utc(local(12, 9))));
        assert!(check(vevent(CompFilter::new("VEVENT")), &cal));
        assert!(!check(vevent(CompFilter::new("VTODO")), &cal));
        assert!(check(vevent(CompFilter::new("VTODO").not_defined()), &cal));
        assert!(!check(vevent(CompFilter::new("VEVENT").not_defined()), &cal));
    }

    #[test]
    fn time_range_on_events() {
        let cal = calendar(event("a", &TemporalValue::utc(local(12, 9))));
        assert!(check(vevent(CompFilter::new("VEVENT").with_time_range(day(12))), &cal));
        assert!(!check(vevent(CompFilter::new("VEVENT").with_time_range(day(13))), &cal));
    }

    #[test]
    fn raw_recurring_components_are_expanded() {
        let start = TemporalValue::zoned(local(10, 9), "America/Chicago");
        let cal = calendar(
            event("daily", &start).with_property(Property::recur(names::RRULE, "FREQ=DAILY;COUNT=5")),
        );
        assert!(check(vevent(CompFilter::new("VEVENT").with_time_range(day(13))), &cal));
        assert!(!check(vevent(CompFilter::new("VEVENT").with_time_range(day(16))), &cal));
    }

    #[test]
    fn tasks_without_dates_are_in_range() {
        let todo = Component::new(ComponentKind::Todo).with_property(Property::text(names::UID, "t"));
        assert!(check(vevent(CompFilter::new("VTODO").with_time_range(day(12))), &calendar(todo)));

        let due = Component::new(ComponentKind::Todo)
            .with_property(Property::text(names::UID, "t"))
            .with_property(TemporalValue::utc(local(14, 12)).to_property(names::DUE));
        let cal = calendar(due);
        assert!(check(vevent(CompFilter::new("VTODO").with_time_range(day(14))), &cal));
        assert!(!check(vevent(CompFilter::new("VTODO").with_time_range(day(12))), &cal));
    }

    #[test]
    fn alarm_time_range_uses_fire_times() {
        let alarm = Component::alarm()
            .with_property(Property::text(names::ACTION, "AUDIO"))
            .with_property(Property::text(names::TRIGGER, "-PT30M"));
        // the event starts at midnight, the alarm fires the evening before
        let cal = calendar(event("a", &TemporalValue::utc(local(13, 0))).with_child(alarm));
        let filter = |d| {
            vevent(
                CompFilter::new("VEVENT")
                    .with_comp_filter(CompFilter::new("VALARM").with_time_range(day(d))),
            )
        };
        assert!(check(filter(12), &cal));
        assert!(!check(filter(13), &cal));
    }

    #[test]
    fn property_and_parameter_filters() {
        let cal = calendar(
            event("a", &TemporalValue::zoned(local(12, 9), "America/Chicago"))
                .with_property(Property::text_list(
                    "CATEGORIES",
                    vec!["HOME".into(), "WORK".into()],
                )),
        );
        let categories = |m: TextMatch| {
            vevent(CompFilter::new("VEVENT").with_prop_filter(PropFilter::new("CATEGORIES").with_text_match(m)))
        };
        assert!(check(categories(TextMatch::equals("work")), &cal));
        assert!(!check(categories(TextMatch::equals("work").negate()), &cal));
        assert!(check(categories(TextMatch::equals("travel").negate()), &cal));

        let tzid = |m: Option<TextMatch>| {
            let mut param = ParamFilter::new("TZID");
            if let Some(m) = m {
                param = param.with_text_match(m);
            }
            vevent(CompFilter::new("VEVENT").with_prop_filter(PropFilter::new("DTSTART").with_param_filter(param)))
        };
        assert!(check(tzid(None), &cal));
        assert!(check(tzid(Some(TextMatch::contains("chicago"))), &cal));
        assert!(!check(tzid(Some(TextMatch::contains("denver"))), &cal));
    }

    #[test]
    fn node_pairings() {
        let resolver = TimeZoneResolver::new();
        let evaluator = FilterEvaluator::new(&resolver, RecurrenceExpander::new(100));
        let summary = Property::text(names::SUMMARY, "Visible");
        let prop = FilterNode::Property(
            PropertyFilter::compile(&PropFilter::new("SUMMARY").with_text_match(TextMatch::contains("vis")), None)
                .unwrap(),
        );
        assert!(evaluator.evaluate(&prop, Candidate::Property(&summary)));
        assert_eq!(prop.name(), "SUMMARY");

        let param = FilterNode::Parameter(ParameterFilter::compile(&ParamFilter::new("LANGUAGE")).unwrap());
        assert!(!evaluator.evaluate(&param, Candidate::Property(&summary)));
        assert!(!evaluator.evaluate(&param, Candidate::Component(&Component::event())));
    }

    #[test]
    fn compile_rejects_unknown_collations() {
        let filter = vevent(
            CompFilter::new("VEVENT").with_prop_filter(
                PropFilter::new("SUMMARY").with_text_match(TextMatch::contains("x").with_collation("i;klingon")),
            ),
        );
        assert!(matches!(
            ComponentFilter::compile(&filter, None),
            Err(RequestError::UnsupportedCollation(_))
        ));
    }

    #[test]
    fn stored_entities_are_matched_through_their_calendar() {
        let start = TemporalValue::utc(local(12, 9));
        let data = crate::model::EventData::new(start.clone()).with_end(start.shifted(TimeDelta::hours(1)).unwrap());
        let entity = CalendarEntity::event("stored", data).with_summary("Planning");
        let resolver = TimeZoneResolver::new();
        let evaluator = FilterEvaluator::new(&resolver, RecurrenceExpander::new(100));

        let planning = compile(vevent(
            CompFilter::new("VEVENT")
                .with_time_range(day(12))
                .with_prop_filter(PropFilter::new("SUMMARY").with_text_match(TextMatch::contains("plan"))),
        ));
        assert!(evaluator.matches_entity(&planning, &entity));
        let next_day = compile(vevent(CompFilter::new("VEVENT").with_time_range(day(13))));
        assert!(!evaluator.matches_entity(&next_day, &entity));
    }

    #[test]
    fn mismatched_pairings_never_match() {
        let resolver = TimeZoneResolver::new();
        let evaluator = FilterEvaluator::new(&resolver, RecurrenceExpander::new(100));
        let summary = Property::text(names::SUMMARY, "Visible");
        let cal = calendar(event("a", &TemporalValue::utc(local(12, 9))));

        let component = FilterNode::Component(compile(CompFilter::new("VEVENT").not_defined()));
        assert!(!evaluator.evaluate(&component, Candidate::Property(&summary)));
        let parameter = FilterNode::Parameter(ParameterFilter::compile(&ParamFilter::new("VALUE")).unwrap());
        assert!(!evaluator.evaluate(&parameter, Candidate::Component(&cal)));
    }
}
