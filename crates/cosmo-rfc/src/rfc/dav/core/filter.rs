//! `CALDAV:filter` tree (RFC 4791 §9.7).

use chrono::{DateTime, Utc};

/// Root of a calendar-query filter.
///
/// The root always names `VCALENDAR`; the interesting tests live in the
/// component filters nested below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFilter {
    pub root: CompFilter,
}

impl CalendarFilter {
    #[must_use]
    pub fn vcalendar() -> Self {
        Self {
            root: CompFilter::new("VCALENDAR"),
        }
    }

    /// Adds a component filter below the root (e.g. `VEVENT`).
    #[must_use]
    pub fn with_comp(mut self, filter: CompFilter) -> Self {
        self.root.comp_filters.push(filter);
        self
    }

    /// Time ranges carried by the root's direct component filters.
    pub fn top_level_time_ranges(&self) -> impl Iterator<Item = &TimeRange> {
        self.root
            .comp_filters
            .iter()
            .filter_map(|comp| comp.time_range.as_ref())
    }
}

/// Component filter (RFC 4791 §9.7.1).
///
/// Child tests are combined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompFilter {
    /// Uppercased component name.
    pub name: String,
    pub is_not_defined: bool,
    pub time_range: Option<TimeRange>,
    pub prop_filters: Vec<PropFilter>,
    pub comp_filters: Vec<CompFilter>,
}

impl CompFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            is_not_defined: false,
            time_range: None,
            prop_filters: Vec::new(),
            comp_filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_defined(mut self) -> Self {
        self.is_not_defined = true;
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    #[must_use]
    pub fn with_prop_filter(mut self, filter: PropFilter) -> Self {
        self.prop_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_comp_filter(mut self, filter: CompFilter) -> Self {
        self.comp_filters.push(filter);
        self
    }

    /// Whether this filter or any filter below it carries a time-range.
    #[must_use]
    pub fn has_time_range(&self) -> bool {
        self.time_range.is_some()
            || self.prop_filters.iter().any(|p| p.time_range.is_some())
            || self.comp_filters.iter().any(Self::has_time_range)
    }
}

/// Property filter (RFC 4791 §9.7.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropFilter {
    /// Uppercased property name.
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatch>,
    pub time_range: Option<TimeRange>,
    pub param_filters: Vec<ParamFilter>,
}

impl PropFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            is_not_defined: false,
            text_match: None,
            time_range: None,
            param_filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_defined(mut self) -> Self {
        self.is_not_defined = true;
        self
    }

    #[must_use]
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    #[must_use]
    pub fn with_param_filter(mut self, filter: ParamFilter) -> Self {
        self.param_filters.push(filter);
        self
    }
}

/// Parameter filter (RFC 4791 §9.7.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamFilter {
    /// Uppercased parameter name.
    pub name: String,
    pub is_not_defined: bool,
    pub text_match: Option<TextMatch>,
}

impl ParamFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            is_not_defined: false,
            text_match: None,
        }
    }

    #[must_use]
    pub fn not_defined(mut self) -> Self {
        self.is_not_defined = true;
        self
    }

    #[must_use]
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }
}

/// `CALDAV:text-match` (RFC 4791 §9.7.5).
///
/// `collation` is kept as sent; it is validated when the filter is
/// evaluated so that an unsupported collation surfaces as a request error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub value: String,
    pub collation: Option<String>,
    pub match_type: MatchType,
    pub negate: bool,
}

impl TextMatch {
    fn with_type(value: impl Into<String>, match_type: MatchType) -> Self {
        Self {
            value: value.into(),
            collation: None,
            match_type,
            negate: false,
        }
    }

    #[must_use]
    pub fn contains(value: impl Into<String>) -> Self {
        Self::with_type(value, MatchType::Contains)
    }

    #[must_use]
    pub fn equals(value: impl Into<String>) -> Self {
        Self::with_type(value, MatchType::Equals)
    }

    #[must_use]
    pub fn starts_with(value: impl Into<String>) -> Self {
        Self::with_type(value, MatchType::StartsWith)
    }

    #[must_use]
    pub fn ends_with(value: impl Into<String>) -> Self {
        Self::with_type(value, MatchType::EndsWith)
    }

    #[must_use]
    pub fn negate(mut self) -> Self {
        self.negate = true;
        self
    }

    #[must_use]
    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

impl MatchType {
    /// Reads a `match-type` attribute value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contains" => Some(Self::Contains),
            "equals" => Some(Self::Equals),
            "starts-with" => Some(Self::StartsWith),
            "ends-with" => Some(Self::EndsWith),
            _ => None,
        }
    }
}

/// `CALDAV:time-range`: the half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Returns `None` unless `start < end`.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Smallest range covering both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn time_range_requires_ordered_bounds() {
        assert!(TimeRange::new(utc(2006, 3, 1), utc(2006, 5, 1)).is_some());
        assert!(TimeRange::new(utc(2006, 3, 1), utc(2006, 3, 1)).is_none());
        assert!(TimeRange::new(utc(2006, 5, 1), utc(2006, 3, 1)).is_none());
    }

    #[test]
    fn top_level_ranges_union() {
        let march = TimeRange::new(utc(2006, 3, 1), utc(2006, 4, 1)).unwrap();
        let june = TimeRange::new(utc(2006, 6, 1), utc(2006, 7, 1)).unwrap();
        let filter = CalendarFilter::vcalendar()
            .with_comp(CompFilter::new("vevent").with_time_range(march))
            .with_comp(CompFilter::new("VTODO").with_time_range(june));

        let window = filter
            .top_level_time_ranges()
            .copied()
            .reduce(TimeRange::union)
            .unwrap();
        assert_eq!(window.start, utc(2006, 3, 1));
        assert_eq!(window.end, utc(2006, 7, 1));
        assert_eq!(filter.root.comp_filters[0].name, "VEVENT");
    }

    #[test]
    fn nested_time_ranges_are_found() {
        let range = TimeRange::new(utc(2006, 3, 1), utc(2006, 4, 1)).unwrap();
        let comp = CompFilter::new("VEVENT")
            .with_comp_filter(CompFilter::new("VALARM").with_time_range(range));
        assert!(comp.has_time_range());
        assert!(!CompFilter::new("VEVENT").has_time_range());
    }

    #[test]
    fn match_type_attribute() {
        assert_eq!(MatchType::parse("starts-with"), Some(MatchType::StartsWith));
        assert_eq!(MatchType::parse("fuzzy"), None);
        let m = TextMatch::equals("here").negate().with_collation("i;octet");
        assert!(m.negate);
        assert_eq!(m.match_type, MatchType::Equals);
        assert_eq!(m.collation.as_deref(), Some("i;octet"));
    }
}
