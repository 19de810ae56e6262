//! `CALDAV:calendar-query` request (RFC 4791 §7.8).

use std::borrow::Cow;

use super::{CalendarFilter, TimeRange};

/// A parsed calendar-query REPORT body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub filter: CalendarFilter,
    /// `CALDAV:timezone-id` (RFC 7809), used for floating values.
    pub timezone_id: Option<String>,
    /// `CALDAV:expand` range inside `calendar-data`.
    pub expand: Option<TimeRange>,
    /// `calendar-data` component/property narrowing.
    pub selection: Option<ComponentSelection>,
    /// `DAV:limit/DAV:nresults`.
    pub limit: Option<u32>,
}

impl CalendarQuery {
    #[must_use]
    pub fn new(filter: CalendarFilter) -> Self {
        Self {
            filter,
            timezone_id: None,
            expand: None,
            selection: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_timezone_id(mut self, tzid: impl Into<String>) -> Self {
        self.timezone_id = Some(tzid.into());
        self
    }

    #[must_use]
    pub fn with_expand(mut self, range: TimeRange) -> Self {
        self.expand = Some(range);
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: ComponentSelection) -> Self {
        self.selection = Some(selection);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `CALDAV:comp` selection for partial retrieval (RFC 4791 §9.6.1).
///
/// `all_props`/`all_comps` stand for `allprop` and `allcomp`; an empty
/// selection with neither set keeps only the component itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentSelection {
    /// Uppercased component name.
    pub name: String,
    pub all_props: bool,
    pub props: Vec<String>,
    pub all_comps: bool,
    pub comps: Vec<ComponentSelection>,
}

impl ComponentSelection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            all_props: false,
            props: Vec::new(),
            all_comps: false,
            comps: Vec::new(),
        }
    }

    /// Selection that keeps everything below `name`.
    #[must_use]
    pub fn everything(name: impl Into<String>) -> Self {
        Self {
            all_props: true,
            all_comps: true,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn with_prop(mut self, prop: impl Into<String>) -> Self {
        self.props.push(prop.into().to_ascii_uppercase());
        self
    }

    #[must_use]
    pub fn with_comp(mut self, comp: ComponentSelection) -> Self {
        self.comps.push(comp);
        self
    }

    #[must_use]
    pub fn keeps_prop(&self, name: &str) -> bool {
        self.all_props || self.props.iter().any(|p| p.eq_ignore_ascii_case(name))
    }

    /// Selection to apply to a child component, if it is kept at all.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Cow<'_, Self>> {
        if let Some(sel) = self.comps.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
            return Some(Cow::Borrowed(sel));
        }
        self.all_comps.then(|| Cow::Owned(Self::everything(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_lookup() {
        let sel = ComponentSelection::new("VCALENDAR").with_comp(
            ComponentSelection::new("vevent")
                .with_prop("summary")
                .with_prop("DTSTART"),
        );
        let event = sel.child("VEVENT").unwrap();
        assert!(event.keeps_prop("SUMMARY"));
        assert!(!event.keeps_prop("LOCATION"));
        assert!(sel.child("VTODO").is_none());

        let all = ComponentSelection::everything("VCALENDAR");
        assert!(all.child("VTODO").unwrap().keeps_prop("anything"));
    }

    #[test]
    fn builder_fills_fields() {
        let query = CalendarQuery::new(CalendarFilter::vcalendar())
            .with_timezone_id("America/Chicago")
            .with_limit(5);
        assert_eq!(query.timezone_id.as_deref(), Some("America/Chicago"));
        assert_eq!(query.limit, Some(5));
        assert!(query.expand.is_none());
    }
}
