//! Calendar components (RFC 5545 §3.4-3.6) as a plain tree.

use std::fmt;

use super::Property;

/// The component names the engine knows by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Calendar,
    Event,
    Todo,
    Journal,
    FreeBusy,
    Timezone,
    Alarm,
    Standard,
    Daylight,
    /// Anything else, including X- components. The name lives on the
    /// [`Component`].
    Unknown,
}

const KNOWN: [(ComponentKind, &str); 9] = [
    (ComponentKind::Calendar, "VCALENDAR"),
    (ComponentKind::Event, "VEVENT"),
    (ComponentKind::Todo, "VTODO"),
    (ComponentKind::Journal, "VJOURNAL"),
    (ComponentKind::FreeBusy, "VFREEBUSY"),
    (ComponentKind::Timezone, "VTIMEZONE"),
    (ComponentKind::Alarm, "VALARM"),
    (ComponentKind::Standard, "STANDARD"),
    (ComponentKind::Daylight, "DAYLIGHT"),
];

impl ComponentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::Timezone => "VTIMEZONE",
            Self::Alarm => "VALARM",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::Unknown => "X-UNKNOWN",
        }
    }

    /// Kind for a component name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        KNOWN
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map_or(Self::Unknown, |(kind, _)| *kind)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component with its properties in stored order and its nested
/// components, e.g. a VCALENDAR holding VEVENTs holding VALARMs.
///
/// `name` is authoritative for filtering; `kind` is a convenience for the
/// names listed in [`ComponentKind`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Component {
    pub kind: Option<ComponentKind>,
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Component>,
}

impl Component {
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind: Some(kind),
            name: kind.as_str().to_owned(),
            ..Self::default()
        }
    }

    /// A component known only by name, such as an X- component.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            kind: Some(ComponentKind::from_name(name)),
            name: name.to_ascii_uppercase(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calendar() -> Self {
        Self::new(ComponentKind::Calendar)
    }

    #[must_use]
    pub fn event() -> Self {
        Self::new(ComponentKind::Event)
    }

    #[must_use]
    pub fn timezone() -> Self {
        Self::new(ComponentKind::Timezone)
    }

    #[must_use]
    pub fn alarm() -> Self {
        Self::new(ComponentKind::Alarm)
    }

    pub fn add_property(&mut self, prop: Property) {
        self.properties.push(prop);
    }

    #[must_use]
    pub fn with_property(mut self, prop: Property) -> Self {
        self.add_property(prop);
        self
    }

    pub fn add_child(&mut self, child: Component) {
        self.children.push(child);
    }

    #[must_use]
    pub fn with_child(mut self, child: Component) -> Self {
        self.add_child(child);
        self
    }

    /// Case-insensitive comparison against the component name.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// ## Summary
    /// First property called `name`, ignoring case.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// ## Summary
    /// Every property called `name`, ignoring case, in stored order.
    #[must_use]
    pub fn get_properties(&self, name: &str) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect()
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.get_property(super::names::UID)?.as_text()
    }

    /// Nested components called `name`, ignoring case.
    #[must_use]
    pub fn children_named(&self, name: &str) -> Vec<&Component> {
        self.children.iter().filter(|c| c.is_named(name)).collect()
    }

    #[must_use]
    pub fn alarms(&self) -> Vec<&Component> {
        self.children
            .iter()
            .filter(|c| c.kind == Some(ComponentKind::Alarm))
            .collect()
    }
}
