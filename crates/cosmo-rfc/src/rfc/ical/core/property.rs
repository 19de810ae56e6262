//! Properties (RFC 5545 §3.1, §3.8).

use super::{Date, DateTime, Duration, Parameter, Value};

/// One content line: `NAME;PARAM=x:value`.
///
/// `raw_value` is the value exactly as stored. Text matching runs against
/// it for values that have no textual form of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Parameter>,
    pub value: Value,
    pub raw_value: String,
}

impl Property {
    fn build(name: impl Into<String>, value: Value, raw_value: String) -> Self {
        let mut name = name.into();
        name.make_ascii_uppercase();
        Self {
            name,
            params: Vec::new(),
            value,
            raw_value,
        }
    }

    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let raw = value.into();
        Self::build(name, Value::Text(raw.clone()), raw)
    }

    /// Comma-separated texts such as `CATEGORIES`.
    #[must_use]
    pub fn text_list(name: impl Into<String>, values: Vec<String>) -> Self {
        let raw = values.join(",");
        Self::build(name, Value::TextList(values), raw)
    }

    #[must_use]
    pub fn integer(name: impl Into<String>, value: i32) -> Self {
        Self::build(name, Value::Integer(value), value.to_string())
    }

    /// An RRULE or EXRULE body, left as text for the rule engine.
    #[must_use]
    pub fn recur(name: impl Into<String>, rule: impl Into<String>) -> Self {
        let raw = rule.into();
        Self::build(name, Value::Recur(raw.clone()), raw)
    }

    /// ## Summary
    /// A DATE-TIME property. Zoned values get a `TZID` parameter.
    #[must_use]
    pub fn datetime(name: impl Into<String>, dt: DateTime) -> Self {
        let raw = dt.to_string();
        let tzid = dt.tzid().map(Parameter::tzid);
        let mut prop = Self::build(name, Value::DateTime(dt), raw);
        prop.params.extend(tzid);
        prop
    }

    /// ## Summary
    /// A DATE property, marked `VALUE=DATE`.
    #[must_use]
    pub fn date(name: impl Into<String>, d: Date) -> Self {
        let raw = d.to_string();
        Self::build(name, Value::Date(d), raw).with_param(Parameter::value_type("DATE"))
    }

    #[must_use]
    pub fn duration(name: impl Into<String>, d: Duration) -> Self {
        let raw = d.to_string();
        Self::build(name, Value::Duration(d), raw)
    }

    #[must_use]
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.set_param(param);
        self
    }

    /// Replaces any parameter of the same name.
    pub fn set_param(&mut self, param: Parameter) {
        self.params.retain(|p| p.name != param.name);
        self.params.push(param);
    }

    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name).and_then(Parameter::value)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_text()
    }

    /// ## Summary
    /// The strings a `text-match` is applied to: one per list element for
    /// textual values, otherwise the raw value.
    #[must_use]
    pub fn text_values(&self) -> Vec<&str> {
        match self.value.text_values() {
            values if values.is_empty() => vec![self.raw_value.as_str()],
            values => values,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self.value {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// A single DATE-TIME; lists and DATE values give `None`.
    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        match &self.value {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        match &self.value {
            Value::Duration(d) => Some(d),
            _ => None,
        }
    }
}

/// Property names the engine reads or writes.
pub mod names {
    pub const CATEGORIES: &str = "CATEGORIES";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const LOCATION: &str = "LOCATION";
    pub const STATUS: &str = "STATUS";
    pub const SUMMARY: &str = "SUMMARY";

    pub const DTEND: &str = "DTEND";
    pub const DTSTART: &str = "DTSTART";
    pub const DUE: &str = "DUE";
    pub const DURATION: &str = "DURATION";

    pub const TZID: &str = "TZID";
    pub const TZNAME: &str = "TZNAME";
    pub const TZOFFSETFROM: &str = "TZOFFSETFROM";
    pub const TZOFFSETTO: &str = "TZOFFSETTO";

    pub const RECURRENCE_ID: &str = "RECURRENCE-ID";
    pub const UID: &str = "UID";

    pub const EXDATE: &str = "EXDATE";
    pub const EXRULE: &str = "EXRULE";
    pub const RDATE: &str = "RDATE";
    pub const RRULE: &str = "RRULE";

    pub const ACTION: &str = "ACTION";
    pub const REPEAT: &str = "REPEAT";
    pub const TRIGGER: &str = "TRIGGER";
}
