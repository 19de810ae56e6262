//! Property parameters (RFC 5545 §3.2).

use std::fmt;

/// `NAME=value[,value...]` attached to a property, e.g. the
/// `TZID=America/New_York` in `DTSTART;TZID=America/New_York:20070514T100000`.
///
/// Names are stored uppercased. Values keep the client's spelling; most
/// parameters carry one, list parameters such as `MEMBER` carry several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self::list(name, [value])
    }

    #[must_use]
    pub fn list(name: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        let mut name = name.into();
        name.make_ascii_uppercase();
        Self {
            name,
            values: values.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn tzid(tzid: impl Into<String>) -> Self {
        Self::new("TZID", tzid)
    }

    /// `VALUE=` override of a property's default type.
    #[must_use]
    pub fn value_type(value_type: impl Into<String>) -> Self {
        Self::new("VALUE", value_type)
    }

    /// `RELATED=` on an alarm trigger, `START` or `END`.
    #[must_use]
    pub fn related(related: impl Into<String>) -> Self {
        Self::new("RELATED", related)
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Whether any value equals `value` under ASCII case folding.
    #[must_use]
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        let mut values = self.values.iter();
        if let Some(first) = values.next() {
            write!(f, "={first}")?;
            for value in values {
                write!(f, ",{value}")?;
            }
        }
        Ok(())
    }
}
