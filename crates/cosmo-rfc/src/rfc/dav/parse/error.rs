//! Errors raised while reading a REPORT body.

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// A malformed or unsupported request body. The protocol layer answers 400
/// for all of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("body is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("expected a <{0}> element")]
    MissingElement(&'static str),

    #[error("<{0}> is not allowed here")]
    UnexpectedElement(String),

    #[error("<{element}> needs a {attribute} attribute")]
    MissingAttribute { element: String, attribute: String },

    #[error("{0}")]
    InvalidValue(String),
}

impl ParseError {
    pub(crate) fn xml(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub(crate) fn missing_element(name: &'static str) -> Self {
        Self::MissingElement(name)
    }

    pub(crate) fn unexpected_element(name: &str) -> Self {
        Self::UnexpectedElement(name.to_owned())
    }

    pub(crate) fn missing_attribute(element: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            element: element.to_owned(),
            attribute: attribute.to_owned(),
        }
    }

    pub(crate) fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }
}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for ParseError {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
