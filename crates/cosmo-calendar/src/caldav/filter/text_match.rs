//! `CALDAV:text-match` with RFC 4790 collations.

use std::borrow::Cow;

use icu::casemap::CaseMapper;

use cosmo_core::constants::{COLLATION_ASCII_CASEMAP, COLLATION_OCTET, COLLATION_UNICODE_CASEMAP};
use cosmo_rfc::rfc::dav::core::{MatchType, TextMatch};

use crate::error::RequestError;

/// Comparison rule for text values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    /// `i;octet`: byte equality.
    Octet,
    /// `i;ascii-casemap`: caseless on ASCII letters only.
    #[default]
    AsciiCasemap,
    /// `i;unicode-casemap`: Unicode case folding.
    UnicodeCasemap,
}

impl Collation {
    /// ## Summary
    /// Looks a collation up by name; no name means `i;ascii-casemap`.
    ///
    /// ## Errors
    /// Returns [`RequestError::UnsupportedCollation`] for any other name.
    pub fn from_name(name: Option<&str>) -> Result<Self, RequestError> {
        match name {
            None | Some(COLLATION_ASCII_CASEMAP) => Ok(Self::AsciiCasemap),
            Some(COLLATION_OCTET) => Ok(Self::Octet),
            Some(COLLATION_UNICODE_CASEMAP) => Ok(Self::UnicodeCasemap),
            Some(other) => Err(RequestError::UnsupportedCollation(other.to_string())),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Octet => COLLATION_OCTET,
            Self::AsciiCasemap => COLLATION_ASCII_CASEMAP,
            Self::UnicodeCasemap => COLLATION_UNICODE_CASEMAP,
        }
    }

    fn fold(self, text: &str) -> Cow<'_, str> {
        match self {
            Self::Octet => Cow::Borrowed(text),
            Self::AsciiCasemap => Cow::Owned(text.to_ascii_lowercase()),
            Self::UnicodeCasemap => CaseMapper::new().fold_string(text),
        }
    }
}

/// A text-match with its collation resolved and its needle folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    needle: String,
    collation: Collation,
    match_type: MatchType,
    negate: bool,
}

impl TextMatcher {
    /// ## Summary
    /// Prepares a parsed text-match for evaluation.
    ///
    /// ## Errors
    /// Returns [`RequestError::UnsupportedCollation`] for an unknown
    /// collation.
    pub fn new(text_match: &TextMatch) -> Result<Self, RequestError> {
        let collation = Collation::from_name(text_match.collation.as_deref())?;
        Ok(Self {
            needle: collation.fold(&text_match.value).into_owned(),
            collation,
            match_type: text_match.match_type,
            negate: text_match.negate,
        })
    }

    #[must_use]
    pub fn collation(&self) -> Collation {
        self.collation
    }

    /// Match of one value, before negation.
    fn hits(&self, value: &str) -> bool {
        let value = self.collation.fold(value);
        let needle = self.needle.as_str();
        match self.match_type {
            MatchType::Equals => value == needle,
            MatchType::Contains => value.contains(needle),
            MatchType::StartsWith => value.starts_with(needle),
            MatchType::EndsWith => value.ends_with(needle),
        }
    }

    /// Whether a single value matches, negation applied.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.hits(value) != self.negate
    }

    /// Whether a multi-valued property matches: some value hits, with the
    /// negation applied to that outcome.
    #[must_use]
    pub fn matches_any<'v>(&self, values: impl IntoIterator<Item = &'v str>) -> bool {
        values.into_iter().any(|value| self.hits(value)) != self.negate
    }
}
