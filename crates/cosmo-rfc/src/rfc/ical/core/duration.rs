//! DURATION values (RFC 5545 §3.3.6).

use std::fmt;

use chrono::TimeDelta;

use crate::error::{RfcError, RfcResult};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// A signed span in either week form (`P2W`) or day-time form
/// (`P1DT2H30M`). Days are nominal 24-hour days here; there are no year
/// or month designators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    pub negative: bool,
    /// Set alone; the other units stay zero in week form.
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Duration {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Flips the sign.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negative = !self.negative;
        self
    }

    #[must_use]
    pub fn as_seconds(&self) -> i64 {
        let magnitude = [
            (self.weeks, WEEK),
            (self.days, DAY),
            (self.hours, HOUR),
            (self.minutes, MINUTE),
            (self.seconds, 1),
        ]
        .into_iter()
        .map(|(count, unit)| i64::from(count) * unit)
        .sum::<i64>();
        if self.negative { -magnitude } else { magnitude }
    }

    #[must_use]
    pub fn to_time_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.as_seconds())
    }

    /// ## Summary
    /// Reads `[+|-]P` followed by either `nW` or any of `nD` and
    /// `T[nH][nM][nS]`, e.g. `-PT15M`.
    ///
    /// ## Errors
    /// Returns [`RfcError::InvalidValue`] if the text is not a valid DURATION.
    pub fn parse(text: &str) -> RfcResult<Self> {
        let invalid = || RfcError::invalid_value("DURATION", text);
        let text = text.trim();

        let (negative, unsigned) = if let Some(rest) = text.strip_prefix('-') {
            (true, rest)
        } else {
            (false, text.strip_prefix('+').unwrap_or(text))
        };
        let body = unsigned.strip_prefix('P').ok_or_else(invalid)?;
        let (date_part, time_part) = match body.split_once('T') {
            Some((_, "")) => return Err(invalid()),
            Some((date, time)) => (date, Some(time)),
            None => (body, None),
        };

        let mut duration = Self {
            negative,
            ..Self::zero()
        };
        let mut any = false;
        for (amount, designator) in designated(date_part).ok_or_else(invalid)? {
            match designator {
                'W' => duration.weeks = amount,
                'D' => duration.days = amount,
                _ => return Err(invalid()),
            }
            any = true;
        }
        for (amount, designator) in designated(time_part.unwrap_or_default()).ok_or_else(invalid)? {
            match designator {
                'H' => duration.hours = amount,
                'M' => duration.minutes = amount,
                'S' => duration.seconds = amount,
                _ => return Err(invalid()),
            }
            any = true;
        }

        if any { Ok(duration) } else { Err(invalid()) }
    }
}

/// Splits `1D2H` style text into `(1, 'D'), (2, 'H')`. `None` when a number
/// lacks its designator or a designator lacks its number.
fn designated(text: &str) -> Option<Vec<(u32, char)>> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (at, c) in text.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        let amount = text[start..at].parse().ok()?;
        parts.push((amount, c));
        start = at + c.len_utf8();
    }
    (start == text.len()).then_some(parts)
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.negative { "-P" } else { "P" })?;
        if self.weeks > 0 {
            return write!(f, "{}W", self.weeks);
        }
        let timeless = self.hours == 0 && self.minutes == 0 && self.seconds == 0;
        if self.days > 0 || timeless {
            write!(f, "{}D", self.days)?;
        }
        if timeless {
            return Ok(());
        }
        f.write_str("T")?;
        for (count, unit) in [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')] {
            if count > 0 {
                write!(f, "{count}{unit}")?;
            }
        }
        Ok(())
    }
}
