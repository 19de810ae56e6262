/// Prefix shared by iCalendar experimental names
pub const X_NAME_PREFIX: &str = "X-";

/// Parameter flagging a date as having no specific time of day
pub const PARAM_X_OSAF_ANYTIME: &str = const_str::concat!(X_NAME_PREFIX, "OSAF-ANYTIME");

/// Collations accepted by `CALDAV:text-match` (RFC 4790)
pub const COLLATION_OCTET: &str = "i;octet";
pub const COLLATION_ASCII_CASEMAP: &str = "i;ascii-casemap";
pub const COLLATION_UNICODE_CASEMAP: &str = "i;unicode-casemap";

/// Upper bound on instances produced for one entity when no window is given
pub const DEFAULT_MAX_INSTANCES: u32 = 1000;

/// Default tracing filter when the configuration does not name one
pub const DEFAULT_LOG_LEVEL: &str = "info";
