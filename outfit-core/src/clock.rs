//! Local date/time helpers. Everything user-facing is rendered in the
//! configured timezone, never UTC.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ConfigError;

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::Timezone(name.to_string()))
}

pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// "Wednesday 21 Jan" (no leading zero on the day).
pub fn format_long_date<T: TimeZone>(when: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    when.format("%A %-d %b").to_string()
}

/// "7:30 AM".
pub fn format_local_time<T: TimeZone>(when: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    when.format("%-I:%M %p").to_string()
}

/// ISO date used as the history sheet key.
pub fn history_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
