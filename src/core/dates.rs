//! Calendar-day helpers: intake dates are plain `YYYY-MM-DD` strings on disk.

use chrono::{Local, NaiveDate};

use crate::core::errors::{Result, WtrError};

/// On-disk date format. No time-of-day component.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in the local timezone.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` string.
pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| WtrError::InvalidDate {
        value: raw.to_string(),
    })
}

/// Render a date in the on-disk format.
#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}
