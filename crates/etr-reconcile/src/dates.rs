//! Tolerant date normalization for registry date strings.
//!
//! The registry mixes US-style dates (`1/5/2023`, sometimes with a 12-hour
//! time suffix), ISO dates, and ISO date-times. Anything unparsable is
//! treated as "no date".

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse a registry date string to a calendar date.
///
/// Returns `None` for empty or unparsable input; never panics.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    // Offset-carrying timestamps keep their local calendar date.
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// [`parse_date`] over an optional field.
pub fn parse_opt(text: Option<&str>) -> Option<NaiveDate> {
    text.and_then(parse_date)
}
