//! Timestamp formatting in the shape Spanner expects for `TIMESTAMP` literals.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::SpannerDbError;

/// `2024-05-01T10:20:30.000Z`: whole seconds, always UTC, literal `.000Z` suffix.
const SPANNER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

const OFFSET_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S %:z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Format any zoned timestamp as UTC with a `.000Z` suffix; fractional seconds are dropped.
#[must_use]
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.with_timezone(&Utc)
        .format(SPANNER_TIMESTAMP_FORMAT)
        .to_string()
}

/// The current time, formatted like [`format_date`].
#[must_use]
pub fn format_now() -> String {
    format_date(&Utc::now())
}

/// Parse a timestamp the framework produced and reformat it like [`format_date`].
///
/// Accepted inputs: `now`, RFC 3339, RFC 2822, `YYYY-MM-DD[T ]HH:MM:SS[.fff]` with or
/// without a `+hhmm`/`+hh:mm` offset (optionally space-separated), `YYYY-MM-DD`, and
/// `@<unix seconds>`. Inputs without an offset are read as UTC.
///
/// ```rust
/// use spanner_adapter::convert_date;
///
/// assert_eq!(convert_date("2024-05-01 10:20:30")?, "2024-05-01T10:20:30.000Z");
/// assert_eq!(convert_date("2024-05-01T12:20:30+02:00")?, "2024-05-01T10:20:30.000Z");
/// # Ok::<(), spanner_adapter::SpannerDbError>(())
/// ```
///
/// # Errors
/// Returns `SpannerDbError::InvalidDate` when the input matches none of the formats.
pub fn convert_date(input: &str) -> Result<String, SpannerDbError> {
    parse_timestamp(input).map(|dt| format_date(&dt))
}

pub(crate) fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, SpannerDbError> {
    let trimmed = input.trim();

    if let Some(secs) = trimmed.strip_prefix('@') {
        return secs
            .parse::<i64>()
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .ok_or_else(|| SpannerDbError::InvalidDate(input.to_string()));
    }

    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    Err(SpannerDbError::InvalidDate(input.to_string()))
}
