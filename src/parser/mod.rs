use crate::error::ProcessError;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::America::New_York;

/// Format used for due and submission dates in the results
pub const DISPLAY_FORMAT: &str = "%a, %b %d at %I:%M%p";

/// Format used for date cells in the delta sheet
pub const SHEET_FORMAT: &str = "%d-%b-%y %I:%M:%S %p";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a Canvas timestamp into UTC.
///
/// Empty or missing text is `Ok(None)`. Text with an offset is converted to
/// the same instant in UTC rather than keeping its clock time and relabeling
/// it UTC, so `12:00:00-05:00` equals `17:00:00Z`. Text without an offset is
/// taken to already be UTC.
pub fn parse_timestamp(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ProcessError> {
    let raw = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(None),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(naive.and_utc()));
        }
    }

    Err(ProcessError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    })
}

/// Render a timestamp in US Eastern time, e.g. `Tue, Jan 10 at 12:00PM`
pub fn display_eastern(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&New_York).format(DISPLAY_FORMAT).to_string()
}

pub fn sheet_eastern(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&New_York).format(SHEET_FORMAT).to_string()
}
