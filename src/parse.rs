//! Raw timestamp parsing.
//!
//! Timestamps arrive as `YYYY-MM-DDTHH:MM:SS`, optionally followed by a
//! fractional second and a numeric UTC offset (`+0000`). Offsets are folded
//! into the instant, which is then carried around as a naive UTC value.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIMESTAMP_WITH_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    match NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        Ok(instant) => Ok(instant),
        Err(naive_err) => DateTime::parse_from_str(trimmed, TIMESTAMP_WITH_OFFSET_FORMAT)
            .map(|with_offset| with_offset.naive_utc())
            .map_err(|_| Error::Parse {
                raw: raw.to_string(),
                source: naive_err,
            }),
    }
}

/// Parse a focus argument: `now` (yields `None`), a full timestamp, or a bare
/// date taken at midnight.
pub fn parse_focus(raw: &str) -> Result<Option<NaiveDateTime>> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(None);
    }
    let midnight = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0));
    if midnight.is_some() {
        return Ok(midnight);
    }
    parse_timestamp(trimmed).map(Some)
}
