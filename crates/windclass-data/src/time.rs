//! Timestamp parsing and binning

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Format used when writing timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse an ISO-8601 timestamp, with or without a trailing `Z`
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);
    for format in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::Timestamp(raw.to_string()))
}

pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Left edge of the `cadence` bin containing `t`, bins aligned to the Unix epoch
pub(crate) fn bin_start(t: &NaiveDateTime, cadence: TimeDelta) -> Result<NaiveDateTime> {
    let width = cadence.num_seconds();
    if width <= 0 {
        return Err(Error::InvalidWindow(format!(
            "cadence must be at least one second, got {cadence}"
        )));
    }
    let secs = t.and_utc().timestamp();
    let start = secs.div_euclid(width) * width;
    DateTime::from_timestamp(start, 0)
        .map(|d| d.naive_utc())
        .ok_or_else(|| Error::Timestamp(format!("{start} seconds is out of range")))
}
