//! # Temporal Helpers
//!
//! ACORD carries calendar values as plain strings: dates as `YYYY-MM-DD`
//! and times as `HH:MM:SS`. This module parses and formats those shapes
//! strictly (no single-digit months, no offsets, no fractional seconds) and
//! defines the [`Clock`] seam used for every execution timestamp the gateway
//! stamps onto a response.
//!
//! Runtime code uses [`SystemClock`]. Tests inject a [`FixedClock`] so that
//! two identical requests produce byte-identical responses.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// `YYYY-MM-DD`
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// `HH:MM:SS`
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Parse an ACORD date (`YYYY-MM-DD`). Returns `None` for anything else,
/// including calendar-invalid values such as `2024-02-30`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok()
}

/// Parse an ACORD time (`HH:MM:SS`, 24-hour clock).
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let bytes = input.as_bytes();
    let shaped = bytes.len() == 8
        && bytes[2] == b':'
        && bytes[5] == b':'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveTime::parse_from_str(input, TIME_FORMAT).ok()
}

/// Render the date portion of an instant as `YYYY-MM-DD`.
pub fn format_date(instant: &DateTime<Utc>) -> String {
    instant.format(DATE_FORMAT).to_string()
}

/// Render the time portion of an instant as `HH:MM:SS`.
pub fn format_time(instant: &DateTime<Utc>) -> String {
    instant.format(TIME_FORMAT).to_string()
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at `instant`.
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Parse an RFC 3339 instant (`2024-08-30T15:30:00Z`).
    pub fn from_rfc3339(input: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(input).map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
