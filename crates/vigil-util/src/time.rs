//! Time utilities for vigild
//!
//! Provides wall-clock helpers, the strict `HH:MM` time-of-day used by
//! scheduled tasks, and a monotonic instant for cooldown enforcement.

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::VigilError;

/// Get the current local time
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Format a DateTime for display and alert captions
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Compact timestamp for evidence filenames
pub fn format_file_stamp(dt: &DateTime<Local>) -> String {
    dt.format("%Y%m%d_%H%M%S").to_string()
}

/// A strict `HH:MM` 24-hour time of day.
///
/// Parsing is intentionally stricter than `chrono`'s `%H:%M`: exactly two
/// digits for the hour and minute, so `"9:30"` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Parse a strict `HH:MM` string
    pub fn parse(s: &str) -> Result<Self, VigilError> {
        let bytes = s.as_bytes();
        let valid = bytes.len() == 5
            && bytes[2] == b':'
            && bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_digit()
            && bytes[3].is_ascii_digit()
            && bytes[4].is_ascii_digit();

        if !valid {
            return Err(VigilError::InvalidTimeFormat(s.to_string()));
        }

        let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
        let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');

        Self::new(hour, minute).ok_or_else(|| VigilError::InvalidTimeFormat(s.to_string()))
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Whether the given local time falls within this minute
    pub fn matches(&self, dt: &DateTime<Local>) -> bool {
        dt.hour() == u32::from(self.hour) && dt.minute() == u32::from(self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = VigilError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

/// A point in monotonic time, immune to wall-clock changes.
///
/// The motion cooldown is enforced against this, never the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.duration_since(earlier.0)
    }
}
