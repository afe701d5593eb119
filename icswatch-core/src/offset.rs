//! Local wall-clock offset from UTC.

use chrono::{Duration, Local, NaiveDateTime};

/// Whole-hour offset between local time and UTC.
///
/// Computed once at startup and handed to the parser, so UTC timestamps in a
/// document can be turned into local wall-clock times without consulting any
/// global state. Fractional-hour zones are truncated and daylight saving
/// transitions after startup are not picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalOffset {
    hours: i32,
}

impl LocalOffset {
    pub const UTC: LocalOffset = LocalOffset { hours: 0 };

    pub fn from_hours(hours: i32) -> Self {
        LocalOffset { hours }
    }

    /// Compare local and UTC "now" to find the current offset.
    pub fn detect() -> Self {
        let seconds = Local::now().offset().local_minus_utc();
        LocalOffset::from_hours(seconds / 3600)
    }

    pub fn hours(&self) -> i32 {
        self.hours
    }

    /// Convert a UTC timestamp into local wall-clock time.
    pub fn to_local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + Duration::hours(i64::from(self.hours))
    }
}
