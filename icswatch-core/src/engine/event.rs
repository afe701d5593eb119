use std::fmt;

use crate::appointment::Appointment;

/// Availability of a calendar, as of its last refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarStatus {
    /// No refresh has completed yet.
    NotLoaded,
    /// The last refresh fetched and parsed a calendar.
    Online,
    /// The last refresh failed to fetch, or fetched something that is not
    /// a calendar.
    Offline,
}

impl fmt::Display for CalendarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarStatus::NotLoaded => write!(f, "not loaded"),
            CalendarStatus::Online => write!(f, "online"),
            CalendarStatus::Offline => write!(f, "offline"),
        }
    }
}

/// What a refresh ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fetch was already outstanding, or the engine was shut down.
    Skipped,
    /// The engine was shut down while the fetch was in flight.
    Discarded,
    Unreachable,
    InvalidFormat,
    /// Fetched and parsed, checksum matched the current cache.
    Unchanged,
    /// Fetched and parsed, cache replaced.
    Replaced,
}

/// Notifications an engine sends to its observers.
#[derive(Debug, Clone)]
pub enum CalendarEvent {
    NameChanged {
        url: String,
        name: String,
    },
    StatusChanged {
        url: String,
        status: CalendarStatus,
    },
    /// The calendar content changed after it had already been loaded once.
    ContentChanged {
        url: String,
    },
    /// The first refresh of a calendar failed.
    FormatInvalid {
        url: String,
        reason: String,
    },
    NewlyOngoing {
        url: String,
        appointments: Vec<Appointment>,
    },
    RemindersFired {
        url: String,
        appointments: Vec<Appointment>,
    },
}

impl CalendarEvent {
    /// URL of the calendar the event belongs to.
    pub fn url(&self) -> &str {
        match self {
            CalendarEvent::NameChanged { url, .. } => url,
            CalendarEvent::StatusChanged { url, .. } => url,
            CalendarEvent::ContentChanged { url } => url,
            CalendarEvent::FormatInvalid { url, .. } => url,
            CalendarEvent::NewlyOngoing { url, .. } => url,
            CalendarEvent::RemindersFired { url, .. } => url,
        }
    }
}
