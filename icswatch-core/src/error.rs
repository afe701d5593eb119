//! Error types for icswatch.

use thiserror::Error;

/// Errors that can occur while fetching, parsing or managing calendars.
///
/// None of these are fatal: a failed refresh leaves the previously parsed
/// appointments in place until a later refresh succeeds.
#[derive(Error, Debug)]
pub enum IcsWatchError {
    #[error("Could not fetch calendar: {0}")]
    FetchFailure(String),

    #[error("Document is not an ICS calendar (missing BEGIN:VCALENDAR header)")]
    InvalidFormat,

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Calendar already added: {0}")]
    DuplicateCalendar(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for icswatch operations.
pub type IcsWatchResult<T> = Result<T, IcsWatchError>;
