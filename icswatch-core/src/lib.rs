//! Core of icswatch.
//!
//! This crate turns remote ICS documents into a time-partitioned appointment
//! cache and drives "appointment started" and "reminder fired" notifications:
//! - `ics` scans and parses the calendar subset icswatch understands
//! - `appointment` holds the parsed events and their human-readable timing
//! - `cache` partitions appointments into upcoming, ongoing and reminders
//! - `engine` keeps one calendar in sync and runs its notification timer
//! - `collection` owns all watched calendars and refreshes them periodically

pub mod appointment;
pub mod cache;
pub mod collection;
pub mod config;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod ics;
pub mod offset;
pub mod url_list;

#[cfg(test)]
mod testing;

pub use appointment::Appointment;
pub use cache::AppointmentCache;
pub use collection::{AutoRefresh, CalendarCollection};
pub use downloader::{Downloader, HttpDownloader};
pub use engine::{
    CalendarEvent, CalendarStatus, CalendarSyncEngine, EngineSettings, RefreshOutcome,
};
pub use error::{IcsWatchError, IcsWatchResult};
pub use offset::LocalOffset;
