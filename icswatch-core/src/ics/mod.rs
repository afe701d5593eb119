//! Parsing of the ICS calendar subset icswatch consumes.
//!
//! The document is normalized (carriage returns stripped), scanned into
//! unfolded content lines, checksummed with volatile fields left out, and
//! split into VEVENT blocks that become appointments and reminders.

mod checksum;
mod parse;
pub mod scan;
mod trigger;

pub use checksum::{NEVER_LOADED, checksum};
pub use parse::{IcsDocument, ParsedAppointments};
pub use trigger::parse_trigger;
