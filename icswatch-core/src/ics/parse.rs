use chrono::NaiveDateTime;

use crate::appointment::{Appointment, unescape_text};
use crate::cache::AppointmentCache;
use crate::error::{IcsWatchError, IcsWatchResult};
use crate::ics::checksum::checksum;
use crate::ics::scan::{ContentLine, FieldKey, normalize, scan};
use crate::ics::trigger::parse_trigger;
use crate::offset::LocalOffset;

const HEADER: &str = "BEGIN:VCALENDAR";

/// A fetched calendar document that passed the format check.
#[derive(Debug, Clone)]
pub struct IcsDocument {
    name: Option<String>,
    checksum: u64,
    lines: Vec<ContentLine>,
    offset: LocalOffset,
}

/// Appointments and reminders extracted from a document at a given "now".
#[derive(Debug, Clone, Default)]
pub struct ParsedAppointments {
    pub appointments: Vec<Appointment>,
    /// Trigger time and the appointment it reminds of.
    pub reminders: Vec<(NaiveDateTime, Appointment)>,
}

impl IcsDocument {
    /// Check the header, scan the document and compute its checksum.
    ///
    /// Fails with `InvalidFormat` when the document does not start with
    /// `BEGIN:VCALENDAR`.
    pub fn parse(raw: &str, offset: LocalOffset) -> IcsWatchResult<Self> {
        let text = normalize(raw);

        if !text.starts_with(HEADER) {
            return Err(IcsWatchError::InvalidFormat);
        }

        let lines = scan(&text);
        let checksum = checksum(&text, &lines);
        let name = lines
            .iter()
            .find(|l| l.key == FieldKey::CalendarName)
            .map(|l| unescape_text(l.value.trim()));

        Ok(IcsDocument {
            name,
            checksum,
            lines,
            offset,
        })
    }

    /// The X-WR-CALNAME value, if the document declares one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Content lines of every complete VEVENT block, in document order.
    ///
    /// Extraction stops at the first structural problem: an END:VEVENT with
    /// no open block, a BEGIN:VEVENT inside an open block, or a block that is
    /// never closed.
    pub fn event_blocks(&self) -> Vec<&[ContentLine]> {
        let mut blocks = Vec::new();
        let mut open: Option<usize> = None;

        for (i, line) in self.lines.iter().enumerate() {
            if line.begins("VEVENT") {
                if open.is_some() {
                    break;
                }
                open = Some(i);
            } else if line.ends("VEVENT") {
                match open.take() {
                    Some(start) => blocks.push(&self.lines[start..i]),
                    None => break,
                }
            }
        }

        blocks
    }

    /// Extract every appointment that has not ended by `now`, plus the
    /// reminders of those appointments that have not passed yet.
    ///
    /// Blocks without a usable DTSTART/DTEND are dropped one by one.
    pub fn appointments(&self, now: NaiveDateTime) -> ParsedAppointments {
        let mut parsed = ParsedAppointments::default();

        for block in self.event_blocks() {
            let apt = match Appointment::from_lines(block, self.offset) {
                Ok(apt) => apt,
                Err(e) => {
                    tracing::debug!("Dropping event block: {}", e);
                    continue;
                }
            };

            if apt.end() <= now {
                continue;
            }

            for trigger in block.iter().filter(|l| l.key == FieldKey::Trigger) {
                let Some(before) = parse_trigger(trigger) else {
                    continue;
                };
                let Some(at) = apt.start().checked_sub_signed(before) else {
                    debug_assert!(false, "reminder time out of range for {}", apt);
                    continue;
                };
                if now <= at {
                    parsed.reminders.push((at, apt.clone()));
                }
            }

            parsed.appointments.push(apt);
        }

        parsed
    }

    /// Build a fresh cache from this document as seen at `now`.
    pub fn to_cache(&self, now: NaiveDateTime) -> AppointmentCache {
        AppointmentCache::from_parsed(self.appointments(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn parse(doc: &str) -> IcsDocument {
        IcsDocument::parse(doc, LocalOffset::UTC).expect("Should parse")
    }

    const CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
X-WR-CALNAME:Team\\, work\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20250301T090000\r\n\
DTEND:20250301T100000\r\n\
SUMMARY:Planning\r\n\
LAST-MODIFIED:20250101T000000Z\r\n\
BEGIN:VALARM\r\n\
TRIGGER:-P1D0H0M\r\n\
END:VALARM\r\n\
BEGIN:VALARM\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20250220T090000\r\n\
DTEND:20250220T100000\r\n\
SUMMARY:Already over\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn documents_without_header_are_invalid() {
        for doc in ["", "<html></html>", " BEGIN:VCALENDAR\n", "VERSION:2.0\nBEGIN:VCALENDAR\n"] {
            let err = IcsDocument::parse(doc, LocalOffset::UTC).unwrap_err();
            assert!(matches!(err, IcsWatchError::InvalidFormat), "{doc:?}");
        }
    }

    #[test]
    fn reads_calendar_name() {
        assert_eq!(parse(CALENDAR).name(), Some("Team, work"));
        assert_eq!(parse("BEGIN:VCALENDAR\nEND:VCALENDAR\n").name(), None);
    }

    #[test]
    fn drops_appointments_that_already_ended() {
        let parsed = parse(CALENDAR).appointments(dt("2025-02-25 12:00"));

        assert_eq!(parsed.appointments.len(), 1);
        assert_eq!(parsed.appointments[0].summary(), "Planning");
    }

    #[test]
    fn later_now_excludes_more_appointments() {
        let doc = parse(CALENDAR);
        let early = doc.appointments(dt("2025-02-01 00:00")).appointments.len();
        let late = doc.appointments(dt("2025-03-01 11:00")).appointments.len();

        assert_eq!(early, 2);
        assert_eq!(late, 0);
    }

    #[test]
    fn one_day_trigger_reminds_a_day_before() {
        let parsed = parse(CALENDAR).appointments(dt("2025-02-25 12:00"));
        let times: Vec<_> = parsed.reminders.iter().map(|(at, _)| *at).collect();

        assert_eq!(times, vec![dt("2025-02-28 09:00"), dt("2025-03-01 08:45")]);
        assert!(parsed.reminders.iter().all(|(_, a)| a.summary() == "Planning"));
    }

    #[test]
    fn passed_reminders_are_dropped_but_appointment_kept() {
        let parsed = parse(CALENDAR).appointments(dt("2025-03-01 08:00"));

        assert_eq!(parsed.appointments.len(), 1);
        assert_eq!(parsed.reminders.len(), 1);
        assert_eq!(parsed.reminders[0].0, dt("2025-03-01 08:45"));
    }

    #[test]
    fn malformed_event_is_dropped_silently() {
        let doc = parse(
            "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\nDTSTART:20250301T090000\nDTEND:20250301T100000\nSUMMARY:Good\nEND:VEVENT\n\
BEGIN:VEVENT\nDTSTART:20250302T090000\nSUMMARY:No end\nEND:VEVENT\n\
END:VCALENDAR\n",
        );
        let parsed = doc.appointments(dt("2025-02-01 00:00"));

        assert_eq!(parsed.appointments.len(), 1);
        assert_eq!(parsed.appointments[0].summary(), "Good");
    }

    #[test]
    fn stray_end_marker_stops_extraction() {
        let doc = parse(
            "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\nDTSTART:20250301T090000\nDTEND:20250301T100000\nEND:VEVENT\n\
END:VEVENT\n\
BEGIN:VEVENT\nDTSTART:20250302T090000\nDTEND:20250302T100000\nEND:VEVENT\n",
        );
        assert_eq!(doc.event_blocks().len(), 1);
    }

    #[test]
    fn unterminated_block_is_ignored() {
        let doc = parse(
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:20250301T090000\nDTEND:20250301T100000\n",
        );
        assert!(doc.event_blocks().is_empty());
    }

    #[test]
    fn checksum_ignores_last_modified_only() {
        let base = parse(CALENDAR).checksum();
        let touched = parse(&CALENDAR.replace("20250101T000000Z", "20250215T120000Z")).checksum();
        assert_eq!(base, touched);

        for (from, to) in [
            ("SUMMARY:Planning", "SUMMARY:Planning v2"),
            ("DTSTART:20250301T090000", "DTSTART:20250301T091500"),
            ("DTEND:20250301T100000", "DTEND:20250301T110000"),
        ] {
            let changed = parse(&CALENDAR.replace(from, to)).checksum();
            assert_ne!(base, changed, "changing {from} should change the checksum");
        }
    }

    #[test]
    fn utc_times_are_shifted_by_offset() {
        let doc = IcsDocument::parse(CALENDAR, LocalOffset::from_hours(2)).unwrap();
        let parsed = doc.appointments(dt("2025-02-25 12:00"));
        assert_eq!(parsed.appointments[0].start(), dt("2025-03-01 11:00"));
    }
}
