//! Parsed calendar appointments.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

use crate::error::{IcsWatchError, IcsWatchResult};
use crate::ics::scan::{ContentLine, FieldKey};
use crate::offset::LocalOffset;

/// One appointment, built from a VEVENT block.
///
/// Start and end are local wall-clock times. An `Appointment` only exists if
/// both of them parsed, so every value in a cache is a valid one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    start: NaiveDateTime,
    end: NaiveDateTime,
    summary: String,
}

impl Appointment {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, summary: impl Into<String>) -> Self {
        Appointment {
            start,
            end,
            summary: summary.into(),
        }
    }

    /// Build an appointment from the content lines of one VEVENT block.
    ///
    /// Only properties of the event itself are read; lines inside nested
    /// components such as VALARM are skipped.
    pub fn from_lines(lines: &[ContentLine], offset: LocalOffset) -> IcsWatchResult<Self> {
        let mut start = None;
        let mut end = None;
        let mut summary = None;
        let mut depth = 0usize;

        for line in lines {
            match line.key {
                FieldKey::Begin if !line.begins("VEVENT") => depth += 1,
                FieldKey::End if !line.ends("VEVENT") => depth = depth.saturating_sub(1),
                _ if depth > 0 => {}
                FieldKey::DtStart if start.is_none() => start = Some(line),
                FieldKey::DtEnd if end.is_none() => end = Some(line),
                FieldKey::Summary if summary.is_none() => summary = Some(line),
                _ => {}
            }
        }

        let start = start
            .and_then(|l| parse_timestamp(l, offset))
            .ok_or_else(|| IcsWatchError::MalformedEvent("missing or invalid DTSTART".into()))?;
        let end = end
            .and_then(|l| parse_timestamp(l, offset))
            .ok_or_else(|| IcsWatchError::MalformedEvent("missing or invalid DTEND".into()))?;
        let summary = summary
            .map(|l| unescape_text(&l.value))
            .unwrap_or_else(|| "(No title)".to_string());

        Ok(Appointment::new(start, end, summary))
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// True when both start and end fall exactly on midnight.
    pub fn is_day_wide(&self) -> bool {
        self.start.time() == NaiveTime::MIN && self.end.time() == NaiveTime::MIN
    }

    /// Whether `now` falls inside the appointment, bounds included.
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now <= self.end
    }

    /// Human-readable timing relative to `now`: "Today", "In 20 minutes",
    /// "Started 2 days ago, 3 days left", "Mar 4 09:30" and so on.
    pub fn describe(&self, now: NaiveDateTime) -> String {
        if self.is_day_wide() {
            self.describe_day_wide(now.date())
        } else {
            self.describe_timed(now)
        }
    }

    fn describe_day_wide(&self, today: NaiveDate) -> String {
        let start = self.start.date();
        let span = (self.end.date() - start).num_days();
        let until_start = (start - today).num_days();

        if span <= 1 {
            return match until_start {
                0 => "Today".to_string(),
                1 => "Tomorrow".to_string(),
                _ => short_date(start, today),
            };
        }

        match until_start {
            n if n < 0 => {
                let left = (self.end.date() - today).num_days();
                if left <= 0 {
                    return "Ended".to_string();
                }
                format!("Started {} ago, {} left", plural(-n, "day"), plural(left, "day"))
            }
            0 => format!("Started today, {} left", plural(span, "day")),
            1 => format!("Starts tomorrow, lasts {} days", span),
            n => format!("Starts in {} days, lasts {} days", n, span),
        }
    }

    fn describe_timed(&self, now: NaiveDateTime) -> String {
        if self.start.date() != now.date() {
            return short_date_time(self.start, now.date());
        }

        if self.start <= now {
            if now > self.end {
                return "Ended".to_string();
            }
            if now - self.start < Duration::minutes(1) {
                return "Just started".to_string();
            }
            return format!("{} left", plural(minutes_rounded_up(self.end - now), "minute"));
        }

        let until = self.start - now;
        if until <= Duration::minutes(60) {
            format!("In {}", plural(minutes_rounded_up(until), "minute"))
        } else {
            format!("In {}", plural(hours_rounded_up(until), "hour"))
        }
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// `Mar 1` within the current year, `2027-03-01` otherwise.
pub fn short_date(date: NaiveDate, today: NaiveDate) -> String {
    if date.year() == today.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

/// Short date followed by `HH:MM`.
pub fn short_date_time(dt: NaiveDateTime, today: NaiveDate) -> String {
    format!("{} {}", short_date(dt.date(), today), dt.format("%H:%M"))
}

/// Truncate a timestamp to the start of its minute.
pub fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn minutes_rounded_up(d: Duration) -> i64 {
    (d.num_seconds() + 59) / 60
}

fn hours_rounded_up(d: Duration) -> i64 {
    (d.num_seconds() + 3599) / 3600
}

/// Parse a DTSTART/DTEND line.
///
/// Date-only values are midnight. Date-times are UTC and get shifted to local
/// time, unless a TZID says they already are wall-clock times.
fn parse_timestamp(line: &ContentLine, offset: LocalOffset) -> Option<NaiveDateTime> {
    let value = line.value.trim();
    let date_only = line
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || value.len() == 8;

    if date_only {
        let date = NaiveDate::parse_from_str(value.get(..8)?, "%Y%m%d").ok()?;
        return Some(date.and_time(NaiveTime::MIN));
    }

    let stamp = value.trim_end_matches('Z');
    let dt = NaiveDateTime::parse_from_str(stamp.get(..15)?, "%Y%m%dT%H%M%S").ok()?;

    if line.param("TZID").is_some() {
        Some(dt)
    } else {
        Some(offset.to_local(dt))
    }
}

/// Decode ICS text escapes (`\,` `\;` `\n` `\\`).
pub(crate) fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::scan::scan;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn block(text: &str) -> Vec<ContentLine> {
        scan(text)
    }

    #[test]
    fn parses_utc_times_with_offset() {
        let lines = block(
            "BEGIN:VEVENT\nDTSTART:20250301T090000Z\nDTEND:20250301T100000Z\nSUMMARY:Standup\n",
        );
        let apt = Appointment::from_lines(&lines, LocalOffset::from_hours(1)).unwrap();

        assert_eq!(apt.start(), dt("2025-03-01 10:00"));
        assert_eq!(apt.end(), dt("2025-03-01 11:00"));
        assert_eq!(apt.summary(), "Standup");
        assert!(!apt.is_day_wide());
    }

    #[test]
    fn date_only_values_are_midnight_without_shift() {
        let lines = block(
            "BEGIN:VEVENT\nDTSTART;VALUE=DATE:20250301\nDTEND;VALUE=DATE:20250302\nSUMMARY:Holiday\n",
        );
        let apt = Appointment::from_lines(&lines, LocalOffset::from_hours(3)).unwrap();

        assert_eq!(apt.start(), dt("2025-03-01 00:00"));
        assert_eq!(apt.end(), dt("2025-03-02 00:00"));
        assert!(apt.is_day_wide());
    }

    #[test]
    fn tzid_values_are_taken_as_local() {
        let lines = block(
            "DTSTART;TZID=Europe/Brussels:20250301T090000\nDTEND;TZID=Europe/Brussels:20250301T093000\n",
        );
        let apt = Appointment::from_lines(&lines, LocalOffset::from_hours(5)).unwrap();
        assert_eq!(apt.start(), dt("2025-03-01 09:00"));
    }

    #[test]
    fn missing_end_is_malformed() {
        let lines = block("DTSTART:20250301T090000\nSUMMARY:No end\n");
        let err = Appointment::from_lines(&lines, LocalOffset::UTC).unwrap_err();
        assert!(matches!(err, IcsWatchError::MalformedEvent(_)));
    }

    #[test]
    fn garbage_start_is_malformed() {
        let lines = block("DTSTART:tomorrow\nDTEND:20250301T090000\n");
        assert!(Appointment::from_lines(&lines, LocalOffset::UTC).is_err());
    }

    #[test]
    fn summary_escapes_are_decoded() {
        let lines = block(
            "DTSTART:20250301T090000\nDTEND:20250301T100000\nSUMMARY:Lunch\\, drinks\\; more\\nnext \\\\ done\n",
        );
        let apt = Appointment::from_lines(&lines, LocalOffset::UTC).unwrap();
        assert_eq!(apt.summary(), "Lunch, drinks; more\nnext \\ done");
    }

    #[test]
    fn alarm_summary_does_not_replace_event_summary() {
        let lines = block(
            "BEGIN:VEVENT\nDTSTART:20250301T090000\nDTEND:20250301T100000\nBEGIN:VALARM\nSUMMARY:Alarm text\nEND:VALARM\nSUMMARY:Real title\n",
        );
        let apt = Appointment::from_lines(&lines, LocalOffset::UTC).unwrap();
        assert_eq!(apt.summary(), "Real title");
    }

    #[test]
    fn missing_summary_gets_placeholder() {
        let lines = block("DTSTART:20250301T090000\nDTEND:20250301T100000\n");
        let apt = Appointment::from_lines(&lines, LocalOffset::UTC).unwrap();
        assert_eq!(apt.summary(), "(No title)");
    }

    #[test]
    fn one_day_event_today_reads_today() {
        let apt = Appointment::new(dt("2025-03-01 00:00"), dt("2025-03-02 00:00"), "Trip");
        assert_eq!(apt.describe(dt("2025-03-01 14:00")), "Today");
        assert_eq!(apt.describe(dt("2025-02-28 14:00")), "Tomorrow");
        assert_eq!(apt.describe(dt("2025-02-20 14:00")), "Mar 1");
    }

    #[test]
    fn multi_day_event_phrasing() {
        let apt = Appointment::new(dt("2025-03-01 00:00"), dt("2025-03-05 00:00"), "Conference");

        assert_eq!(apt.describe(dt("2025-03-03 08:00")), "Started 2 days ago, 2 days left");
        assert_eq!(apt.describe(dt("2025-03-01 08:00")), "Started today, 4 days left");
        assert_eq!(apt.describe(dt("2025-02-28 08:00")), "Starts tomorrow, lasts 4 days");
        assert_eq!(apt.describe(dt("2025-02-25 08:00")), "Starts in 4 days, lasts 4 days");
    }

    #[test]
    fn multi_day_event_past_its_end_reads_ended() {
        let apt = Appointment::new(dt("2025-03-01 00:00"), dt("2025-03-05 00:00"), "Trip");
        assert_eq!(apt.describe(dt("2025-03-04 23:00")), "Started 3 days ago, 1 day left");
        assert_eq!(apt.describe(dt("2025-03-05 08:00")), "Ended");
        assert_eq!(apt.describe(dt("2025-03-09 08:00")), "Ended");
    }

    #[test]
    fn timed_event_today_phrasing() {
        let apt = Appointment::new(dt("2025-03-01 14:00"), dt("2025-03-01 15:00"), "Review");

        assert_eq!(apt.describe(dt("2025-03-01 14:00")), "Just started");
        assert_eq!(apt.describe(dt("2025-03-01 14:20")), "40 minutes left");
        assert_eq!(apt.describe(dt("2025-03-01 14:59")), "1 minute left");
        assert_eq!(apt.describe(dt("2025-03-01 13:15")), "In 45 minutes");
        assert_eq!(apt.describe(dt("2025-03-01 13:00")), "In 60 minutes");
        assert_eq!(apt.describe(dt("2025-03-01 11:30")), "In 3 hours");
        assert_eq!(apt.describe(dt("2025-03-01 16:00")), "Ended");
    }

    #[test]
    fn timed_event_on_other_day_shows_date_and_time() {
        let apt = Appointment::new(dt("2025-03-04 09:05"), dt("2025-03-04 10:00"), "Dentist");
        assert_eq!(apt.describe(dt("2025-03-01 12:00")), "Mar 4 09:05");
        assert_eq!(apt.describe(dt("2024-12-30 12:00")), "2025-03-04 09:05");
    }

    #[test]
    fn truncates_seconds() {
        let t = NaiveDateTime::parse_from_str("2025-03-01 09:00:42", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(truncate_to_minute(t), dt("2025-03-01 09:00"));
    }
}
