//! Time-partitioned appointment cache for one calendar.

use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeMap;

use crate::appointment::{Appointment, truncate_to_minute};
use crate::ics::ParsedAppointments;

/// Upcoming, ongoing and reminder partitions of a calendar's appointments.
///
/// Filled once from a parsed document and replaced as a whole when the
/// calendar changes. Appointments move from `pending` to `ongoing` as time
/// passes; reminders are independent and are removed once they fire.
/// Not synchronized; the owning engine guards it with its lock.
#[derive(Debug, Clone, Default)]
pub struct AppointmentCache {
    /// Not (yet) ongoing, keyed on start time.
    pending: BTreeMap<NaiveDateTime, Vec<Appointment>>,
    ongoing: Vec<Appointment>,
    /// Keyed on trigger time.
    reminders: BTreeMap<NaiveDateTime, Vec<Appointment>>,
}

impl AppointmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parsed(parsed: ParsedAppointments) -> Self {
        let mut cache = AppointmentCache::new();
        for apt in parsed.appointments {
            cache.insert_appointment(apt);
        }
        for (at, apt) in parsed.reminders {
            cache.insert_reminder(at, apt);
        }
        cache
    }

    pub fn insert_appointment(&mut self, apt: Appointment) {
        self.pending.entry(apt.start()).or_default().push(apt);
    }

    pub fn insert_reminder(&mut self, at: NaiveDateTime, apt: Appointment) {
        self.reminders.entry(at).or_default().push(apt);
    }

    /// Advance the partitions to `now` and return the appointments that
    /// became ongoing.
    ///
    /// Ongoing appointments that ended before `now` are evicted first. Then
    /// pending appointments are scanned in start order, stopping at the first
    /// one that starts after `now`; those with `start <= now <= end` move to
    /// ongoing. Calling this twice with the same `now` returns nothing the
    /// second time.
    pub fn promote(&mut self, now: NaiveDateTime) -> Vec<Appointment> {
        self.ongoing.retain(|a| a.end() >= now);

        let mut newly_ongoing = Vec::new();
        let mut emptied = Vec::new();

        for (start, bucket) in self.pending.range_mut(..=now) {
            let (started, waiting): (Vec<_>, Vec<_>) =
                std::mem::take(bucket).into_iter().partition(|a| a.contains(now));
            *bucket = waiting;
            newly_ongoing.extend(started);

            if bucket.is_empty() {
                emptied.push(*start);
            }
        }

        for start in emptied {
            self.pending.remove(&start);
        }

        self.ongoing.extend(newly_ongoing.iter().cloned());
        newly_ongoing
    }

    /// Remove and return every reminder due in or before the minute of `now`,
    /// in trigger order.
    ///
    /// A reminder is returned once; a late or skipped tick still delivers it
    /// on the next call.
    pub fn pop_due_reminders(&mut self, now: NaiveDateTime) -> Vec<Appointment> {
        let next_minute = truncate_to_minute(now) + Duration::minutes(1);
        let later = self.reminders.split_off(&next_minute);
        let due = std::mem::replace(&mut self.reminders, later);

        due.into_values().flatten().collect()
    }

    /// Appointments that are not ongoing, in start order.
    pub fn upcoming(&self) -> impl Iterator<Item = &Appointment> {
        self.pending.values().flatten()
    }

    pub fn ongoing(&self) -> &[Appointment] {
        &self.ongoing
    }

    /// Pending reminders with their trigger time, in trigger order.
    pub fn reminders(&self) -> impl Iterator<Item = (NaiveDateTime, &Appointment)> {
        self.reminders
            .iter()
            .flat_map(|(at, apts)| apts.iter().map(move |a| (*at, a)))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.ongoing.is_empty() && self.reminders.is_empty()
    }
}
