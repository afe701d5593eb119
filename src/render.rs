//! TUI rendering traits for icswatch types.
//!
//! Extension traits that add colored terminal rendering to icswatch-core
//! types using owo_colors.

use chrono::NaiveDateTime;
use icswatch_core::{Appointment, CalendarEvent, CalendarStatus, CalendarSyncEngine};
use owo_colors::OwoColorize;

use crate::utils::tui::hue_to_rgb;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarStatus {
    fn render(&self) -> String {
        match self {
            CalendarStatus::NotLoaded => self.to_string().dimmed().to_string(),
            CalendarStatus::Online => self.to_string().green().to_string(),
            CalendarStatus::Offline => self.to_string().red().to_string(),
        }
    }
}

impl Render for CalendarSyncEngine {
    fn render(&self) -> String {
        let (r, g, b) = hue_to_rgb(self.hue());
        format!(
            "{} {} {}",
            "■".truecolor(r, g, b),
            self.name().bold(),
            self.url().dimmed()
        )
    }
}

/// Rendering that depends on the current time.
pub trait RenderAt {
    fn render_at(&self, now: NaiveDateTime) -> String;
}

impl RenderAt for Appointment {
    fn render_at(&self, now: NaiveDateTime) -> String {
        format!("{} {}", self.summary(), self.describe(now).dimmed())
    }
}

impl Render for CalendarEvent {
    fn render(&self) -> String {
        match self {
            CalendarEvent::NameChanged { url, name } => {
                format!("{} is now called {}", url.dimmed(), name.bold())
            }
            CalendarEvent::StatusChanged { url, status } => {
                format!("{} is {}", url.dimmed(), status.render())
            }
            CalendarEvent::ContentChanged { url } => {
                format!("{} {}", url.dimmed(), "changed".yellow())
            }
            CalendarEvent::FormatInvalid { url, reason } => {
                format!("{} could not be loaded: {}", url.dimmed(), reason.red())
            }
            CalendarEvent::NewlyOngoing { appointments, .. } => {
                let summaries: Vec<_> = appointments.iter().map(|a| a.summary()).collect();
                format!("{} {}", "Started:".green().bold(), summaries.join(", "))
            }
            CalendarEvent::RemindersFired { appointments, .. } => {
                let summaries: Vec<_> = appointments.iter().map(|a| a.summary()).collect();
                format!("{} {}", "Reminder:".yellow().bold(), summaries.join(", "))
            }
        }
    }
}

/// Name, status and appointments of a calendar, as `show` prints it.
pub fn render_calendar(engine: &CalendarSyncEngine, now: NaiveDateTime) -> String {
    let mut lines = vec![format!("{} ({})", engine.render(), engine.status().render())];

    let ongoing = engine.ongoing();
    let upcoming = engine.upcoming();
    let reminders = engine.reminders();

    if ongoing.is_empty() && upcoming.is_empty() {
        lines.push("   No appointments".dimmed().to_string());
    }

    if !ongoing.is_empty() {
        lines.push("   Ongoing:".dimmed().to_string());
        for apt in &ongoing {
            lines.push(format!("   {} {}", "●".green(), apt.render_at(now)));
        }
    }

    if !upcoming.is_empty() {
        lines.push("   Upcoming:".dimmed().to_string());
        for apt in &upcoming {
            lines.push(format!("   {} {}", "○".dimmed(), apt.render_at(now)));
        }
    }

    if !reminders.is_empty() {
        lines.push("   Reminders:".dimmed().to_string());
        for (at, apt) in &reminders {
            lines.push(format!(
                "   {} {} {}",
                "⏰".yellow(),
                at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                apt.summary()
            ));
        }
    }

    lines.join("\n")
}
