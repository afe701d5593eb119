use anyhow::Result;
use chrono::Local;
use icswatch_core::{CalendarCollection, CalendarSyncEngine};
use owo_colors::OwoColorize;

use super::create_spinner;
use crate::Context;
use crate::render::{Render, render_calendar};

pub async fn run(ctx: &Context, calendar: Option<&str>) -> Result<()> {
    let collection = CalendarCollection::open(
        &ctx.config.calendars_path(),
        ctx.downloader.clone(),
        ctx.settings.clone(),
    )?;

    let calendars = resolve_calendars(&collection, calendar)?;

    for (i, engine) in calendars.iter().enumerate() {
        let spinner = create_spinner(engine.render())?;
        engine.refresh_now().await;
        spinner.finish_and_clear();

        // Promote against the current minute so "ongoing" is accurate
        let now = Local::now().naive_local();
        engine.tick(now);
        engine.shutdown();

        println!("{}", render_calendar(engine, now));

        // Add spacing between calendars (but not after the last one)
        if i < calendars.len() - 1 {
            println!();
        }
    }

    Ok(())
}

fn resolve_calendars(
    collection: &CalendarCollection,
    filter: Option<&str>,
) -> Result<Vec<CalendarSyncEngine>> {
    if collection.is_empty() {
        anyhow::bail!(
            "No calendars found.\n\n\
            Add your first calendar with:\n  \
            icswatch add <url>"
        );
    }

    match filter {
        Some(url) => match collection.get(url) {
            Some(engine) => Ok(vec![engine]),
            None => {
                anyhow::bail!(
                    "Calendar '{}' not found. Available:\n  {}",
                    url,
                    collection.urls().join("\n  ")
                );
            }
        },
        None => {
            println!("{}", "Fetching all calendars".dimmed());
            Ok(collection.calendars())
        }
    }
}
