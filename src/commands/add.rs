use anyhow::Result;
use icswatch_core::{CalendarCollection, RefreshOutcome};
use owo_colors::OwoColorize;

use super::create_spinner;
use crate::Context;
use crate::render::Render;

/// Add `url` to the list, after checking that it serves a calendar.
pub async fn run(ctx: &Context, url: &str) -> Result<()> {
    let collection = CalendarCollection::open(
        &ctx.config.calendars_path(),
        ctx.downloader.clone(),
        ctx.settings.clone(),
    )?;

    let engine = collection.insert(url)?;

    let spinner = create_spinner(format!("Fetching {}", engine.url()))?;
    let outcome = engine.refresh_now().await;
    spinner.finish_and_clear();

    match outcome {
        RefreshOutcome::Unreachable => {
            println!(
                "{}",
                "Calendar is unreachable right now, adding it anyway.".yellow()
            );
        }
        RefreshOutcome::InvalidFormat => {
            anyhow::bail!("{} does not serve an iCalendar document", engine.url());
        }
        _ => {}
    }

    collection.persist()?;
    println!("{} {}", "Added".green(), engine.render());

    Ok(())
}
