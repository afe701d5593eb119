use anyhow::Result;
use icswatch_core::{CalendarCollection, IcsWatchError};
use owo_colors::OwoColorize;

use crate::Context;

pub fn run(ctx: &Context, url: &str) -> Result<()> {
    let collection = CalendarCollection::open(
        &ctx.config.calendars_path(),
        ctx.downloader.clone(),
        ctx.settings.clone(),
    )?;

    match collection.remove(url) {
        Ok(()) => {
            println!("{} {}", "Removed".red(), url);
            Ok(())
        }
        Err(IcsWatchError::CalendarNotFound(_)) => {
            let available = collection.urls();
            if available.is_empty() {
                anyhow::bail!("Calendar '{}' not found. No calendars are watched.", url);
            }
            anyhow::bail!(
                "Calendar '{}' not found. Available:\n  {}",
                url,
                available.join("\n  ")
            );
        }
        Err(e) => Err(e.into()),
    }
}
