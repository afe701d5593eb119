use anyhow::Result;
use icswatch_core::{CalendarCollection, CalendarEvent};
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;

use crate::Context;
use crate::render::Render;

pub async fn run(ctx: &Context) -> Result<()> {
    let path = ctx.config.calendars_path();
    let collection =
        CalendarCollection::open(&path, ctx.downloader.clone(), ctx.settings.clone())?;

    if collection.is_empty() {
        anyhow::bail!(
            "No calendars in {}.\n\nAdd one with:\n  icswatch add <url>",
            path.display()
        );
    }

    // Subscribe before the first fetches so no notification is missed
    let mut events = collection.subscribe();
    collection.refresh_all();
    let _auto_refresh = collection.start_auto_refresh(ctx.config.refresh_interval());

    println!(
        "Watching {} calendars, press Ctrl-C to stop",
        collection.len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => print_event(&collection, &event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} notifications", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    collection.shutdown();
    Ok(())
}

fn print_event(collection: &CalendarCollection, event: &CalendarEvent) {
    let calendar = collection
        .get(event.url())
        .map(|engine| engine.name())
        .unwrap_or_else(|| event.url().to_string());

    let now = chrono::Local::now().format("%H:%M");
    println!("{} {} {}", now.dimmed(), calendar.bold(), event.render());
}
