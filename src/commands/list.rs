use anyhow::Result;
use icswatch_core::url_list::UrlList;
use owo_colors::OwoColorize;

use crate::Context;

pub fn run(ctx: &Context) -> Result<()> {
    let path = ctx.config.calendars_path();
    let urls = UrlList::load(&path)?;

    if urls.is_empty() {
        println!("{}", "No calendars watched yet.".dimmed());
        println!("Add one with:\n  icswatch add <url>");
        return Ok(());
    }

    for url in urls {
        println!("{}", url);
    }

    Ok(())
}
