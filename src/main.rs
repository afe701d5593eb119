mod commands;
mod render;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use icswatch_core::config::WatchConfig;
use icswatch_core::engine::EngineSettings;
use icswatch_core::{HttpDownloader, LocalOffset};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "icswatch")]
#[command(about = "Watch remote ICS calendars and get told when appointments start")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start watching a calendar URL
    Add { url: String },
    /// Stop watching a calendar URL
    Remove { url: String },
    /// List watched calendar URLs
    List,
    /// Fetch calendars once and show their appointments
    Show {
        /// Only show this calendar (by URL)
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Keep watching all calendars and print notifications until Ctrl-C
    Watch,
}

/// Everything a command needs to build a collection.
pub struct Context {
    pub config: WatchConfig,
    pub downloader: Arc<HttpDownloader>,
    pub settings: EngineSettings,
}

impl Context {
    fn load() -> Result<Self> {
        let config = WatchConfig::load()?;
        let downloader = Arc::new(HttpDownloader::with_timeout(config.request_timeout())?);
        let settings = EngineSettings {
            offset: LocalOffset::detect(),
            notify_interval: config.notify_interval(),
            ..EngineSettings::default()
        };

        Ok(Context {
            config,
            downloader,
            settings,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("icswatch=info,icswatch_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load()?;

    match cli.command {
        Commands::Add { url } => commands::add::run(&ctx, &url).await,
        Commands::Remove { url } => commands::remove::run(&ctx, &url),
        Commands::List => commands::list::run(&ctx),
        Commands::Show { calendar } => commands::show::run(&ctx, calendar.as_deref()).await,
        Commands::Watch => commands::watch::run(&ctx).await,
    }
}
