//! icswatch configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{IcsWatchError, IcsWatchResult};

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
const DEFAULT_NOTIFY_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_notify_interval() -> u64 {
    DEFAULT_NOTIFY_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_calendars_file() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("icswatch").join("calendars"))
        .unwrap_or_else(|| PathBuf::from("~/.icswatch/calendars"))
}

/// Configuration at ~/.config/icswatch/config.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// How often every calendar is re-fetched.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// How often ongoing appointments and reminders are checked.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Newline-delimited list of calendar URLs.
    #[serde(default = "default_calendars_file")]
    pub calendars_file: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            notify_interval_secs: DEFAULT_NOTIFY_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            calendars_file: default_calendars_file(),
        }
    }
}

impl WatchConfig {
    pub fn config_path() -> IcsWatchResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IcsWatchError::Config("Could not determine config directory".into()))?
            .join("icswatch");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location. A missing file means defaults.
    pub fn load() -> IcsWatchResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> IcsWatchResult<Self> {
        let config: WatchConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .build()
            .map_err(|e| IcsWatchError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| IcsWatchError::Config(e.to_string()))?;

        if config.notify_interval_secs == 0 || config.refresh_interval_secs == 0 {
            return Err(IcsWatchError::Config(
                "Intervals must be at least one second".into(),
            ));
        }

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> IcsWatchResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| IcsWatchError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IcsWatchError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| IcsWatchError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Path of the URL list with `~` expanded.
    pub fn calendars_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.calendars_file.to_string_lossy()).into_owned();
        PathBuf::from(expanded)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_secs(self.notify_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
