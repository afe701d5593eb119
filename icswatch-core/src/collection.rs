//! All watched calendars, their URL list, and periodic refreshing.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::downloader::Downloader;
use crate::engine::{CalendarEvent, CalendarSyncEngine, EngineSettings};
use crate::error::{IcsWatchError, IcsWatchResult};
use crate::url_list::UrlList;

const EVENT_CAPACITY: usize = 256;
const HUE_STEP: u16 = 50;

/// Owns one `CalendarSyncEngine` per watched URL.
///
/// Every engine shares the same downloader, settings and event channel, so a
/// single `subscribe()` sees notifications from all calendars.
#[derive(Clone)]
pub struct CalendarCollection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    engines: Mutex<Vec<CalendarSyncEngine>>,
    downloader: Arc<dyn Downloader>,
    settings: EngineSettings,
    events: broadcast::Sender<CalendarEvent>,
    /// Where the URL list is persisted; `None` keeps it in memory only.
    list_path: Option<PathBuf>,
}

impl CalendarCollection {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        settings: EngineSettings,
        list_path: Option<PathBuf>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        CalendarCollection {
            inner: Arc::new(CollectionInner {
                engines: Mutex::new(Vec::new()),
                downloader,
                settings,
                events,
                list_path,
            }),
        }
    }

    /// Build a collection from the URL list at `path` without fetching
    /// anything. Duplicate lines are skipped.
    pub fn open(
        path: &Path,
        downloader: Arc<dyn Downloader>,
        settings: EngineSettings,
    ) -> IcsWatchResult<Self> {
        let collection = Self::new(downloader, settings, Some(path.to_path_buf()));

        for url in UrlList::load(path)? {
            if let Err(e) = collection.insert(&url) {
                tracing::warn!("Skipping {}: {}", url, e);
            }
        }

        tracing::debug!(
            "Read {} calendars from {}",
            collection.len(),
            path.display()
        );
        Ok(collection)
    }

    /// Like `open`, then start the first refresh of every calendar.
    pub fn load(
        path: &Path,
        downloader: Arc<dyn Downloader>,
        settings: EngineSettings,
    ) -> IcsWatchResult<Self> {
        let collection = Self::open(path, downloader, settings)?;
        let started = collection.refresh_all();
        tracing::info!("Loading {} calendars", started);
        Ok(collection)
    }

    fn engines(&self) -> MutexGuard<'_, Vec<CalendarSyncEngine>> {
        self.inner.engines.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Watch `url` without fetching it yet.
    ///
    /// The calendar gets hue `(count * 50) % 360` where count is the number
    /// of calendars before it.
    pub fn insert(&self, url: &str) -> IcsWatchResult<CalendarSyncEngine> {
        let url = url.trim();
        let mut engines = self.engines();

        if engines.iter().any(|e| e.url() == url) {
            return Err(IcsWatchError::DuplicateCalendar(url.to_string()));
        }

        let engine = CalendarSyncEngine::new(
            url,
            hue_for(engines.len()),
            self.inner.downloader.clone(),
            self.inner.settings.clone(),
            self.inner.events.clone(),
        );
        engines.push(engine.clone());
        Ok(engine)
    }

    /// Watch `url` and start its first refresh. With `persist` the URL list
    /// is rewritten.
    pub fn add(&self, url: &str, persist: bool) -> IcsWatchResult<CalendarSyncEngine> {
        let engine = self.insert(url)?;

        tracing::info!("Watching {}", engine.url());
        engine.refresh();

        if persist {
            self.persist()?;
        }

        Ok(engine)
    }

    /// Stop watching `url`. Its timer stops and a fetch in flight is discarded.
    pub fn remove(&self, url: &str) -> IcsWatchResult<()> {
        let url = url.trim();

        let engine = {
            let mut engines = self.engines();
            let index = engines
                .iter()
                .position(|e| e.url() == url)
                .ok_or_else(|| IcsWatchError::CalendarNotFound(url.to_string()))?;
            engines.remove(index)
        };

        engine.shutdown();
        tracing::info!("Stopped watching {}", url);

        self.persist()
    }

    /// Snapshot of the engines in insertion order.
    pub fn calendars(&self) -> Vec<CalendarSyncEngine> {
        self.engines().clone()
    }

    pub fn get(&self, url: &str) -> Option<CalendarSyncEngine> {
        let url = url.trim();
        self.engines().iter().find(|e| e.url() == url).cloned()
    }

    pub fn urls(&self) -> Vec<String> {
        self.engines().iter().map(|e| e.url().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines().is_empty()
    }

    /// Start a refresh on every calendar. Returns how many were started;
    /// calendars still fetching are skipped.
    pub fn refresh_all(&self) -> usize {
        self.calendars()
            .iter()
            .filter(|engine| engine.refresh())
            .count()
    }

    /// Refresh every calendar inline, one after another.
    pub async fn refresh_all_now(&self) {
        for engine in self.calendars() {
            let outcome = engine.refresh_now().await;
            tracing::debug!("{}: {:?}", engine.url(), outcome);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CalendarEvent> {
        self.inner.events.subscribe()
    }

    /// Write the current URL list, if the collection has a list path.
    pub fn persist(&self) -> IcsWatchResult<()> {
        let Some(path) = &self.inner.list_path else {
            return Ok(());
        };
        UrlList::save(path, &self.urls())
    }

    /// Refresh every calendar each `interval`, starting one interval from
    /// now. The returned handle stops the loop when dropped.
    pub fn start_auto_refresh(&self, interval: Duration) -> AutoRefresh {
        let collection = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let started = collection.refresh_all();
                tracing::debug!("Periodic refresh started {} fetches", started);
            }
        });

        AutoRefresh { handle }
    }

    /// Shut every engine down. The collection is empty afterwards.
    pub fn shutdown(&self) {
        let engines = std::mem::take(&mut *self.engines());
        for engine in engines {
            engine.shutdown();
        }
    }
}

fn hue_for(count: usize) -> u16 {
    ((count % 360) as u16 * HUE_STEP) % 360
}

/// Running periodic refresh; aborted on drop.
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    pub fn stop(self) {
        // Drop does the work
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
