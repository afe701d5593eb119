//! Keeping one calendar in sync and notifying about it.
//!
//! A `CalendarSyncEngine` owns the appointment cache of one calendar URL.
//! Refreshes go through the injected `Downloader`; a fetched document only
//! replaces the cache when its checksum differs from the current one. After
//! every replacement a single notification timer is (re)started that
//! promotes appointments and pops reminders on a fixed interval.
//!
//! All mutable state sits behind one mutex per engine. It is held only for
//! the duration of a read or update and never while observers are notified.

mod event;

use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::appointment::{Appointment, truncate_to_minute};
use crate::cache::AppointmentCache;
use crate::downloader::Downloader;
use crate::error::{IcsWatchError, IcsWatchResult};
use crate::ics::{IcsDocument, NEVER_LOADED};
use crate::offset::LocalOffset;

pub use event::{CalendarEvent, CalendarStatus, RefreshOutcome};

const DEFAULT_NAME: &str = "Untitled Calendar";
const DEFAULT_NOTIFY_INTERVAL: Duration = Duration::from_secs(30);

/// Source of the current local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Settings shared by every engine of a collection.
#[derive(Clone)]
pub struct EngineSettings {
    pub offset: LocalOffset,
    pub notify_interval: Duration,
    pub clock: Clock,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            offset: LocalOffset::detect(),
            notify_interval: DEFAULT_NOTIFY_INTERVAL,
            clock: Arc::new(local_now),
        }
    }
}

/// Newly ongoing appointments and fired reminders from one timer tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub newly_ongoing: Vec<Appointment>,
    pub reminders: Vec<Appointment>,
}

/// Handle to one watched calendar. Cloning shares the same engine.
#[derive(Clone)]
pub struct CalendarSyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    hue: u16,
    downloader: Arc<dyn Downloader>,
    settings: EngineSettings,
    events: broadcast::Sender<CalendarEvent>,
    state: Mutex<State>,
}

struct State {
    name: String,
    status: CalendarStatus,
    checksum: u64,
    cache: AppointmentCache,
    fetching: bool,
    alive: bool,
    timer: Option<JoinHandle<()>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

/// Marks a fetch as in flight. Dropping it without `disarm` clears the flag
/// again, so a cancelled `refresh_now` or a panicking downloader does not
/// block later refreshes.
struct FetchGuard {
    inner: Weak<Inner>,
    armed: bool,
}

impl FetchGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.state.lock().unwrap_or_else(|e| e.into_inner()).fetching = false;
            tracing::debug!("Fetch of {} abandoned", inner.url);
        }
    }
}

impl CalendarSyncEngine {
    /// Create an engine for `url`. Nothing is fetched until `refresh`.
    pub fn new(
        url: impl Into<String>,
        hue: u16,
        downloader: Arc<dyn Downloader>,
        settings: EngineSettings,
        events: broadcast::Sender<CalendarEvent>,
    ) -> Self {
        let state = State {
            name: DEFAULT_NAME.to_string(),
            status: CalendarStatus::NotLoaded,
            checksum: NEVER_LOADED,
            cache: AppointmentCache::new(),
            fetching: false,
            alive: true,
            timer: None,
        };

        CalendarSyncEngine {
            inner: Arc::new(Inner {
                url: url.into(),
                hue,
                downloader,
                settings,
                events,
                state: Mutex::new(state),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now(&self) -> NaiveDateTime {
        (self.inner.settings.clock)()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Hue (0-359) the view derives this calendar's colour from.
    pub fn hue(&self) -> u16 {
        self.inner.hue
    }

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn status(&self) -> CalendarStatus {
        self.state().status
    }

    pub fn checksum(&self) -> u64 {
        self.state().checksum
    }

    pub fn is_fetching(&self) -> bool {
        self.state().fetching
    }

    pub fn is_alive(&self) -> bool {
        self.state().alive
    }

    pub fn timer_running(&self) -> bool {
        self.state()
            .timer
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Appointments that have not become ongoing, in start order.
    pub fn upcoming(&self) -> Vec<Appointment> {
        self.state().cache.upcoming().cloned().collect()
    }

    pub fn ongoing(&self) -> Vec<Appointment> {
        self.state().cache.ongoing().to_vec()
    }

    /// Reminders that have not fired yet, with their trigger time.
    pub fn reminders(&self) -> Vec<(NaiveDateTime, Appointment)> {
        self.state()
            .cache
            .reminders()
            .map(|(at, apt)| (at, apt.clone()))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CalendarEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Refreshing
    // =========================================================================

    /// Start a background fetch. Returns false without doing anything when a
    /// fetch is already outstanding, the engine is shut down, or there is no
    /// tokio runtime to run it on.
    pub fn refresh(&self) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime, cannot refresh {}", self.inner.url);
            return false;
        };

        let Some(guard) = self.begin_fetch() else {
            return false;
        };

        let weak = Arc::downgrade(&self.inner);
        let downloader = self.inner.downloader.clone();
        let url = self.inner.url.clone();

        runtime.spawn(async move {
            let result = downloader.fetch(&url).await;

            // The engine may have been dropped while the fetch was in flight
            let Some(inner) = weak.upgrade() else {
                tracing::debug!("Discarding fetch result for dropped calendar {}", url);
                return;
            };
            guard.disarm();
            let engine = CalendarSyncEngine { inner };
            let now = engine.now();
            engine.apply_fetch(result, now);
        });

        true
    }

    /// Fetch and apply inline, reporting what happened.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let Some(guard) = self.begin_fetch() else {
            return RefreshOutcome::Skipped;
        };

        let result = self.inner.downloader.fetch(&self.inner.url).await;
        guard.disarm();
        let now = self.now();
        self.apply_fetch(result, now)
    }

    fn begin_fetch(&self) -> Option<FetchGuard> {
        let mut state = self.state();
        if !state.alive || state.fetching {
            return None;
        }
        state.fetching = true;
        tracing::debug!("Fetching {}", self.inner.url);

        Some(FetchGuard {
            inner: Arc::downgrade(&self.inner),
            armed: true,
        })
    }

    /// Apply the result of a fetch as seen at `now`.
    ///
    /// Failures mark the calendar offline and keep the current cache. A valid
    /// document marks it online; the cache is only replaced, and the timer
    /// only restarted, when the checksum changed. The restarted timer's first
    /// tick is never announced before this refresh's own events.
    pub fn apply_fetch(&self, result: IcsWatchResult<String>, now: NaiveDateTime) -> RefreshOutcome {
        let url = &self.inner.url;
        let parsed = result
            .and_then(|body| IcsDocument::parse(&body, self.inner.settings.offset))
            .map(|doc| {
                let cache = doc.to_cache(now);
                (doc, cache)
            });
        let mut events = Vec::new();
        let mut replaced = false;

        let outcome = {
            let mut state = self.state();
            state.fetching = false;

            if !state.alive {
                return RefreshOutcome::Discarded;
            }

            match parsed {
                Err(e) => {
                    tracing::warn!("Refreshing {} failed: {}", url, e);

                    let previous = state.status;
                    if previous != CalendarStatus::Offline {
                        state.status = CalendarStatus::Offline;
                        events.push(CalendarEvent::StatusChanged {
                            url: url.clone(),
                            status: CalendarStatus::Offline,
                        });
                    }
                    // Warn on the first failure of a new calendar, and whenever
                    // a working calendar starts serving something else
                    let invalid_format = matches!(e, IcsWatchError::InvalidFormat);
                    if previous == CalendarStatus::NotLoaded
                        || (previous == CalendarStatus::Online && invalid_format)
                    {
                        events.push(CalendarEvent::FormatInvalid {
                            url: url.clone(),
                            reason: e.to_string(),
                        });
                    }

                    if invalid_format {
                        RefreshOutcome::InvalidFormat
                    } else {
                        RefreshOutcome::Unreachable
                    }
                }
                Ok((doc, cache)) => {
                    if state.status != CalendarStatus::Online {
                        state.status = CalendarStatus::Online;
                        events.push(CalendarEvent::StatusChanged {
                            url: url.clone(),
                            status: CalendarStatus::Online,
                        });
                    }

                    if let Some(name) = doc.name() {
                        if name != state.name {
                            state.name = name.to_string();
                            events.push(CalendarEvent::NameChanged {
                                url: url.clone(),
                                name: name.to_string(),
                            });
                        }
                    }

                    if doc.checksum() == state.checksum {
                        tracing::debug!("{} unchanged", url);
                        RefreshOutcome::Unchanged
                    } else {
                        let first_load = state.checksum == NEVER_LOADED;
                        state.cache = cache;
                        state.checksum = doc.checksum();
                        tracing::info!(
                            "Loaded {} ({} upcoming appointments)",
                            url,
                            state.cache.upcoming().count()
                        );

                        if !first_load {
                            events.push(CalendarEvent::ContentChanged { url: url.clone() });
                        }

                        // The old chain must not tick on the new cache
                        if let Some(old) = state.timer.take() {
                            old.abort();
                        }
                        replaced = true;
                        RefreshOutcome::Replaced
                    }
                }
            }
        };

        self.emit(events);
        if replaced {
            self.restart_timer();
        }
        outcome
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// One notification cycle: promote, then pop due reminders, then notify.
    pub fn tick(&self, now: NaiveDateTime) -> TickReport {
        let now = truncate_to_minute(now);

        let report = {
            let mut state = self.state();
            if !state.alive {
                return TickReport::default();
            }
            TickReport {
                newly_ongoing: state.cache.promote(now),
                reminders: state.cache.pop_due_reminders(now),
            }
        };

        let mut events = Vec::new();
        if !report.newly_ongoing.is_empty() {
            events.push(CalendarEvent::NewlyOngoing {
                url: self.inner.url.clone(),
                appointments: report.newly_ongoing.clone(),
            });
        }
        if !report.reminders.is_empty() {
            events.push(CalendarEvent::RemindersFired {
                url: self.inner.url.clone(),
                appointments: report.reminders.clone(),
            });
        }
        self.emit(events);

        report
    }

    /// Replace the timer chain with a fresh one that ticks right away and
    /// then every notify interval. Only one chain exists per engine.
    fn restart_timer(&self) {
        let mut state = self.state();
        if !state.alive {
            return;
        }
        if let Some(old) = state.timer.take() {
            old.abort();
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime, notifications for {} are off", self.inner.url);
            return;
        };

        tracing::debug!("Starting notification timer for {}", self.inner.url);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let interval = self.inner.settings.notify_interval;

        state.timer = Some(runtime.spawn(async move {
            loop {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let engine = CalendarSyncEngine { inner };
                engine.tick(engine.now());
                drop(engine);

                tokio::time::sleep(interval).await;
            }
        }));
    }

    fn emit(&self, events: Vec<CalendarEvent>) {
        for event in events {
            // No receivers is fine; nobody is watching yet
            let _ = self.inner.events.send(event);
        }
    }

    /// Stop the timer chain. A fetch still in flight is discarded when it
    /// completes.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.alive = false;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl fmt::Debug for CalendarSyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state();
        f.debug_struct("CalendarSyncEngine")
            .field("url", &self.inner.url)
            .field("name", &state.name)
            .field("status", &state.status)
            .field("fetching", &state.fetching)
            .finish()
    }
}

impl fmt::Display for CalendarSyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <{}>", self.name(), self.inner.url)
    }
}
