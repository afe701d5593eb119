//! Test doubles shared by the engine and collection tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::downloader::Downloader;
use crate::error::{IcsWatchError, IcsWatchResult};

enum Step {
    Respond(IcsWatchResult<String>),
    /// Hang for an hour, long enough for any test to give up on it.
    Stall,
    Panic,
}

/// Hands out scripted responses in order, then repeats the fallback.
pub struct ScriptedDownloader {
    responses: Mutex<VecDeque<Step>>,
    fallback: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedDownloader {
    pub fn new() -> Self {
        ScriptedDownloader {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with `body` once the script runs out.
    pub fn serving(body: &str) -> Self {
        ScriptedDownloader {
            fallback: Some(body.to_string()),
            ..Self::new()
        }
    }

    pub fn then_ok(self, body: &str) -> Self {
        self.push(Step::Respond(Ok(body.to_string())))
    }

    pub fn then_fail(self) -> Self {
        self.push(Step::Respond(Err(IcsWatchError::FetchFailure(
            "connection refused".into(),
        ))))
    }

    pub fn then_stall(self) -> Self {
        self.push(Step::Stall)
    }

    pub fn then_panic(self) -> Self {
        self.push(Step::Panic)
    }

    fn push(self, step: Step) -> Self {
        self.responses.lock().unwrap().push_back(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn fetch(&self, _url: &str) -> IcsWatchResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.responses.lock().unwrap().pop_front();
        match scripted {
            Some(Step::Respond(response)) => response,
            Some(Step::Stall) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(IcsWatchError::FetchFailure("stalled".into()))
            }
            Some(Step::Panic) => panic!("downloader blew up"),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| IcsWatchError::FetchFailure("nothing scripted".into())),
        }
    }
}

/// A calendar with one appointment on 2025-03-01 from 09:00 to 10:00 UTC
/// that has a 15 minute reminder.
pub fn calendar(name: &str, summary: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
X-WR-CALNAME:{name}\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20250301T090000Z\r\n\
DTEND:20250301T100000Z\r\n\
SUMMARY:{summary}\r\n\
LAST-MODIFIED:20250101T000000Z\r\n\
BEGIN:VALARM\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n"
    )
}
