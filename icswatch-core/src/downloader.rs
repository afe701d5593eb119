//! Fetching calendar documents.
//!
//! The engine only needs "here is the body" or "the fetch failed"; the
//! `Downloader` trait is that boundary. `HttpDownloader` is the real one.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{IcsWatchError, IcsWatchResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch the document at `url`. Any failure is a `FetchFailure`.
    async fn fetch(&self, url: &str) -> IcsWatchResult<String>;
}

/// Plain HTTP(S) GET downloader.
#[derive(Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> IcsWatchResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> IcsWatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("icswatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IcsWatchError::FetchFailure(format!("Could not build HTTP client: {e}")))?;

        Ok(HttpDownloader { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str) -> IcsWatchResult<String> {
        let url = request_url(url);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IcsWatchError::FetchFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IcsWatchError::FetchFailure(format!(
                "{} returned {}",
                url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IcsWatchError::FetchFailure(e.to_string()))?;

        tracing::debug!("Received {} bytes from {}", body.len(), url);
        Ok(body.trim().to_string())
    }
}

/// Subscription links use `webcal://`, which is plain HTTPS underneath.
fn request_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}
