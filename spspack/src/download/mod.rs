//! Bounded concurrent downloader.
//!
//! Fetches a batch of remote resources into a staging folder. A counting
//! semaphore caps the number of in-flight requests; each item retries
//! transient failures with exponential backoff and, once exhausted, yields
//! a tagged error outcome instead of aborting the batch. The caller
//! decides whether missing outputs are fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Default cap on concurrent in-flight fetches.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 20;

/// Initial retry backoff.
const INITIAL_BACKOFF: Duration = Duration::from_secs(4);

/// Backoff ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(20);

/// Attempts per item before giving up.
const MAX_ATTEMPTS: u32 = 4;

/// Errors for a single fetch.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// HTTP 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 503.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other 5xx status.
    #[error("server error {status} from {uri}")]
    ServerError { uri: String, status: u16 },

    /// Transport-level or otherwise unclassified failure.
    #[error("download failed for {uri}: {reason}")]
    Failed { uri: String, reason: String },

    /// Writing the fetched bytes to disk failed.
    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

impl DownloadError {
    /// Whether retrying can plausibly help. Client errors are permanent;
    /// server errors and transport failures are transient.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            DownloadError::ServiceUnavailable(_)
                | DownloadError::ServerError { .. }
                | DownloadError::Failed { .. }
        )
    }
}

/// Transport abstraction, injectable for tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a resource, returning its body on a 2xx response.
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Real transport over a shared, connection-reusing `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| DownloadError::Failed {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                403 => DownloadError::Forbidden(uri.to_string()),
                404 => DownloadError::NotFound(uri.to_string()),
                503 => DownloadError::ServiceUnavailable(uri.to_string()),
                code if (500..600).contains(&code) => DownloadError::ServerError {
                    uri: uri.to_string(),
                    status: code,
                },
                code => DownloadError::Failed {
                    uri: uri.to_string(),
                    reason: format!("HTTP {}", code),
                },
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| DownloadError::Failed {
                uri: uri.to_string(),
                reason: format!("failed to read body: {}", e),
            })
    }
}

/// One resource to fetch.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    /// Absolute URI to fetch.
    pub uri: String,
    /// Filename to store the body under inside the staging folder.
    pub filename: String,
}

/// Tagged per-item result: the caller decides whether errors are fatal.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The requested filename.
    pub filename: String,
    /// Path of the stored file, or why the item failed.
    pub result: Result<PathBuf, DownloadError>,
}

/// Batch downloader with a concurrency cap and per-item retry.
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    concurrency_limit: usize,
}

impl Downloader {
    /// Downloader over the real HTTP transport with the default cap.
    pub fn new() -> Self {
        Downloader {
            fetcher: Arc::new(HttpFetcher::new()),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
        }
    }

    /// Downloader with an injected transport and cap. The cap is clamped
    /// to at least 1.
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, concurrency_limit: usize) -> Self {
        Downloader {
            fetcher,
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Fetch a batch into `dest`. Completion order is not input order;
    /// outcomes are tagged by filename and consumers locate files by name.
    pub async fn fetch_all(&self, items: &[DownloadItem], dest: &Path) -> Vec<DownloadOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::with_capacity(items.len());

        for item in items.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let path = dest.join(&item.filename);
            handles.push(tokio::spawn(async move {
                // Closed only if the semaphore is dropped, which we hold.
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let result = fetch_one(fetcher.as_ref(), &item.uri, &path).await;
                DownloadOutcome {
                    filename: item.filename,
                    result,
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (handle, item) in handles.into_iter().zip(items) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(DownloadOutcome {
                    filename: item.filename.clone(),
                    result: Err(DownloadError::Failed {
                        uri: item.uri.clone(),
                        reason: format!("task failed: {}", e),
                    }),
                }),
            }
        }
        outcomes
    }

    /// Fetch a single resource into memory, with the same retry policy as
    /// the batch path. Used for the article XML itself.
    pub async fn fetch_bytes(&self, uri: &str) -> Result<Vec<u8>, DownloadError> {
        fetch_with_retry(self.fetcher.as_ref(), uri).await
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_one(fetcher: &dyn Fetcher, uri: &str, path: &Path) -> Result<PathBuf, DownloadError> {
    let bytes = fetch_with_retry(fetcher, uri).await?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| DownloadError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    debug!(uri, path = %path.display(), "downloaded");
    Ok(path.to_path_buf())
}

async fn fetch_with_retry(fetcher: &dyn Fetcher, uri: &str) -> Result<Vec<u8>, DownloadError> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match fetcher.fetch(uri).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                warn!(uri, attempt, error = %e, "fetch failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
            Err(e) => {
                warn!(uri, attempt, error = %e, "fetch failed, giving up");
                return Err(e);
            }
        }
    }
}
