// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::http::{ByteStream, HttpClient};
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// How often and how patiently a failed download is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Where a download sits in the current podcast's batch
#[derive(Debug, Clone)]
pub struct DownloadContext {
    pub episode_title: String,
    /// Index of this episode in the download queue
    pub episode_index: usize,
    /// Quota left when the batch started
    pub total_to_download: usize,
}

/// Fetches single resources to disk with bounded retry
pub struct Downloader<C> {
    client: C,
    retry: RetryPolicy,
}

impl<C: HttpClient> Downloader<C> {
    pub fn new(client: C) -> Self {
        Self::with_retry_policy(client, RetryPolicy::default())
    }

    pub fn with_retry_policy(client: C, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Download `url` to `destination`, replacing any existing file.
    ///
    /// Parent directories are created as needed. The body is streamed to a
    /// `.partial` sibling and only moved onto `destination` once complete,
    /// so a failed download never leaves a truncated file in its place.
    /// Returns the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        context: &DownloadContext,
        reporter: &SharedProgressReporter,
    ) -> Result<u64, DownloadError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(url, destination, context, reporter).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "attempt {}/{} for {} failed, retrying in {:?}: {}",
                        attempt, max_attempts, url, delay, e
                    );
                    reporter.report(ProgressEvent::DownloadRetrying {
                        episode_title: context.episode_title.clone(),
                        attempt,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        destination: &Path,
        context: &DownloadContext,
        reporter: &SharedProgressReporter,
    ) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| DownloadError::HttpFailed {
                url: url.to_string(),
                source: e,
            })?;

        if !response.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        reporter.report(ProgressEvent::DownloadStarting {
            episode_title: context.episode_title.clone(),
            episode_index: context.episode_index,
            total_to_download: context.total_to_download,
            content_length: response.content_length,
        });

        let partial_path = partial_path(destination);
        let result = stream_to_file(
            url,
            response.body,
            response.content_length,
            &partial_path,
            context,
            reporter,
        )
        .await;

        let bytes_downloaded = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial_path, destination).await {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(DownloadError::FinalizeFailed {
                path: destination.to_path_buf(),
                source: e,
            });
        }

        debug!(
            "downloaded {} bytes from {} to {}",
            bytes_downloaded,
            url,
            destination.display()
        );

        reporter.report(ProgressEvent::DownloadCompleted {
            episode_title: context.episode_title.clone(),
            bytes_downloaded,
        });

        Ok(bytes_downloaded)
    }
}

async fn stream_to_file(
    url: &str,
    mut body: ByteStream,
    content_length: Option<u64>,
    path: &Path,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let mut file = File::create(path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut bytes_downloaded: u64 = 0;

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            episode_title: context.episode_title.clone(),
            bytes_downloaded,
            total_bytes: content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(bytes_downloaded)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}
