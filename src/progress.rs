// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted during podcast synchronization for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A podcast's feed is being fetched
    FetchingFeed { label: String, url: String },

    /// Feed merged into the tracked episodes
    FeedMerged {
        label: String,
        podcast_title: String,
        total_episodes: usize,
        new_episodes: usize,
    },

    /// Downloaded episodes checked against the disk
    Reconciled {
        label: String,
        downloaded: usize,
        newly_deleted: usize,
        /// Quota left to fill in this pass
        remaining: usize,
    },

    /// A download is starting
    DownloadStarting {
        episode_title: String,
        /// Index of this episode in the download queue
        episode_index: usize,
        total_to_download: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A transient failure; another attempt follows
    DownloadRetrying {
        episode_title: String,
        attempt: u32,
        error: String,
    },

    /// A download completed successfully
    DownloadCompleted {
        episode_title: String,
        bytes_downloaded: u64,
    },

    /// A download failed for good in this pass
    DownloadFailed { episode_title: String, error: String },

    /// A podcast's sync was abandoned
    PodcastFailed { label: String, error: String },

    /// A podcast finished syncing
    PodcastCompleted {
        label: String,
        downloaded_count: usize,
        failed_count: usize,
        deleted_count: usize,
    },
}

/// Trait for reporting progress events during synchronization.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
