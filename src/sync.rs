// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::episode::{DownloadContext, Downloader};
use crate::error::{DownloadError, StoreError, SyncError};
use crate::feed::FeedSource;
use crate::http::HttpClient;
use crate::model::{Configuration, EpisodeState, Podcast};
use crate::playlist::write_playlist;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::state::episode_path;
use crate::store::ConfigStore;

/// Configuration-wide settings a podcast sync falls back on
#[derive(Debug, Clone)]
pub struct SyncDefaults {
    pub filename_template: String,
    pub default_count_to_keep: usize,
}

impl SyncDefaults {
    /// The podcast's own quota, or the default when it is 0
    pub fn quota_for(&self, podcast: &Podcast) -> usize {
        if podcast.count_to_keep > 0 {
            podcast.count_to_keep
        } else {
            self.default_count_to_keep
        }
    }
}

impl From<&Configuration> for SyncDefaults {
    fn from(config: &Configuration) -> Self {
        Self {
            filename_template: config.filename_template.clone(),
            default_count_to_keep: config.default_count_to_keep,
        }
    }
}

/// Result of syncing one podcast
#[derive(Debug, Clone)]
pub struct PodcastReport {
    pub label: String,
    pub title: String,
    /// Episodes first seen in this pass
    pub discovered: usize,
    /// Episodes moved to `Deleted` in this pass
    pub deleted: usize,
    /// Episodes downloaded in this pass
    pub downloaded: usize,
    /// GUID and error of each download that failed
    pub failed: Vec<(String, String)>,
    /// Playlist written, if writing succeeded
    pub playlist: Option<PathBuf>,
}

/// Result of syncing every podcast in a configuration
#[derive(Debug, Default)]
pub struct BatchReport {
    pub synced: Vec<PodcastReport>,
    /// Label and error of each podcast whose sync was abandoned
    pub failed: Vec<(String, SyncError)>,
}

/// Drives the per-podcast reconciliation.
///
/// Podcasts are synced one after another, and within a podcast episodes
/// are downloaded one at a time in priority order.
pub struct SyncEngine<F, C> {
    feed_source: F,
    downloader: Downloader<C>,
    reporter: SharedProgressReporter,
}

impl<F: FeedSource, C: HttpClient> SyncEngine<F, C> {
    pub fn new(feed_source: F, downloader: Downloader<C>, reporter: SharedProgressReporter) -> Self {
        Self {
            feed_source,
            downloader,
            reporter,
        }
    }

    /// Load the configuration, sync every podcast, and save the result.
    ///
    /// A failing podcast does not stop the batch; its error is collected in
    /// the report. Only load and save failures are returned as errors.
    pub async fn sync_all(&self, store: &dyn ConfigStore) -> Result<BatchReport, StoreError> {
        let mut config = store.load()?;
        let report = self
            .sync_configuration(&mut config, &store.base_directory())
            .await;
        store.save(&config)?;
        Ok(report)
    }

    /// Sync every podcast of an already loaded configuration
    pub async fn sync_configuration(&self, config: &mut Configuration, base_dir: &Path) -> BatchReport {
        let defaults = SyncDefaults::from(&*config);
        let mut report = BatchReport::default();

        for podcast in config.podcasts.iter_mut() {
            match self.sync_podcast(podcast, &defaults, base_dir).await {
                Ok(podcast_report) => report.synced.push(podcast_report),
                Err(e) => report.failed.push((podcast.label.clone(), e)),
            }
        }

        report
    }

    /// Reconcile one podcast with its feed and its directory.
    ///
    /// Returns an error only when the feed cannot be fetched, in which case
    /// the tracked episodes are left untouched. Individual download failures
    /// are logged and reported but leave the episode `New` for the next run.
    pub async fn sync_podcast(
        &self,
        podcast: &mut Podcast,
        defaults: &SyncDefaults,
        base_dir: &Path,
    ) -> Result<PodcastReport, SyncError> {
        podcast.normalize();

        info!("fetching feed for '{}' from {}", podcast.label, podcast.feed);
        self.reporter.report(ProgressEvent::FetchingFeed {
            label: podcast.label.clone(),
            url: podcast.feed.clone(),
        });

        let feed = match self.feed_source.fetch_feed(&podcast.feed).await {
            Ok(feed) => feed,
            Err(e) => {
                error!("skipping podcast '{}': {}", podcast.label, e);
                self.reporter.report(ProgressEvent::PodcastFailed {
                    label: podcast.label.clone(),
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        info!("synchronizing '{}' ({})", feed.title, podcast.label);
        let discovered = podcast.merge_feed(&feed, &defaults.filename_template);
        self.reporter.report(ProgressEvent::FeedMerged {
            label: podcast.label.clone(),
            podcast_title: podcast.title.clone(),
            total_episodes: podcast.episodes.len(),
            new_episodes: discovered,
        });

        let target_dir = podcast.target_directory(base_dir);
        let reconciliation = podcast.reconcile(&target_dir);

        let quota = defaults.quota_for(podcast);
        let remaining = quota.saturating_sub(reconciliation.downloaded);
        self.reporter.report(ProgressEvent::Reconciled {
            label: podcast.label.clone(),
            downloaded: reconciliation.downloaded,
            newly_deleted: reconciliation.newly_deleted,
            remaining,
        });

        let mut downloaded = 0;
        let mut failed = Vec::new();

        if remaining == 0 {
            info!(
                "'{}' already holds {} of {} episodes, nothing to download",
                podcast.label, reconciliation.downloaded, quota
            );
        } else {
            info!(
                "downloading up to {} episodes of '{}' into {}",
                remaining,
                podcast.label,
                target_dir.display()
            );

            let mut attempted = 0;
            for guid in podcast.priority_order() {
                if downloaded == remaining {
                    break;
                }

                let Some(episode) = podcast.episodes.get_mut(&guid) else {
                    continue;
                };
                if episode.state != EpisodeState::New {
                    continue;
                }

                let path = episode_path(&target_dir, episode);
                let context = DownloadContext {
                    episode_title: episode.title.clone(),
                    episode_index: attempted,
                    total_to_download: remaining,
                };
                attempted += 1;

                info!("downloading {} to {}", episode.filename, path.display());
                let result = match episode.url.as_deref() {
                    Some(url) => {
                        self.downloader
                            .download(url, &path, &context, &self.reporter)
                            .await
                    }
                    None => Err(DownloadError::MissingUrl {
                        guid: episode.guid.clone(),
                    }),
                };

                match result {
                    Ok(_) => {
                        episode.state = EpisodeState::Downloaded;
                        downloaded += 1;
                    }
                    Err(e) => {
                        error!(
                            "could not download episode {} ({}) of '{}' from {}: {}",
                            episode.guid,
                            episode.filename,
                            podcast.label,
                            episode.url.as_deref().unwrap_or("<no url>"),
                            e
                        );
                        self.reporter.report(ProgressEvent::DownloadFailed {
                            episode_title: episode.title.clone(),
                            error: e.to_string(),
                        });
                        failed.push((guid, e.to_string()));
                    }
                }
            }
        }

        let playlist = match write_playlist(podcast, &target_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("could not write playlist for '{}': {}", podcast.label, e);
                None
            }
        };

        self.reporter.report(ProgressEvent::PodcastCompleted {
            label: podcast.label.clone(),
            downloaded_count: downloaded,
            failed_count: failed.len(),
            deleted_count: reconciliation.newly_deleted,
        });

        Ok(PodcastReport {
            label: podcast.label.clone(),
            title: podcast.title.clone(),
            discovered,
            deleted: reconciliation.newly_deleted,
            downloaded,
            failed,
            playlist,
        })
    }
}
