// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Episode tracking for a single podcast.
//!
//! Episodes move `New -> Downloaded -> Deleted` and never back. Counts are
//! always derived from the episode map rather than stored.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::episode::{TemplateContext, format_filename, sanitize_path_component};
use crate::feed::Feed;
use crate::model::{Episode, EpisodeState, Podcast, StartFrom};

/// Outcome of checking downloaded episodes against the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Episodes still `Downloaded` after the check
    pub downloaded: usize,
    /// Episodes that moved to `Deleted` in this check
    pub newly_deleted: usize,
}

/// Where a tracked episode's file lives inside the podcast directory
pub fn episode_path(target_dir: &Path, episode: &Episode) -> PathBuf {
    target_dir.join(sanitize_path_component(&episode.filename))
}

/// Compare two episodes in download priority order.
///
/// Publish date decides, ascending for `oldest` and descending for `newest`;
/// equal dates fall back to ascending GUID so the order is total.
pub fn priority_cmp(start: StartFrom, a: &Episode, b: &Episode) -> Ordering {
    let by_date = a.date.cmp(&b.date);
    let by_date = match start {
        StartFrom::Oldest => by_date,
        StartFrom::Newest => by_date.reverse(),
    };
    by_date.then_with(|| a.guid.cmp(&b.guid))
}

impl Podcast {
    /// Track every feed item whose GUID is not known yet.
    ///
    /// New episodes start as `New` with a filename rendered once from
    /// `template`; existing episodes are left alone, so changing the
    /// template never renames tracked files. Returns how many episodes were
    /// discovered.
    pub fn merge_feed(&mut self, feed: &Feed, template: &str) -> usize {
        self.title = feed.title.clone();

        let mut discovered = 0;
        for item in &feed.items {
            if self.episodes.contains_key(&item.guid) {
                continue;
            }

            let mut episode = Episode::from_item(item, &self.label);
            episode.filename = format_filename(
                template,
                &TemplateContext {
                    item,
                    episode: &episode,
                    podcast: self,
                },
            );

            debug!(
                "discovered episode {} of '{}' as {}",
                episode.guid, self.label, episode.filename
            );
            self.episodes.insert(item.guid.clone(), episode);
            discovered += 1;
        }

        discovered
    }

    /// Mark `Downloaded` episodes whose file has gone missing as `Deleted`.
    ///
    /// `New` and `Deleted` episodes are not looked at.
    pub fn reconcile(&mut self, target_dir: &Path) -> Reconciliation {
        let mut downloaded = 0;
        let mut newly_deleted = 0;

        for episode in self.episodes.values_mut() {
            if episode.state != EpisodeState::Downloaded {
                continue;
            }

            let path = episode_path(target_dir, episode);
            // Only a definite "not found" counts; unreadable paths stay downloaded
            if matches!(path.try_exists(), Ok(false)) {
                info!(
                    "episode {} of '{}' no longer at {}, marking deleted",
                    episode.guid,
                    self.label,
                    path.display()
                );
                episode.state = EpisodeState::Deleted;
                newly_deleted += 1;
            } else {
                downloaded += 1;
            }
        }

        Reconciliation {
            downloaded,
            newly_deleted,
        }
    }

    /// GUIDs of all tracked episodes in download priority order
    pub fn priority_order(&self) -> Vec<String> {
        let mut ordered: Vec<&Episode> = self.episodes.values().collect();
        ordered.sort_by(|a, b| priority_cmp(self.start, a, b));
        ordered.into_iter().map(|e| e.guid.clone()).collect()
    }

    pub fn count_in_state(&self, state: EpisodeState) -> usize {
        self.episodes.values().filter(|e| e.state == state).count()
    }

    pub fn new_count(&self) -> usize {
        self.count_in_state(EpisodeState::New)
    }

    pub fn downloaded_count(&self) -> usize {
        self.count_in_state(EpisodeState::Downloaded)
    }

    pub fn deleted_count(&self) -> usize {
        self.count_in_state(EpisodeState::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedItem;
    use chrono::{DateTime, Duration};
    use tempfile::tempdir;

    const TEMPLATE: &str = "{episode.date:%Y-%m-%d}-{item.title}.mp3";

    fn make_item(guid: &str, title: &str, day: i64) -> FeedItem {
        let base = DateTime::parse_from_rfc3339("2020-01-01T00:00:00+00:00").unwrap();
        FeedItem {
            guid: guid.to_string(),
            title: title.to_string(),
            link: None,
            description: None,
            author: None,
            enclosure_url: Some(format!("https://example.com/{guid}.mp3")),
            published: base + Duration::days(day),
        }
    }

    fn make_feed(items: Vec<FeedItem>) -> Feed {
        Feed {
            title: "Test Feed".to_string(),
            items,
        }
    }

    fn make_podcast() -> Podcast {
        Podcast::new("test", "https://example.com/feed.xml", "test")
    }

    #[test]
    fn merge_discovers_new_items_with_rendered_filenames() {
        let mut podcast = make_podcast();
        let feed = make_feed(vec![make_item("a", "First", 0), make_item("b", "Second", 1)]);

        let discovered = podcast.merge_feed(&feed, TEMPLATE);

        assert_eq!(discovered, 2);
        assert_eq!(podcast.title, "Test Feed");
        assert_eq!(podcast.new_count(), 2);
        assert_eq!(podcast.episodes["a"].filename, "2020-01-01-First.mp3");
        assert_eq!(podcast.episodes["b"].filename, "2020-01-02-Second.mp3");
        assert_eq!(podcast.episodes["a"].podcast_label, "test");
    }

    #[test]
    fn merge_is_idempotent_and_never_renames() {
        let mut podcast = make_podcast();
        let feed = make_feed(vec![make_item("a", "First", 0)]);
        podcast.merge_feed(&feed, TEMPLATE);
        podcast.episodes.get_mut("a").unwrap().state = EpisodeState::Downloaded;

        let discovered = podcast.merge_feed(&feed, "{item.guid}.ogg");

        assert_eq!(discovered, 0);
        assert_eq!(podcast.episodes["a"].filename, "2020-01-01-First.mp3");
        assert_eq!(podcast.episodes["a"].state, EpisodeState::Downloaded);
    }

    #[test]
    fn merge_keeps_episodes_dropped_from_feed() {
        let mut podcast = make_podcast();
        podcast.merge_feed(&make_feed(vec![make_item("a", "First", 0)]), TEMPLATE);
        podcast.merge_feed(&make_feed(vec![make_item("b", "Second", 1)]), TEMPLATE);

        assert_eq!(podcast.episodes.len(), 2);
    }

    #[test]
    fn broken_template_still_tracks_episode() {
        let mut podcast = make_podcast();
        podcast.merge_feed(&make_feed(vec![make_item("a", "First", 0)]), "{item.title}-{nope.x}");

        assert_eq!(podcast.episodes["a"].filename, "First-");
        assert_eq!(podcast.new_count(), 1);
    }

    #[test]
    fn reconcile_marks_missing_downloads_deleted() {
        let dir = tempdir().unwrap();
        let mut podcast = make_podcast();
        podcast.merge_feed(
            &make_feed(vec![
                make_item("a", "Kept", 0),
                make_item("b", "Gone", 1),
                make_item("c", "Fresh", 2),
            ]),
            TEMPLATE,
        );
        for guid in ["a", "b"] {
            podcast.episodes.get_mut(guid).unwrap().state = EpisodeState::Downloaded;
        }
        std::fs::write(episode_path(dir.path(), &podcast.episodes["a"]), b"x").unwrap();

        let result = podcast.reconcile(dir.path());

        assert_eq!(
            result,
            Reconciliation {
                downloaded: 1,
                newly_deleted: 1
            }
        );
        assert_eq!(podcast.episodes["a"].state, EpisodeState::Downloaded);
        assert_eq!(podcast.episodes["b"].state, EpisodeState::Deleted);
        assert_eq!(podcast.episodes["c"].state, EpisodeState::New);
    }

    #[test]
    fn reconcile_never_revives_deleted_episodes() {
        let dir = tempdir().unwrap();
        let mut podcast = make_podcast();
        podcast.merge_feed(&make_feed(vec![make_item("a", "Back", 0)]), TEMPLATE);
        podcast.episodes.get_mut("a").unwrap().state = EpisodeState::Deleted;
        std::fs::write(episode_path(dir.path(), &podcast.episodes["a"]), b"x").unwrap();

        podcast.reconcile(dir.path());

        assert_eq!(podcast.episodes["a"].state, EpisodeState::Deleted);
    }

    #[test]
    fn reconcile_checks_sanitized_path() {
        let dir = tempdir().unwrap();
        let mut podcast = make_podcast();
        podcast.merge_feed(&make_feed(vec![make_item("a", "Who? What!", 0)]), TEMPLATE);
        podcast.episodes.get_mut("a").unwrap().state = EpisodeState::Downloaded;
        std::fs::write(dir.path().join("2020-01-01-Who--What-.mp3"), b"x").unwrap();

        let result = podcast.reconcile(dir.path());

        assert_eq!(result.downloaded, 1);
        assert_eq!(result.newly_deleted, 0);
    }

    #[test]
    fn priority_order_oldest_first() {
        let mut podcast = make_podcast();
        podcast.merge_feed(
            &make_feed(vec![
                make_item("c", "Three", 2),
                make_item("a", "One", 0),
                make_item("b", "Two", 1),
            ]),
            TEMPLATE,
        );

        assert_eq!(podcast.priority_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn priority_order_newest_first() {
        let mut podcast = make_podcast();
        podcast.start = StartFrom::Newest;
        podcast.merge_feed(
            &make_feed(vec![
                make_item("a", "One", 0),
                make_item("c", "Three", 2),
                make_item("b", "Two", 1),
            ]),
            TEMPLATE,
        );

        assert_eq!(podcast.priority_order(), vec!["c", "b", "a"]);
    }

    #[test]
    fn equal_dates_break_ties_by_guid() {
        for start in [StartFrom::Oldest, StartFrom::Newest] {
            let mut podcast = make_podcast();
            podcast.start = start;
            podcast.merge_feed(
                &make_feed(vec![
                    make_item("z", "Same", 0),
                    make_item("m", "Same", 0),
                    make_item("a", "Same", 0),
                ]),
                "{item.guid}",
            );

            assert_eq!(podcast.priority_order(), vec!["a", "m", "z"]);
        }
    }

    #[test]
    fn counts_are_derived_from_states() {
        let mut podcast = make_podcast();
        podcast.merge_feed(
            &make_feed((0..5).map(|i| make_item(&format!("g{i}"), "T", i)).collect()),
            "{item.guid}",
        );
        podcast.episodes.get_mut("g0").unwrap().state = EpisodeState::Downloaded;
        podcast.episodes.get_mut("g1").unwrap().state = EpisodeState::Deleted;

        assert_eq!(podcast.new_count(), 3);
        assert_eq!(podcast.downloaded_count(), 1);
        assert_eq!(podcast.deleted_count(), 1);
    }
}
