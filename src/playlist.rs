// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::episode::sanitize_path_component;
use crate::model::{EpisodeState, Podcast};

/// Playlist file name for a feed title, e.g. `My-Show.m3u`
pub fn playlist_filename(feed_title: &str) -> String {
    sanitize_path_component(&format!("{feed_title}.m3u"))
}

/// Playlist body: one unsanitized filename per downloaded episode, in
/// priority order
pub fn render_playlist(podcast: &Podcast) -> String {
    let mut body = String::new();
    for guid in podcast.priority_order() {
        if let Some(episode) = podcast.episodes.get(&guid)
            && episode.state == EpisodeState::Downloaded
        {
            body.push_str(&episode.filename);
            body.push('\n');
        }
    }
    body
}

/// Overwrite the podcast's playlist inside `target_dir`.
///
/// Named after the feed title, falling back to the label for feeds without
/// one. Returns the path written.
pub fn write_playlist(podcast: &Podcast, target_dir: &Path) -> std::io::Result<PathBuf> {
    let name = if podcast.title.is_empty() {
        &podcast.label
    } else {
        &podcast.title
    };
    let path = target_dir.join(playlist_filename(name));

    std::fs::create_dir_all(target_dir)?;
    std::fs::write(&path, render_playlist(podcast))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Episode, StartFrom};
    use chrono::DateTime;
    use tempfile::tempdir;

    fn add_episode(podcast: &mut Podcast, guid: &str, date: &str, state: EpisodeState) {
        podcast.episodes.insert(
            guid.to_string(),
            Episode {
                guid: guid.to_string(),
                url: None,
                state,
                title: guid.to_string(),
                filename: format!("{guid} #1.mp3"),
                date: DateTime::parse_from_rfc3339(date).unwrap(),
                podcast_label: podcast.label.clone(),
            },
        );
    }

    fn make_podcast(start: StartFrom) -> Podcast {
        let mut podcast = Podcast::new("show", "https://example.com/feed.xml", "show");
        podcast.title = "My Show: Daily".to_string();
        podcast.start = start;
        add_episode(&mut podcast, "b", "2024-01-02T00:00:00+00:00", EpisodeState::Downloaded);
        add_episode(&mut podcast, "a", "2024-01-01T00:00:00+00:00", EpisodeState::Downloaded);
        add_episode(&mut podcast, "c", "2024-01-03T00:00:00+00:00", EpisodeState::New);
        add_episode(&mut podcast, "d", "2024-01-04T00:00:00+00:00", EpisodeState::Deleted);
        add_episode(&mut podcast, "e", "2024-01-05T00:00:00+00:00", EpisodeState::Downloaded);
        podcast
    }

    #[test]
    fn playlist_filename_is_sanitized() {
        assert_eq!(playlist_filename("My Show: Daily"), "My-Show--Daily.m3u");
    }

    #[test]
    fn lists_only_downloaded_in_priority_order() {
        let podcast = make_podcast(StartFrom::Oldest);
        assert_eq!(render_playlist(&podcast), "a #1.mp3\nb #1.mp3\ne #1.mp3\n");

        let podcast = make_podcast(StartFrom::Newest);
        assert_eq!(render_playlist(&podcast), "e #1.mp3\nb #1.mp3\na #1.mp3\n");
    }

    #[test]
    fn write_playlist_overwrites_previous_contents() {
        let dir = tempdir().unwrap();
        let mut podcast = make_podcast(StartFrom::Oldest);

        let path = write_playlist(&podcast, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("My-Show--Daily.m3u"));

        podcast.episodes.get_mut("e").unwrap().state = EpisodeState::Deleted;
        write_playlist(&podcast, dir.path()).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "a #1.mp3\nb #1.mp3\n"
        );
    }

    #[test]
    fn write_playlist_creates_directory_and_falls_back_to_label() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested");
        let mut podcast = Podcast::new("fallback", "https://example.com/feed.xml", "nested");
        podcast.title.clear();

        let path = write_playlist(&podcast, &target).unwrap();

        assert_eq!(path, target.join("fallback.m3u"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
