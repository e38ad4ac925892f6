// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod episode;
mod podcast;

pub use episode::{Episode, EpisodeState};
pub use podcast::{Podcast, StartFrom};

use serde::{Deserialize, Serialize};

/// Template used when a configuration does not set one
pub const DEFAULT_FILENAME_TEMPLATE: &str = "{episode.date:%Y-%m-%d-%H:%M:%S}-{item.title}.mp3";

/// Quota used when a configuration does not set one
pub const DEFAULT_COUNT_TO_KEEP: usize = 10;

/// Everything the sync engine reads from and writes back to a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "default_filename_template")]
    pub filename_template: String,
    #[serde(default = "default_count_to_keep")]
    pub default_count_to_keep: usize,
    #[serde(default)]
    pub podcasts: Vec<Podcast>,
}

fn default_filename_template() -> String {
    DEFAULT_FILENAME_TEMPLATE.to_string()
}

fn default_count_to_keep() -> usize {
    DEFAULT_COUNT_TO_KEEP
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            filename_template: default_filename_template(),
            default_count_to_keep: DEFAULT_COUNT_TO_KEEP,
            podcasts: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn find_podcast(&self, label: &str) -> Option<&Podcast> {
        self.podcasts.iter().find(|p| p.label == label)
    }

    pub fn find_podcast_mut(&mut self, label: &str) -> Option<&mut Podcast> {
        self.podcasts.iter_mut().find(|p| p.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_uses_documented_defaults() {
        let config = Configuration::default();
        assert_eq!(config.filename_template, DEFAULT_FILENAME_TEMPLATE);
        assert_eq!(config.default_count_to_keep, 10);
        assert!(config.podcasts.is_empty());
    }

    #[test]
    fn find_podcast_by_label() {
        let mut config = Configuration::default();
        config
            .podcasts
            .push(Podcast::new("a", "https://example.com/a.xml", "a"));
        config
            .podcasts
            .push(Podcast::new("b", "https://example.com/b.xml", "b"));

        assert_eq!(config.find_podcast("b").unwrap().feed, "https://example.com/b.xml");
        assert!(config.find_podcast("c").is_none());

        config.find_podcast_mut("a").unwrap().count_to_keep = 5;
        assert_eq!(config.podcasts[0].count_to_keep, 5);
    }
}
