// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::feed::FeedItem;

/// Lifecycle of a tracked episode.
///
/// `New -> Downloaded -> Deleted`; nothing leaves `Deleted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeState {
    #[default]
    New,
    Downloaded,
    Deleted,
}

impl EpisodeState {
    /// Integer code used by the database store
    pub fn code(self) -> i64 {
        match self {
            EpisodeState::New => 0,
            EpisodeState::Downloaded => 1,
            EpisodeState::Deleted => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EpisodeState::New),
            1 => Some(EpisodeState::Downloaded),
            2 => Some(EpisodeState::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpisodeState::New => "new",
            EpisodeState::Downloaded => "downloaded",
            EpisodeState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// A feed item being tracked for one podcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub state: EpisodeState,
    #[serde(default)]
    pub title: String,
    /// Rendered once at discovery, unsanitized
    #[serde(default)]
    pub filename: String,
    pub date: DateTime<FixedOffset>,
    /// Label of the owning podcast
    #[serde(default)]
    pub podcast_label: String,
}

impl Episode {
    /// Start tracking a feed item. The filename is left empty for the
    /// formatter to fill in.
    pub fn from_item(item: &FeedItem, podcast_label: &str) -> Self {
        Self {
            guid: item.guid.clone(),
            url: item.enclosure_url.clone(),
            state: EpisodeState::New,
            title: item.title.clone(),
            filename: String::new(),
            date: item.published,
            podcast_label: podcast_label.to_string(),
        }
    }
}
