// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::episode::Episode;

/// Which end of the feed to fill first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum StartFrom {
    #[default]
    Oldest,
    Newest,
}

impl FromStr for StartFrom {
    type Err = String;

    /// An empty value means the default, `oldest`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "oldest" => Ok(StartFrom::Oldest),
            "newest" => Ok(StartFrom::Newest),
            other => Err(format!("expected 'oldest' or 'newest', got '{other}'")),
        }
    }
}

impl TryFrom<String> for StartFrom {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for StartFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartFrom::Oldest => f.write_str("oldest"),
            StartFrom::Newest => f.write_str("newest"),
        }
    }
}

/// A subscribed feed and the episodes tracked for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(default)]
    pub label: String,
    /// Channel title from the most recent successful fetch
    #[serde(default)]
    pub title: String,
    pub feed: String,
    /// Target directory, relative to the configuration file unless absolute
    pub directory: PathBuf,
    /// Episodes to keep downloaded; 0 defers to the configuration default
    #[serde(default)]
    pub count_to_keep: usize,
    #[serde(default)]
    pub start: StartFrom,
    #[serde(default)]
    pub episodes: BTreeMap<String, Episode>,
}

impl Podcast {
    pub fn new(label: impl Into<String>, feed: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            title: String::new(),
            feed: feed.into(),
            directory: directory.into(),
            count_to_keep: 0,
            start: StartFrom::Oldest,
            episodes: BTreeMap::new(),
        }
    }

    /// Fill in defaults a hand-written configuration may leave out.
    ///
    /// An empty label becomes the directory's base name.
    pub fn normalize(&mut self) {
        if self.label.is_empty() {
            self.label = self
                .directory
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
    }

    /// Resolve the target directory against the directory holding the
    /// configuration file
    pub fn target_directory(&self, base_dir: &Path) -> PathBuf {
        if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            base_dir.join(&self.directory)
        }
    }
}
