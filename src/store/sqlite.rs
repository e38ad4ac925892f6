// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use super::ConfigStore;
use crate::error::StoreError;
use crate::model::{Configuration, Episode, EpisodeState, Podcast, StartFrom};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS config (
    filename_template TEXT NOT NULL,
    default_count_to_keep INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS podcast (
    position INTEGER NOT NULL,
    label TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    feed TEXT NOT NULL,
    directory TEXT NOT NULL,
    count_to_keep INTEGER NOT NULL,
    start TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS episode (
    podcast_label TEXT NOT NULL,
    guid TEXT NOT NULL,
    url TEXT,
    state INTEGER NOT NULL,
    title TEXT NOT NULL,
    filename TEXT NOT NULL,
    date TEXT NOT NULL,
    PRIMARY KEY (podcast_label, guid)
);
";

/// Configuration kept in a SQLite database.
///
/// Saving replaces every row inside one transaction.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

struct EpisodeRow {
    podcast_label: String,
    guid: String,
    url: Option<String>,
    state: i64,
    title: String,
    filename: String,
    date: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        info!("opened configuration database {}", path.display());

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStore for SqliteStore {
    fn load(&self) -> Result<Configuration, StoreError> {
        let conn = self.conn();
        let mut config = Configuration::default();

        if let Some((template, count)) = conn
            .query_row(
                "SELECT filename_template, default_count_to_keep FROM config LIMIT 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?
        {
            config.filename_template = template;
            config.default_count_to_keep = to_count("default_count_to_keep", count)?;
        }

        let mut stmt = conn.prepare(
            "SELECT label, title, feed, directory, count_to_keep, start
             FROM podcast ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        for row in rows {
            let (label, title, feed, directory, count_to_keep, start) = row?;
            let mut podcast = Podcast::new(label, feed, directory);
            podcast.title = title;
            podcast.count_to_keep = to_count("count_to_keep", count_to_keep)?;
            podcast.start = start
                .parse::<StartFrom>()
                .map_err(|_| StoreError::InvalidValue {
                    column: "start",
                    value: start.clone(),
                })?;
            config.podcasts.push(podcast);
        }

        let mut stmt = conn.prepare(
            "SELECT podcast_label, guid, url, state, title, filename, date FROM episode",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EpisodeRow {
                podcast_label: row.get(0)?,
                guid: row.get(1)?,
                url: row.get(2)?,
                state: row.get(3)?,
                title: row.get(4)?,
                filename: row.get(5)?,
                date: row.get(6)?,
            })
        })?;

        for row in rows {
            let row = row?;
            let episode = episode_from_row(row)?;
            match config.find_podcast_mut(&episode.podcast_label) {
                Some(podcast) => {
                    podcast.episodes.insert(episode.guid.clone(), episode);
                }
                None => warn!(
                    "ignoring episode {} of unknown podcast '{}'",
                    episode.guid, episode.podcast_label
                ),
            }
        }

        Ok(config)
    }

    fn save(&self, config: &Configuration) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute_batch("DELETE FROM config; DELETE FROM podcast; DELETE FROM episode;")?;
        tx.execute(
            "INSERT INTO config (filename_template, default_count_to_keep) VALUES (?1, ?2)",
            params![config.filename_template, config.default_count_to_keep as i64],
        )?;

        for (position, podcast) in config.podcasts.iter().enumerate() {
            tx.execute(
                "INSERT INTO podcast (position, label, title, feed, directory, count_to_keep, start)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    position as i64,
                    podcast.label,
                    podcast.title,
                    podcast.feed,
                    podcast.directory.to_string_lossy(),
                    podcast.count_to_keep as i64,
                    podcast.start.to_string(),
                ],
            )?;

            for episode in podcast.episodes.values() {
                tx.execute(
                    "INSERT INTO episode (podcast_label, guid, url, state, title, filename, date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        podcast.label,
                        episode.guid,
                        episode.url,
                        episode.state.code(),
                        episode.title,
                        episode.filename,
                        episode.date.to_rfc3339(),
                    ],
                )?;
            }
        }

        tx.commit()?;
        debug!(
            "saved {} podcasts to {}",
            config.podcasts.len(),
            self.path.display()
        );
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn to_count(column: &'static str, value: i64) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn episode_from_row(row: EpisodeRow) -> Result<Episode, StoreError> {
    let state = EpisodeState::from_code(row.state).ok_or_else(|| StoreError::InvalidValue {
        column: "state",
        value: row.state.to_string(),
    })?;
    let date = DateTime::parse_from_rfc3339(&row.date).map_err(|_| StoreError::InvalidValue {
        column: "date",
        value: row.date.clone(),
    })?;

    Ok(Episode {
        guid: row.guid,
        url: row.url,
        state,
        title: row.title,
        filename: row.filename,
        date,
        podcast_label: row.podcast_label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_config() -> Configuration {
        let mut first = Podcast::new("zeta", "https://example.com/zeta.xml", "zeta");
        first.title = "Zeta".to_string();
        first.start = StartFrom::Newest;
        first.count_to_keep = 2;
        for (guid, state) in [("z1", EpisodeState::Downloaded), ("z2", EpisodeState::Deleted)] {
            first.episodes.insert(
                guid.to_string(),
                Episode {
                    guid: guid.to_string(),
                    url: Some(format!("https://example.com/{guid}.mp3")),
                    state,
                    title: guid.to_uppercase(),
                    filename: format!("{guid}.mp3"),
                    date: DateTime::parse_from_rfc3339("2023-06-01T10:00:00+02:00").unwrap(),
                    podcast_label: "zeta".to_string(),
                },
            );
        }

        let mut second = Podcast::new("alpha", "https://example.com/alpha.xml", "alpha");
        second.episodes.insert(
            "a1".to_string(),
            Episode {
                guid: "a1".to_string(),
                url: None,
                state: EpisodeState::New,
                title: "A1".to_string(),
                filename: "a1.mp3".to_string(),
                date: DateTime::parse_from_rfc3339("1970-01-01T00:00:00+00:00").unwrap(),
                podcast_label: "alpha".to_string(),
            },
        );

        Configuration {
            filename_template: "{item.guid}.mp3".to_string(),
            default_count_to_keep: 6,
            podcasts: vec![first, second],
        }
    }

    #[test]
    fn empty_database_loads_default_configuration() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("podshelf.db")).unwrap();

        assert_eq!(store.load().unwrap(), Configuration::default());
    }

    #[test]
    fn save_then_load_preserves_podcasts_episodes_and_order() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("podshelf.db")).unwrap();
        let config = sample_config();

        store.save(&config).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.podcasts[0].label, "zeta");
        assert_eq!(loaded.podcasts[1].label, "alpha");
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("podshelf.db");
        let store = SqliteStore::open(&path).unwrap();
        store.save(&sample_config()).unwrap();

        let mut smaller = sample_config();
        smaller.podcasts.remove(0);
        store.save(&smaller).unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), smaller);
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("podshelf.db")).unwrap();
        let mut config = sample_config();
        let duplicate = config.podcasts[1].clone();
        config.podcasts.push(duplicate);

        assert!(matches!(store.save(&config), Err(StoreError::Database(_))));
    }
}
