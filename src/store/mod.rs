// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence of the podcast configuration and tracked episodes.

mod file;
mod sqlite;

pub use file::TomlFileStore;
pub use sqlite::SqliteStore;

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::Configuration;

/// Loads and saves a whole [`Configuration`] at once
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Configuration, StoreError>;

    fn save(&self, config: &Configuration) -> Result<(), StoreError>;

    /// Location of the backing file
    fn path(&self) -> &Path;

    /// Directory that relative podcast directories resolve against
    fn base_directory(&self) -> PathBuf {
        match self.path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_directory_is_parent_of_config_file() {
        let store = TomlFileStore::new("/srv/podcasts/podshelf.toml");
        assert_eq!(store.base_directory(), PathBuf::from("/srv/podcasts"));
    }

    #[test]
    fn bare_file_name_resolves_to_current_directory() {
        let store = TomlFileStore::new("podshelf.toml");
        assert_eq!(store.base_directory(), PathBuf::from("."));
    }
}
