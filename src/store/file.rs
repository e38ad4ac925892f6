// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ConfigStore;
use crate::error::StoreError;
use crate::model::Configuration;

/// Configuration kept in a single TOML file
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write a default configuration unless the file already exists.
    ///
    /// Returns whether a file was created.
    pub fn init(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            debug!("{} already exists, not initializing", self.path.display());
            return Ok(false);
        }

        self.save(&Configuration::default())?;
        info!("initialized {}", self.path.display());
        Ok(true)
    }
}

impl ConfigStore for TomlFileStore {
    fn load(&self) -> Result<Configuration, StoreError> {
        info!("loading {}", self.path.display());

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::ReadFailed {
                path: self.path.clone(),
                source: e,
            })?;

        toml::from_str(&content).map_err(|e| StoreError::ParseFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Write through a temporary sibling so an interrupted save keeps the
    /// previous file intact
    fn save(&self, config: &Configuration) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(config)?;

        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_failed = |e| StoreError::WriteFailed {
            path: self.path.clone(),
            source: e,
        };
        std::fs::write(&tmp, content).map_err(write_failed)?;
        std::fs::rename(&tmp, &self.path).map_err(write_failed)?;

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
