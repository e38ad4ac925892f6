// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} fetching feed {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while fetching feed {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Episode {guid} has no enclosure URL")]
    MissingUrl { guid: String },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move finished download into place at {path}: {source}")]
    FinalizeFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Client errors (4xx) are permanent except for request timeouts and
    /// rate limiting. Local filesystem failures are not retried either.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpFailed { .. } | DownloadError::StreamFailed { .. } => true,
            DownloadError::HttpStatus { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            DownloadError::MissingUrl { .. }
            | DownloadError::CreateDirectoryFailed { .. }
            | DownloadError::FileCreateFailed { .. }
            | DownloadError::FileWriteFailed { .. }
            | DownloadError::FinalizeFailed { .. } => false,
        }
    }
}

/// Errors raised while rendering a filename template.
///
/// Resolution errors carry the output rendered before the failure, which is
/// what callers fall back to. Parse errors fall back to an empty string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unclosed placeholder starting at byte {position}")]
    Unclosed { position: usize },

    #[error("Unmatched '}}' at byte {position}")]
    UnmatchedBrace { position: usize },

    #[error("Unknown template context '{name}'")]
    UnknownContext { name: String, partial: String },

    #[error("Unknown field '{field}' in context '{context}'")]
    UnknownField {
        context: String,
        field: String,
        partial: String,
    },

    #[error("Invalid date format '{format}'")]
    InvalidDateFormat { format: String, partial: String },

    #[error("'{reference}' is not a date and cannot take a format")]
    NotADate { reference: String, partial: String },
}

impl TemplateError {
    /// The degraded output produced before the error was hit
    pub fn partial(&self) -> &str {
        match self {
            TemplateError::Unclosed { .. } | TemplateError::UnmatchedBrace { .. } => "",
            TemplateError::UnknownContext { partial, .. }
            | TemplateError::UnknownField { partial, .. }
            | TemplateError::InvalidDateFormat { partial, .. }
            | TemplateError::NotADate { partial, .. } => partial,
        }
    }
}

/// Errors that can occur when loading or saving the configuration
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read configuration {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write configuration {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid value '{value}' in column {column}")]
    InvalidValue { column: &'static str, value: String },
}

/// Top-level errors for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}
