// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod model;
pub mod playlist;
pub mod progress;
pub mod state;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use episode::{Downloader, RetryPolicy, format_filename, sanitize_path_component};
pub use error::{DownloadError, FeedError, StoreError, SyncError, TemplateError};
pub use feed::{Feed, FeedItem, FeedSource, RssFeedSource, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use model::{Configuration, Episode, EpisodeState, Podcast, StartFrom};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use store::{ConfigStore, SqliteStore, TomlFileStore};
pub use sync::{BatchReport, PodcastReport, SyncDefaults, SyncEngine};
