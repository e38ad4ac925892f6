// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;
use url::Url;

use crate::error::FeedError;
use crate::http::HttpClient;

use super::parse::{Feed, parse_feed};

/// Upper bound on the buffer reserved up front for a feed body
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Anything that can turn a feed location into parsed items
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FeedError>;
}

/// Feed source backed by an HTTP client and the `rss` parser.
///
/// Locations without an http(s) scheme are read from the local filesystem.
pub struct RssFeedSource<C> {
    client: C,
}

impl<C: HttpClient> RssFeedSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for RssFeedSource<C> {
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FeedError> {
        let bytes = if is_url(url) {
            fetch_feed_bytes(&self.client, url).await?
        } else {
            read_feed_file(Path::new(url))?
        };
        parse_feed(&bytes)
    }
}

/// Fetch raw feed bytes from a URL (without parsing)
pub async fn fetch_feed_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, FeedError> {
    Url::parse(url)?;

    let response = client.get(url).await.map_err(|e| FeedError::FetchFailed {
        url: url.to_string(),
        source: e,
    })?;

    if !response.is_success() {
        return Err(FeedError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    // Content-Length is only a hint; a bogus value must not drive allocation
    let capacity = response.content_length.unwrap_or(0).min(MAX_PREALLOCATION);
    let mut bytes = Vec::with_capacity(capacity as usize);
    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| FeedError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;
        bytes.extend_from_slice(&chunk);
    }

    debug!("fetched {} bytes of feed from {}", bytes.len(), url);
    Ok(bytes)
}

/// Read raw feed bytes from a local file (without parsing)
pub fn read_feed_file(path: &Path) -> Result<Vec<u8>, FeedError> {
    std::fs::read(path).map_err(|e| FeedError::FileReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Determine if a string is a URL or a file path
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::http::{ByteStream, HttpResponse};
    use bytes::Bytes;
    use tempfile::tempdir;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Fetched</title>
    <description>Fetched feed</description>
    <item>
      <title>Only</title>
      <guid>only</guid>
      <enclosure url="https://example.com/only.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    struct MockHttpClient {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            let data = Bytes::from_static(self.body.as_bytes());
            let stream: ByteStream = Box::pin(futures::stream::once(async move { Ok(data) }));
            Ok(HttpResponse {
                status: self.status,
                content_length: Some(self.body.len() as u64),
                body: stream,
            })
        }
    }

    /// Announces an absurd Content-Length but sends a small body
    struct HugeLengthClient;

    #[async_trait]
    impl HttpClient for HugeLengthClient {
        async fn get(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            let data = Bytes::from_static(FEED.as_bytes());
            let stream: ByteStream = Box::pin(futures::stream::once(async move { Ok(data) }));
            Ok(HttpResponse {
                status: 200,
                content_length: Some(u64::MAX),
                body: stream,
            })
        }
    }

    #[tokio::test]
    async fn oversized_content_length_does_not_drive_allocation() {
        let bytes = fetch_feed_bytes(&HugeLengthClient, "https://example.com/feed.xml")
            .await
            .unwrap();

        assert_eq!(bytes, FEED.as_bytes());
    }

    #[test]
    fn is_url_detects_http() {
        assert!(is_url("http://example.com/feed.xml"));
        assert!(is_url("https://example.com/feed.xml"));
    }

    #[test]
    fn is_url_rejects_file_paths() {
        assert!(!is_url("/path/to/feed.xml"));
        assert!(!is_url("./feed.xml"));
        assert!(!is_url("feed.xml"));
    }

    #[tokio::test]
    async fn fetches_and_parses_remote_feed() {
        let source = RssFeedSource::new(MockHttpClient {
            status: 200,
            body: FEED,
        });

        let feed = source
            .fetch_feed("https://example.com/feed.xml")
            .await
            .unwrap();

        assert_eq!(feed.title, "Fetched");
        assert_eq!(feed.items.len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let source = RssFeedSource::new(MockHttpClient {
            status: 503,
            body: "unavailable",
        });

        let err = source
            .fetch_feed("https://example.com/feed.xml")
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn reads_local_feed_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, FEED).unwrap();

        let source = RssFeedSource::new(MockHttpClient {
            status: 500,
            body: "",
        });
        let feed = source.fetch_feed(path.to_str().unwrap()).await.unwrap();

        assert_eq!(feed.title, "Fetched");
    }

    #[tokio::test]
    async fn missing_local_feed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let source = RssFeedSource::new(MockHttpClient {
            status: 200,
            body: FEED,
        });

        let err = source
            .fetch_feed(dir.path().join("absent.xml").to_str().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::FileReadFailed { .. }));
    }
}
