// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::error::FeedError;

/// A parsed feed: channel title plus its items
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub items: Vec<FeedItem>,
}

/// A single feed item as published, before it becomes a tracked episode
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// First enclosure found on the item
    pub enclosure_url: Option<String>,
    /// Publish date; the Unix epoch when missing or unparseable
    pub published: DateTime<FixedOffset>,
}

/// The timestamp used for items whose publish date cannot be read
pub fn zero_timestamp() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

/// Parse RSS feed XML bytes into a Feed
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Feed, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let items = channel.items().iter().filter_map(parse_item).collect();

    Ok(Feed {
        title: channel.title().to_string(),
        items,
    })
}

fn parse_item(item: &rss::Item) -> Option<FeedItem> {
    let title = item.title().map(String::from).unwrap_or_default();
    let enclosure_url = item
        .enclosure()
        .map(|enclosure| enclosure.url().to_string())
        .filter(|url| !url.is_empty());

    // Items without a GUID fall back to their enclosure URL for identity
    let guid = item
        .guid()
        .map(|g| g.value().to_string())
        .filter(|g| !g.is_empty())
        .or_else(|| enclosure_url.clone());

    let Some(guid) = guid else {
        debug!("skipping feed item '{}' with neither guid nor enclosure", title);
        return None;
    };

    let published = item
        .pub_date()
        .and_then(parse_pub_date)
        .unwrap_or_else(zero_timestamp);

    Some(FeedItem {
        guid,
        title,
        link: item.link().map(String::from),
        description: item.description().map(String::from),
        author: item
            .author()
            .map(String::from)
            .or_else(|| item.itunes_ext().and_then(|ext| ext.author().map(String::from))),
        enclosure_url,
        published,
    })
}

/// Parse an item publish date.
///
/// RFC 1123 with a numeric zone is the expected form; a few looser forms
/// seen in the wild are accepted as well.
pub fn parse_pub_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        return Some(dt);
    }

    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    formats
        .iter()
        .find_map(|format| DateTime::parse_from_str(date_str, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(date_str).ok())
}
