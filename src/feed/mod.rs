mod fetch;
mod parse;

pub use fetch::{FeedSource, RssFeedSource, fetch_feed_bytes, is_url, read_feed_file};
pub use parse::{Feed, FeedItem, parse_feed, parse_pub_date, zero_timestamp};
