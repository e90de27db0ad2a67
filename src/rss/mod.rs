//! Feed collection and article normalization.
//!
//! Fetches RSS, Atom and JSON feeds, and turns their entries into
//! [`Article`]s with cleaned text and display-formatted dates.

mod client;
mod fetcher;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::client::{create_http_client, fetch_feed, FeedResponse};
pub use self::fetcher::parse_feeds;
pub use self::parser::parse_feed_body;
pub use self::util::{clean_html, format_date, is_valid_url};

#[cfg(test)]
pub(crate) use self::fetcher::tests as test_support;
