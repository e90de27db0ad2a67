//! Type definitions for the RSS module.

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// A normalized feed entry, ready to classify and serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published: String,
    pub source: String,
    pub predicted_labels: Vec<String>,
}

/// Limits applied while collecting articles.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub max_articles_per_feed: usize,
    pub request_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_articles_per_feed: MAX_ARTICLES_PER_FEED,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

/// JSON feed structure for parsing
#[derive(Debug, Deserialize)]
pub struct JsonFeed {
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<JsonFeedItem>,
}

/// JSON feed item structure
#[derive(Debug, Deserialize)]
pub struct JsonFeedItem {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub date_published: Option<String>,
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_ARTICLES_PER_FEED: usize = 10;

pub const MISSING_TITLE: &str = "No Title";
pub const MISSING_LINK: &str = "#";
pub const MISSING_SOURCE: &str = "Unknown Source";

/// Display format for publication timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
