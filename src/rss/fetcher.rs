//! Collecting articles from a list of feeds.

use tracing::{debug, error, info};

use super::client::{create_http_client, fetch_feed};
use super::parser::parse_feed_body;
use super::types::{Article, FeedSettings};
use super::util::is_valid_url;
use crate::TARGET_WEB_REQUEST;

/// Fetch and parse every feed in `feed_urls`, in order.
///
/// Each feed contributes at most `settings.max_articles_per_feed` articles.
/// A feed that cannot be fetched or parsed is logged and skipped; it never
/// affects the others, and this function itself never fails.
pub async fn parse_feeds(feed_urls: &[String], settings: &FeedSettings) -> Vec<Article> {
    let mut articles = Vec::new();

    let client = match create_http_client() {
        Ok(client) => client,
        Err(err) => {
            error!(target: TARGET_WEB_REQUEST, "{}", err);
            return articles;
        }
    };

    for feed_url in feed_urls {
        if feed_url.trim().is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Skipping empty RSS URL");
            continue;
        }

        if !is_valid_url(feed_url) {
            debug!(target: TARGET_WEB_REQUEST, "Skipping invalid URL: {}", feed_url);
            continue;
        }

        let parsed = match fetch_feed(&client, feed_url, settings.request_timeout).await {
            Ok(response) => parse_feed_body(
                &response.body,
                response.content_type.as_deref(),
                settings.max_articles_per_feed,
                feed_url,
            ),
            Err(err) => Err(err),
        };

        match parsed {
            Ok(mut feed_articles) => {
                info!(target: TARGET_WEB_REQUEST, "Collected {} articles from {}", feed_articles.len(), feed_url);
                articles.append(&mut feed_articles);
            }
            Err(err) => {
                error!(target: TARGET_WEB_REQUEST, "Error parsing feed {}: {}", feed_url, err);
            }
        }
    }

    articles
}
