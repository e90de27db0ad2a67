//! Feed parsing logic for RSS, Atom, and JSON formats.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;
use tracing::{debug, warn};

use super::types::{Article, JsonFeed, JsonFeedItem, MISSING_LINK, MISSING_SOURCE, MISSING_TITLE};
use super::util::{clean_html, cleanup_xml, format_date};
use crate::TARGET_WEB_REQUEST;

/// Parse a feed document into at most `limit` articles, in feed order.
pub fn parse_feed_body(
    body: &str,
    content_type: Option<&str>,
    limit: usize,
    feed_url: &str,
) -> Result<Vec<Article>> {
    if content_type.is_some_and(|ct| ct.contains("json")) {
        debug!(target: TARGET_WEB_REQUEST, "Processing as JSON feed: {}", feed_url);
        let feed: JsonFeed = serde_json::from_str(body)
            .map_err(|err| anyhow!("JSON parsing error: {}", err))?;
        let source = feed.title.unwrap_or_else(|| MISSING_SOURCE.to_string());
        return Ok(feed
            .items
            .into_iter()
            .take(limit)
            .map(|item| article_from_json_item(item, &source))
            .collect());
    }

    debug!(target: TARGET_WEB_REQUEST, "Processing as XML feed: {}", feed_url);
    let raw_dates = RawDates::default();
    let feed = match raw_dates.parser().parse(Cursor::new(body)) {
        Ok(feed) => feed,
        Err(first_err) => {
            let cleaned_xml = cleanup_xml(body);
            if !(cleaned_xml.contains("<rss") || cleaned_xml.contains("<feed")) {
                let preview = if body
                    .chars()
                    .all(|c| c.is_ascii_graphic() || c.is_whitespace())
                {
                    body.chars().take(100).collect::<String>()
                } else {
                    "[binary data]".to_string()
                };
                return Err(anyhow!(
                    "Content is not an RSS or Atom feed. Content preview: {}",
                    preview
                ));
            }

            match raw_dates.parser().parse(Cursor::new(cleaned_xml)) {
                Ok(feed) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed {} parsed only after XML cleanup", feed_url);
                    feed
                }
                Err(second_err) => {
                    return Err(anyhow!(
                        "Failed to parse feed even after cleanup. First error: {}. Second error: {}",
                        first_err,
                        second_err
                    ));
                }
            }
        }
    };

    let source = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| MISSING_SOURCE.to_string());

    debug!(target: TARGET_WEB_REQUEST, "Parsed feed {} with {} entries", feed_url, feed.entries.len());
    Ok(feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| article_from_entry(entry, &source, &raw_dates))
        .collect())
}

/// Date text exactly as it appeared in an XML feed.
///
/// feed-rs only hands back parsed timestamps. Each date it meets is stored
/// here and the parser receives the entry's index as a stand-in timestamp,
/// which `raw` maps back to the original text.
#[derive(Clone, Default)]
struct RawDates(Rc<RefCell<Vec<String>>>);

impl RawDates {
    fn parser(&self) -> parser::Parser {
        let dates = self.clone();
        parser::Builder::new()
            .timestamp_parser(move |text| dates.record(text))
            .build()
    }

    fn record(&self, text: &str) -> Option<DateTime<Utc>> {
        let mut dates = self.0.borrow_mut();
        dates.push(text.to_string());
        DateTime::from_timestamp(dates.len() as i64 - 1, 0)
    }

    fn raw(&self, stand_in: &DateTime<Utc>) -> Option<String> {
        let index = usize::try_from(stand_in.timestamp()).ok()?;
        self.0.borrow().get(index).cloned()
    }
}

fn article_from_entry(entry: Entry, source: &str, raw_dates: &RawDates) -> Article {
    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    Article {
        title: entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| MISSING_TITLE.to_string()),
        description: clean_html(&description),
        link: entry
            .links
            .first()
            .map(|link| link.href.clone())
            .unwrap_or_else(|| MISSING_LINK.to_string()),
        published: format_date(
            &entry
                .published
                .and_then(|date| raw_dates.raw(&date))
                .unwrap_or_default(),
        ),
        source: source.to_string(),
        predicted_labels: Vec::new(),
    }
}

fn article_from_json_item(item: JsonFeedItem, source: &str) -> Article {
    let description = item
        .summary
        .or(item.content_text)
        .or(item.content_html)
        .unwrap_or_default();

    Article {
        title: item.title.unwrap_or_else(|| MISSING_TITLE.to_string()),
        description: clean_html(&description),
        link: item
            .url
            .or(item.id)
            .unwrap_or_else(|| MISSING_LINK.to_string()),
        published: format_date(item.date_published.as_deref().unwrap_or_default()),
        source: source.to_string(),
        predicted_labels: Vec::new(),
    }
}
