//! Utility functions for RSS feed processing.

use chrono::{Local, NaiveDateTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use tracing::debug;

use super::types::DATE_FORMAT;
use crate::TARGET_WEB_REQUEST;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("valid tag pattern"));

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// Remove HTML tags from text and trim the result.
pub fn clean_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

/// Format a feed date string as `YYYY-MM-DD HH:MM`.
///
/// An empty string yields the current local time. Strings in the RSS
/// `Mon, 02 Jan 2006 15:04:05 GMT` form are reformatted; anything else is
/// returned as-is.
pub fn format_date(date_str: &str) -> String {
    if date_str.is_empty() {
        return Local::now().format(DATE_FORMAT).to_string();
    }

    match parse_rss_date(date_str) {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => date_str.to_string(),
    }
}

/// Parse `%a, %d %b %Y %H:%M:%S` followed by a GMT or UTC zone name,
/// keeping the wall-clock time as written.
///
/// The weekday has to be a day name but need not agree with the date.
fn parse_rss_date(date_str: &str) -> Option<NaiveDateTime> {
    let (weekday, rest) = date_str.split_once(", ")?;
    weekday.parse::<Weekday>().ok()?;

    let (stamp, zone) = rest.rsplit_once(' ')?;
    if !(zone.eq_ignore_ascii_case("GMT") || zone.eq_ignore_ascii_case("UTC")) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, "%d %b %Y %H:%M:%S").ok()
}

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    // Drop anything before the document start
    if let Some(xml_start) = cleaned.find("<?xml") {
        cleaned = cleaned[xml_start..].to_string();
    } else if let Some(rss_start) = cleaned.find("<rss") {
        cleaned = cleaned[rss_start..].to_string();
    } else if let Some(feed_start) = cleaned.find("<feed") {
        cleaned = cleaned[feed_start..].to_string();
    }

    // HTML entities that are undefined in XML
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&amp;amp;", "&amp;")
        .replace("&apos;", "&#39;");

    cleaned = cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | // tab
                '\u{000A}' | // newline
                '\u{000D}' | // carriage return
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();

    if !cleaned.starts_with("<?xml") {
        cleaned = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", cleaned);
    }

    cleaned
}

/// Undo compression a server applied without declaring it, or brotli
/// content the HTTP client does not decode itself.
pub fn decompress_body(bytes: &[u8], content_encoding: Option<&str>, feed_url: &str) -> Vec<u8> {
    if content_encoding == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(bytes, 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed brotli content from {}", feed_url);
            return decoded;
        }
        debug!(target: TARGET_WEB_REQUEST, "Brotli decompression failed for {}", feed_url);
    }

    // gzip magic
    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoded = Vec::new();
        if flate2::read::GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .is_ok()
            && !decoded.is_empty()
        {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed gzip content from {}", feed_url);
            return decoded;
        }
    }

    // zlib header: deflate method and a valid header checksum
    if bytes.len() > 2
        && (bytes[0] & 0x0f) == 8
        && ((u16::from(bytes[0]) << 8) | u16::from(bytes[1])) % 31 == 0
    {
        let mut decoded = Vec::new();
        if flate2::read::ZlibDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .is_ok()
            && !decoded.is_empty()
        {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed zlib content from {}", feed_url);
            return decoded;
        }
    }

    bytes.to_vec()
}

/// Decode a response body to text, honoring a `charset` in the content type
/// when the body is not valid UTF-8.
pub fn decode_body(bytes: Vec<u8>, content_type: Option<&str>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            let encoding = content_type
                .and_then(|ct| {
                    ct.split(';')
                        .find(|part| part.trim().to_lowercase().starts_with("charset="))
                        .and_then(|charset| charset.split('=').nth(1))
                })
                .and_then(|label| encoding_rs::Encoding::for_label(label.trim().as_bytes()))
                .unwrap_or(encoding_rs::WINDOWS_1252);
            let (decoded, _, _) = encoding.decode(&bytes);
            decoded.into_owned()
        }
    }
}
