//! HTTP client creation and request handling for RSS feeds.

use anyhow::{anyhow, Result};
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::util::{decode_body, decompress_body};
use crate::TARGET_WEB_REQUEST;

const USER_AGENT: &str = concat!("newslabel/", env!("CARGO_PKG_VERSION"));
const FEED_ACCEPT: &str = "application/feed+json, application/json, application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9";

/// A fetched feed document, decompressed and decoded to text.
#[derive(Debug)]
pub struct FeedResponse {
    pub body: String,
    pub content_type: Option<String>,
}

/// Create the client shared by all feed requests of one collection run.
pub fn create_http_client() -> Result<reqwest::Client> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Fetch one feed, failing on timeouts and non-success statuses.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    request_timeout: Duration,
) -> Result<FeedResponse> {
    debug!(target: TARGET_WEB_REQUEST, "Loading RSS feed from {}", url);

    let response = match timeout(
        request_timeout,
        client.get(url).header(header::ACCEPT, FEED_ACCEPT).send(),
    )
    .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => return Err(anyhow!("Request to {} failed: {}", url, err)),
        Err(_) => {
            return Err(anyhow!(
                "Request to {} timed out after {} seconds",
                url,
                request_timeout.as_secs()
            ))
        }
    };

    if !response.status().is_success() {
        return Err(anyhow!("Non-success status {} from {}", response.status(), url));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_lowercase());
    let content_encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_lowercase());

    let bytes = match timeout(request_timeout, response.bytes()).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => return Err(anyhow!("Failed to read response body from {}: {}", url, err)),
        Err(_) => return Err(anyhow!("Reading response body from {} timed out", url)),
    };

    let decompressed = decompress_body(&bytes, content_encoding.as_deref(), url);
    let body = decode_body(decompressed, content_type.as_deref());
    debug!(target: TARGET_WEB_REQUEST,
        "Fetched {} ({:?}): {}",
        url,
        content_type,
        body.chars().take(200).collect::<String>()
    );

    Ok(FeedResponse { body, content_type })
}
