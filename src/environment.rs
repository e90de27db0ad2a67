use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::time::Duration;

use crate::classifier::{DEFAULT_MODEL_PATH, DEFAULT_THRESHOLD};
use crate::rss::{FeedSettings, MAX_ARTICLES_PER_FEED, REQUEST_TIMEOUT};

/// Feeds collected when `RSS_URLS` is not set.
pub const DEFAULT_FEEDS: [&str; 4] = [
    "http://rss.cnn.com/rss/edition.rss",
    "http://feeds.bbci.co.uk/news/rss.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
    "https://feeds.reuters.com/reuters/topNews",
];

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub feed_urls: Vec<String>,
    pub bind_addr: String,
    pub port: u16,
    pub threshold: f32,
    pub feed_settings: FeedSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_urls = lookup("RSS_URLS")
            .map(|value| split_list(&value, ';'))
            .filter(|urls| !urls.is_empty())
            .unwrap_or_else(|| DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect());

        let max_articles_per_feed: usize =
            parse_var(&lookup, "MAX_ARTICLES_PER_FEED", MAX_ARTICLES_PER_FEED)?;
        if max_articles_per_feed == 0 {
            return Err(anyhow!("MAX_ARTICLES_PER_FEED must be at least 1"));
        }

        let timeout_secs: u64 =
            parse_var(&lookup, "FEED_TIMEOUT_SECS", REQUEST_TIMEOUT.as_secs())?;

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            feed_urls,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            threshold: validate_threshold(parse_var(&lookup, "LABEL_THRESHOLD", DEFAULT_THRESHOLD)?)?,
            feed_settings: FeedSettings {
                max_articles_per_feed,
                request_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Probability thresholds must lie in [0, 1].
pub fn validate_threshold(threshold: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(anyhow!(
            "threshold must be between 0 and 1, got {}",
            threshold
        ))
    }
}

/// Split a delimited list, trimming entries and dropping empty ones.
pub fn split_list(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_var<T, F>(lookup: &F, var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", var, value)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.model_path, PathBuf::from("./Models/roberta/model_weights"));
        assert_eq!(config.feed_urls.len(), 4);
        assert_eq!(config.port, 5000);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.feed_settings.max_articles_per_feed, 10);
        assert_eq!(config.feed_settings.request_timeout, Duration::from_secs(30));
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RSS_URLS", "https://a.example/rss; https://b.example/rss ;"),
            ("MODEL_PATH", "/models/news"),
            ("PORT", "8080"),
            ("LABEL_THRESHOLD", "0.35"),
            ("MAX_ARTICLES_PER_FEED", "3"),
            ("FEED_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(
            config.feed_urls,
            vec!["https://a.example/rss", "https://b.example/rss"]
        );
        assert_eq!(config.model_path, PathBuf::from("/models/news"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.threshold, 0.35);
        assert_eq!(config.feed_settings.max_articles_per_feed, 3);
        assert_eq!(config.feed_settings.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_feed_list_uses_defaults() {
        let config = config_from(&[("RSS_URLS", " ; ")]).unwrap();
        assert_eq!(config.feed_urls[0], DEFAULT_FEEDS[0]);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("LABEL_THRESHOLD", "1.5")]).is_err());
        assert!(config_from(&[("LABEL_THRESHOLD", "-0.1")]).is_err());
        assert!(config_from(&[("MAX_ARTICLES_PER_FEED", "0")]).is_err());
    }

    #[test]
    fn test_validate_threshold_bounds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(f32::NAN).is_err());
    }
}
