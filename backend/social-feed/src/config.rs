//! Configuration management for social-feed
//!
//! Loads configuration from environment variables.

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::BoundingBox;
use crate::error::{ServiceError, ServiceResult};
use crate::services::SnippetGenerator;
use crate::store::StoreLimits;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Document store configuration
    pub store: StoreConfig,
    /// Feed assembly settings
    pub feed: FeedConfig,
    /// Repost synthesis settings
    pub repost: RepostConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    pub log_level: String,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot used by the maintenance tool
    pub snapshot_path: String,
    /// Max operations per batch write
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Max values in an `in` membership filter
    #[serde(default = "default_max_membership_filter")]
    pub max_membership_filter: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts returned by a one-shot feed fetch
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepostConfig {
    pub bounding_box: BoundingBox,
    #[serde(default = "default_min_snippet_words")]
    pub min_snippet_words: usize,
    #[serde(default = "default_max_snippet_words")]
    pub max_snippet_words: usize,
    /// Reposts generated when no count is given
    #[serde(default = "default_repost_count")]
    pub default_count: usize,
}

// Default values
fn default_snapshot_path() -> String {
    "./data/store.json".to_string()
}

fn default_max_batch_size() -> usize {
    500
}

fn default_max_membership_filter() -> usize {
    10
}

fn default_page_size() -> usize {
    10
}

fn default_min_snippet_words() -> usize {
    3
}

fn default_max_snippet_words() -> usize {
    7
}

fn default_repost_count() -> usize {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value when set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = AppConfig {
            env: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        let store = StoreConfig {
            snapshot_path: lookup("STORE_SNAPSHOT_PATH").unwrap_or_else(default_snapshot_path),
            max_batch_size: parse_or(&lookup, "STORE_MAX_BATCH_SIZE", default_max_batch_size)?,
            max_membership_filter: parse_or(
                &lookup,
                "STORE_MAX_MEMBERSHIP_FILTER",
                default_max_membership_filter,
            )?,
        };

        let feed = FeedConfig {
            page_size: parse_or(&lookup, "FEED_PAGE_SIZE", default_page_size)?,
        };

        let defaults = BoundingBox::YONGSAN;
        let repost = RepostConfig {
            bounding_box: BoundingBox {
                min_lat: parse_or(&lookup, "REPOST_MIN_LAT", || defaults.min_lat)?,
                max_lat: parse_or(&lookup, "REPOST_MAX_LAT", || defaults.max_lat)?,
                min_lng: parse_or(&lookup, "REPOST_MIN_LNG", || defaults.min_lng)?,
                max_lng: parse_or(&lookup, "REPOST_MAX_LNG", || defaults.max_lng)?,
            },
            min_snippet_words: parse_or(
                &lookup,
                "REPOST_MIN_SNIPPET_WORDS",
                default_min_snippet_words,
            )?,
            max_snippet_words: parse_or(
                &lookup,
                "REPOST_MAX_SNIPPET_WORDS",
                default_max_snippet_words,
            )?,
            default_count: parse_or(&lookup, "REPOST_DEFAULT_COUNT", default_repost_count)?,
        };

        Ok(Config {
            app,
            store,
            feed,
            repost,
        })
    }

    /// Reject settings no operation could run with.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.store.max_batch_size == 0 {
            return Err(ServiceError::Config(
                "STORE_MAX_BATCH_SIZE must be positive".to_string(),
            ));
        }
        if self.store.max_membership_filter == 0 {
            return Err(ServiceError::Config(
                "STORE_MAX_MEMBERSHIP_FILTER must be positive".to_string(),
            ));
        }
        if self.feed.page_size == 0 {
            return Err(ServiceError::Config(
                "FEED_PAGE_SIZE must be positive".to_string(),
            ));
        }
        if self.repost.default_count == 0 {
            return Err(ServiceError::Config(
                "REPOST_DEFAULT_COUNT must be positive".to_string(),
            ));
        }
        self.repost.bounding_box.validate()?;
        self.snippet_generator()?;
        Ok(())
    }

    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_batch_size: self.store.max_batch_size,
            max_membership_filter: self.store.max_membership_filter,
        }
    }

    pub fn snippet_generator(&self) -> ServiceResult<SnippetGenerator> {
        SnippetGenerator::new(
            self.repost.min_snippet_words,
            self.repost.max_snippet_words,
        )
    }
}

fn parse_or<F, T, D>(lookup: &F, key: &str, default: D) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.store.snapshot_path, "./data/store.json");
        assert_eq!(config.store.max_batch_size, 500);
        assert_eq!(config.store.max_membership_filter, 10);
        assert_eq!(config.feed.page_size, 10);
        assert_eq!(config.repost.bounding_box, BoundingBox::YONGSAN);
        assert_eq!(config.repost.min_snippet_words, 3);
        assert_eq!(config.repost.max_snippet_words, 7);
        assert_eq!(config.repost.default_count, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STORE_MAX_BATCH_SIZE", "100"),
            ("FEED_PAGE_SIZE", " 25 "),
            ("REPOST_MIN_LAT", "10.5"),
        ])
        .unwrap();

        assert_eq!(config.store_limits().max_batch_size, 100);
        assert_eq!(config.feed.page_size, 25);
        assert_eq!(config.repost.bounding_box.min_lat, 10.5);
    }

    #[test]
    fn test_unparsable_value_names_the_variable() {
        let err = load(&[("FEED_PAGE_SIZE", "ten")]).unwrap_err();
        assert!(err.to_string().contains("FEED_PAGE_SIZE"));
    }

    #[test]
    fn test_validate_rejects_malformed_settings() {
        let inverted = load(&[("REPOST_MIN_LAT", "40.0")]).unwrap();
        assert!(matches!(inverted.validate(), Err(ServiceError::Config(_))));

        let zero_batch = load(&[("STORE_MAX_BATCH_SIZE", "0")]).unwrap();
        assert!(matches!(zero_batch.validate(), Err(ServiceError::Config(_))));

        let unbounded =
            load(&[("REPOST_MIN_LAT", "-1e308"), ("REPOST_MAX_LAT", "1e308")]).unwrap();
        assert!(matches!(unbounded.validate(), Err(ServiceError::Config(_))));

        let words = load(&[("REPOST_MIN_SNIPPET_WORDS", "9")]).unwrap();
        assert!(matches!(words.validate(), Err(ServiceError::Config(_))));
    }
}
