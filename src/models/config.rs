//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::notifier::is_valid_address;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Poll cycle behavior
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// HTTP retrieval settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Notification sender settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Snapshot store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.max_retrieval_attempts == 0 {
            return Err(AppError::validation(
                "monitor.max_retrieval_attempts must be > 0",
            ));
        }
        if self.monitor.max_concurrent == 0 {
            return Err(AppError::validation("monitor.max_concurrent must be > 0"));
        }
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        scraper::Selector::parse(&self.fetcher.item_selector)
            .map_err(|e| AppError::selector(&self.fetcher.item_selector, format!("{e:?}")))?;
        if !is_valid_address(&self.notifier.sender_email) {
            return Err(AppError::validation(format!(
                "notifier.sender_email '{}' is not a valid address",
                self.notifier.sender_email
            )));
        }
        if let Some(webhook) = &self.notifier.webhook_url {
            url::Url::parse(webhook)?;
        }
        Ok(())
    }
}

/// Poll cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Fetch attempts per resource per cycle
    #[serde(default = "defaults::max_retrieval_attempts")]
    pub max_retrieval_attempts: u32,

    /// Pause between attempts on the same resource in milliseconds
    #[serde(default)]
    pub retry_delay_ms: u64,

    /// Resources processed in parallel (1 keeps listing order)
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_retrieval_attempts: defaults::max_retrieval_attempts(),
            retry_delay_ms: 0,
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// HTTP client and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// CSS selector for content items
    #[serde(default = "defaults::item_selector")]
    pub item_selector: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            item_selector: defaults::item_selector(),
        }
    }
}

/// Notification sender settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "defaults::sender_name")]
    pub sender_name: String,

    #[serde(default = "defaults::sender_email")]
    pub sender_email: String,

    /// Delivery endpoint; notifications are only logged when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            sender_name: defaults::sender_name(),
            sender_email: defaults::sender_email(),
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local snapshot store
    #[serde(default = "defaults::root_dir")]
    pub root_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::root_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    // Monitor defaults
    pub fn max_retrieval_attempts() -> u32 {
        2
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Fetcher defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; webmonitor/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn item_selector() -> String {
        "div.coupon > h3 > a".into()
    }

    // Notifier defaults
    pub fn sender_name() -> String {
        "Web Monitor".into()
    }
    pub fn sender_email() -> String {
        "webmonitor@localhost.localdomain".into()
    }

    pub fn root_dir() -> String {
        "storage".into()
    }
    pub fn level() -> String {
        "info".into()
    }
}
