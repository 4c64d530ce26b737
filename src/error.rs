// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Retrieval of a resource failed (transport, DNS, malformed URI, ...)
    #[error("Fetch error for {uri}: {message}")]
    Fetch { uri: String, message: String },

    /// The expected most recent snapshot vanished between read and write
    #[error("No snapshot of {uri} observed at {observed_at} was found")]
    NotPersisted {
        uri: String,
        observed_at: DateTime<Utc>,
    },

    /// Delivery to a single subscriber failed
    #[error("Could not notify {recipient}: {message}")]
    Notification { recipient: String, message: String },

    /// Duplicate or unknown subscriber/subscription
    #[error("Registration error: {0}")]
    Registration(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client setup failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a fetch error for a resource.
    pub fn fetch(uri: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error for a recipient.
    pub fn notification(recipient: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notification {
            recipient: recipient.into(),
            message: message.to_string(),
        }
    }

    /// Create a registration error.
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration(message.into())
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message() {
        let err = AppError::fetch("http://example.com", "connection refused");
        assert_eq!(
            err.to_string(),
            "Fetch error for http://example.com: connection refused"
        );
    }

    #[test]
    fn test_registration_error_message() {
        let err = AppError::registration("Subscriber a@b.c is already registered");
        assert!(err.to_string().starts_with("Registration error:"));
    }
}
