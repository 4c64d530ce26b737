// src/utils/url.rs

//! Resource URI helpers.

use url::Url;

use crate::error::{AppError, Result};

/// Normalize a resource URI before registration.
///
/// Only absolute `http`/`https` URIs are accepted. The result is the parser's
/// serialization, so `HTTP://Example.com` and `http://example.com/` register
/// as the same resource.
pub fn normalize(uri: &str) -> Result<String> {
    let parsed = Url::parse(uri.trim())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(AppError::validation(format!(
            "Unsupported scheme '{}' in {}",
            other, uri
        ))),
    }
}
