// src/services/fetcher.rs

//! Resource fetcher service.
//!
//! Retrieves a page and reduces it to the list of content items matched by the
//! configured CSS selector.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{FetcherConfig, Snapshot};

/// Produces a fresh snapshot of a resource.
///
/// A non-2xx status is not an error: it is recorded in the snapshot. Errors
/// are reserved for failures to obtain a response at all.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Snapshot>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: Client,
    item_selector: String,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        // Fail at construction rather than on every fetch
        parse_selector(&config.item_selector)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            item_selector: config.item_selector.clone(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Snapshot> {
        let url = url::Url::parse(uri).map_err(|e| AppError::fetch(uri, e))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(uri, e))?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Consumes the response; the connection is released on every path
        let body = response.text().await.map_err(|e| AppError::fetch(uri, e))?;
        let observed_at = Utc::now();

        let content = if is_markup(content_type.as_deref()) {
            Some(extract_items(&body, &self.item_selector)?)
        } else {
            None
        };

        log::debug!(
            "Fetched {} (status {}, {} items)",
            uri,
            status_code,
            content.as_ref().map_or(0, Vec::len)
        );

        Ok(Snapshot::new(
            uri,
            content,
            content_type,
            status_code,
            observed_at,
        ))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))
}

/// Whether a payload with this content type can carry extractable items.
///
/// A missing header is treated as markup.
fn is_markup(content_type: Option<&str>) -> bool {
    match content_type {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("html") || ct.contains("xml")
        }
        None => true,
    }
}

/// Extract the whitespace-normalized text of every selector match, in document order.
pub fn extract_items(html: &str, selector: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
