// src/services/notifier.rs

//! Subscriber notification service.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::NotifierConfig;

/// Delivers change notifications to a single recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, uri: &str, added: &[String]) -> Result<()>;
}

/// Whether a string looks like an e-mail address.
pub fn is_valid_address(address: &str) -> bool {
    static ADDRESS: OnceLock<Option<Regex>> = OnceLock::new();
    ADDRESS
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(address))
}

fn check_recipient(recipient: &str) -> Result<()> {
    if is_valid_address(recipient) {
        Ok(())
    } else {
        Err(AppError::notification(recipient, "malformed recipient address"))
    }
}

/// A composed change message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notification {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub uri: String,
    pub added_items: Vec<String>,
}

impl Notification {
    /// Compose the message for one recipient.
    pub fn compose(sender: &NotifierConfig, recipient: &str, uri: &str, added: &[String]) -> Self {
        let mut body = format!("The webpage {} has changed!\n", uri);
        body.push_str(&format!("{} item(s) have been added!\n", added.len()));
        if !added.is_empty() {
            body.push_str("They are:\n");
            for item in added {
                body.push_str(&format!("   {}\n", item));
            }
        }

        Self {
            from_name: sender.sender_name.clone(),
            from_address: sender.sender_email.clone(),
            to: recipient.to_string(),
            subject: format!("Web page {} has changed", uri),
            body,
            uri: uri.to_string(),
            added_items: added.to_vec(),
        }
    }
}

/// Notifier that only writes messages to the log.
pub struct LogNotifier {
    sender: NotifierConfig,
}

impl LogNotifier {
    pub fn new(sender: NotifierConfig) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, uri: &str, added: &[String]) -> Result<()> {
        check_recipient(recipient)?;
        let message = Notification::compose(&self.sender, recipient, uri, added);
        log::info!("To: {} | {}\n{}", message.to, message.subject, message.body);
        Ok(())
    }
}

/// Notifier that POSTs each message as JSON to a webhook.
pub struct WebhookNotifier {
    client: Client,
    endpoint: url::Url,
    sender: NotifierConfig,
}

impl WebhookNotifier {
    pub fn new(sender: NotifierConfig, endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            sender,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, recipient: &str, uri: &str, added: &[String]) -> Result<()> {
        check_recipient(recipient)?;
        let message = Notification::compose(&self.sender, recipient, uri, added);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&message)
            .send()
            .await
            .map_err(|e| AppError::notification(recipient, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::notification(
                recipient,
                format!("webhook rejected message with status {}", status),
            ));
        }

        log::debug!("Delivered notification about {} to {}", uri, recipient);
        Ok(())
    }
}

/// Build the notifier described by the configuration.
pub fn from_config(config: &NotifierConfig, timeout_secs: u64) -> Result<Box<dyn Notifier>> {
    match &config.webhook_url {
        Some(endpoint) => Ok(Box::new(WebhookNotifier::new(
            config.clone(),
            endpoint,
            timeout_secs,
        )?)),
        None => Ok(Box::new(LogNotifier::new(config.clone()))),
    }
}
