//! External collaborators of the poll cycle: retrieval and notification.

pub mod fetcher;
#[cfg(test)]
pub mod mock;
pub mod notifier;

pub use fetcher::{Fetcher, HttpFetcher};
pub use notifier::{LogNotifier, Notification, Notifier, WebhookNotifier};
