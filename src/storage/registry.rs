//! Resource, subscriber and subscription bookkeeping shared by the backends.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A subscriber's interest in a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub subscriber: String,
    pub uri: String,
}

/// Registration state of a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub resources: Vec<String>,

    #[serde(default)]
    pub subscribers: Vec<String>,

    #[serde(default)]
    pub subscriptions: Vec<Subscription>,

    /// Last snapshot sequence number handed out
    #[serde(default)]
    pub last_seq: u64,
}

impl Registry {
    /// Register a resource; returns `false` if it was already known.
    pub fn add_resource(&mut self, uri: &str) -> bool {
        if self.has_resource(uri) {
            return false;
        }
        self.resources.push(uri.to_string());
        true
    }

    /// Unregister a resource and every subscription to it.
    pub fn remove_resource(&mut self, uri: &str) -> bool {
        let before = self.resources.len();
        self.resources.retain(|r| r != uri);
        self.subscriptions.retain(|s| s.uri != uri);
        self.resources.len() != before
    }

    pub fn has_resource(&self, uri: &str) -> bool {
        self.resources.iter().any(|r| r == uri)
    }

    pub fn add_subscriber(&mut self, id: &str) -> Result<()> {
        if self.has_subscriber(id) {
            return Err(AppError::registration(format!(
                "Subscriber {} is already registered",
                id
            )));
        }
        self.subscribers.push(id.to_string());
        Ok(())
    }

    pub fn remove_subscriber(&mut self, id: &str) -> Result<()> {
        if !self.has_subscriber(id) {
            return Err(AppError::registration(format!(
                "Subscriber {} is not registered",
                id
            )));
        }
        self.subscribers.retain(|s| s != id);
        self.subscriptions.retain(|s| s.subscriber != id);
        Ok(())
    }

    pub fn has_subscriber(&self, id: &str) -> bool {
        self.subscribers.iter().any(|s| s == id)
    }

    /// Subscribe a registered subscriber, registering the resource if needed.
    pub fn add_subscription(&mut self, subscriber: &str, uri: &str) -> Result<()> {
        if !self.has_subscriber(subscriber) {
            return Err(AppError::registration(format!(
                "Subscriber {} is not registered",
                subscriber
            )));
        }
        if self.is_subscribed(subscriber, uri) {
            return Err(AppError::registration(format!(
                "Subscriber {} is already subscribed to {}",
                subscriber, uri
            )));
        }
        self.add_resource(uri);
        self.subscriptions.push(Subscription {
            subscriber: subscriber.to_string(),
            uri: uri.to_string(),
        });
        Ok(())
    }

    pub fn remove_subscription(&mut self, subscriber: &str, uri: &str) -> Result<()> {
        if !self.is_subscribed(subscriber, uri) {
            return Err(AppError::registration(format!(
                "Subscriber {} is not subscribed to {}",
                subscriber, uri
            )));
        }
        self.subscriptions
            .retain(|s| !(s.subscriber == subscriber && s.uri == uri));
        Ok(())
    }

    pub fn is_subscribed(&self, subscriber: &str, uri: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber && s.uri == uri)
    }

    pub fn subscribers_of(&self, uri: &str) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|s| s.uri == uri)
            .map(|s| s.subscriber.clone())
            .collect()
    }

    pub fn subscriptions_of(&self, subscriber: &str) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|s| s.subscriber == subscriber)
            .map(|s| s.uri.clone())
            .collect()
    }

    /// Hand out the next snapshot sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    /// Hand out a sequence number greater than both the counter and `floor`.
    pub fn next_seq_above(&mut self, floor: u64) -> u64 {
        self.last_seq = self.last_seq.max(floor);
        self.next_seq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "http://example.com/deals";

    #[test]
    fn test_add_resource_idempotent() {
        let mut registry = Registry::default();
        assert!(registry.add_resource(URI));
        assert!(!registry.add_resource(URI));
        assert_eq!(registry.resources.len(), 1);
    }

    #[test]
    fn test_duplicate_subscriber_rejected() {
        let mut registry = Registry::default();
        registry.add_subscriber("a@example.com").unwrap();
        assert!(matches!(
            registry.add_subscriber("a@example.com"),
            Err(AppError::Registration(_))
        ));
    }

    #[test]
    fn test_subscription_requires_registered_subscriber() {
        let mut registry = Registry::default();
        assert!(registry.add_subscription("a@example.com", URI).is_err());
        assert!(registry.subscriptions.is_empty());
    }

    #[test]
    fn test_duplicate_subscription_rejected() {
        let mut registry = Registry::default();
        registry.add_subscriber("a@example.com").unwrap();
        registry.add_subscription("a@example.com", URI).unwrap();
        assert!(registry.add_subscription("a@example.com", URI).is_err());
        assert_eq!(registry.subscribers_of(URI), vec!["a@example.com"]);
    }

    #[test]
    fn test_subscription_registers_resource() {
        let mut registry = Registry::default();
        registry.add_subscriber("a@example.com").unwrap();
        registry.add_subscription("a@example.com", URI).unwrap();
        assert!(registry.has_resource(URI));
    }

    #[test]
    fn test_remove_resource_drops_subscriptions() {
        let mut registry = Registry::default();
        registry.add_subscriber("a@example.com").unwrap();
        registry.add_subscription("a@example.com", URI).unwrap();

        assert!(registry.remove_resource(URI));
        assert!(registry.subscribers_of(URI).is_empty());
        assert!(registry.subscriptions_of("a@example.com").is_empty());
    }

    #[test]
    fn test_remove_subscriber_drops_subscriptions() {
        let mut registry = Registry::default();
        registry.add_subscriber("a@example.com").unwrap();
        registry.add_subscription("a@example.com", URI).unwrap();

        registry.remove_subscriber("a@example.com").unwrap();
        assert!(registry.subscribers_of(URI).is_empty());
        assert!(registry.remove_subscriber("a@example.com").is_err());
    }

    #[test]
    fn test_remove_missing_subscription() {
        let mut registry = Registry::default();
        registry.add_subscriber("a@example.com").unwrap();
        assert!(registry.remove_subscription("a@example.com", URI).is_err());
    }

    #[test]
    fn test_seq_strictly_increasing() {
        let mut registry = Registry::default();
        let first = registry.next_seq();
        let second = registry.next_seq();
        assert!(second > first);
    }

    #[test]
    fn test_seq_above_floor() {
        let mut registry = Registry::default();
        assert_eq!(registry.next_seq_above(7), 8);
        assert_eq!(registry.next_seq_above(3), 9);
    }
}
