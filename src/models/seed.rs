//! Seed data: subscribers, resources and subscriptions registered up front.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::storage::SnapshotStore;
use crate::utils::url::normalize;

/// Root seed data structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Seed {
    /// Subscriber identities (e-mail addresses)
    #[serde(default)]
    pub subscribers: Vec<String>,

    /// Resource URIs to monitor
    #[serde(default)]
    pub resources: Vec<String>,

    /// Subscriber-to-resource interests
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSeed>,
}

/// A single subscription entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSeed {
    pub subscriber: String,
    pub uri: String,
}

/// What a seeding run actually added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub subscribers_added: usize,
    pub resources_added: usize,
    pub subscriptions_added: usize,
    pub skipped: usize,
}

impl Seed {
    /// Load seed data from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate that every URI is monitorable and every subscription refers
    /// to a listed subscriber.
    pub fn validate(&self) -> Result<()> {
        for uri in &self.resources {
            normalize(uri)?;
        }
        for sub in &self.subscriptions {
            normalize(&sub.uri)?;
            if !self.subscribers.contains(&sub.subscriber) {
                return Err(AppError::validation(format!(
                    "Subscription to {} references unknown subscriber {}",
                    sub.uri, sub.subscriber
                )));
            }
        }
        Ok(())
    }

    /// Register everything in the store.
    ///
    /// URIs are normalized the same way the CLI does it. Duplicates are
    /// reported and skipped so the same seed can be applied repeatedly.
    pub async fn apply(&self, store: &dyn SnapshotStore) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        for id in &self.subscribers {
            match store.add_subscriber(id).await {
                Ok(()) => summary.subscribers_added += 1,
                Err(AppError::Registration(msg)) => {
                    log::warn!("Seed: {}", msg);
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for uri in &self.resources {
            let uri = normalize(uri)?;
            if store.is_resource_registered(&uri).await? {
                summary.skipped += 1;
                continue;
            }
            store.add_resource(&uri).await?;
            summary.resources_added += 1;
        }

        for sub in &self.subscriptions {
            let uri = normalize(&sub.uri)?;
            match store.add_subscription(&sub.subscriber, &uri).await {
                Ok(()) => summary.subscriptions_added += 1,
                Err(AppError::Registration(msg)) => {
                    log::warn!("Seed: {}", msg);
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }
}
