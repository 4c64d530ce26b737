//! Storage abstractions for snapshot persistence.
//!
//! The store is the only state shared between poll cycles. It keeps:
//! - registered resources, in registration order
//! - subscribers and subscriptions
//! - the snapshot history of each resource
//!
//! Two backends are provided: [`MemoryStore`] for tests and ephemeral runs,
//! and [`LocalStorage`] which persists JSON files under a root directory.

pub mod local;
pub mod memory;
pub mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::Snapshot;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;
pub use registry::{Registry, Subscription};

/// Trait for snapshot storage backends.
///
/// Implementations serialize their own mutations. The timestamp update is a
/// compare-and-swap on `(uri, old_observed_at)` so that two overlapping poll
/// cycles cannot both bump the same "most recent" snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Register a resource. Re-registering is a no-op.
    async fn add_resource(&self, uri: &str) -> Result<()>;

    /// Unregister a resource together with its snapshots and subscriptions.
    async fn remove_resource(&self, uri: &str) -> Result<()>;

    async fn is_resource_registered(&self, uri: &str) -> Result<bool>;

    /// Registered resources in registration order.
    async fn list_resources(&self) -> Result<Vec<String>>;

    /// Snapshot with the greatest `(observed_at, seq)`.
    async fn most_recent_snapshot(&self, uri: &str) -> Result<Option<Snapshot>>;

    /// Full history, newest first.
    async fn all_snapshots(&self, uri: &str) -> Result<Vec<Snapshot>>;

    /// Append a snapshot, registering its resource if needed.
    ///
    /// Returns the stored snapshot with its assigned `seq`.
    async fn insert_snapshot(&self, snapshot: Snapshot) -> Result<Snapshot>;

    /// Move the most recent snapshot of `uri` from `old` to `new`.
    ///
    /// Fails with [`AppError::NotPersisted`] when the most recent snapshot is
    /// no longer the one observed at `old`.
    async fn update_snapshot_timestamp(
        &self,
        uri: &str,
        old: DateTime<Utc>,
        new: DateTime<Utc>,
    ) -> Result<()>;

    /// Register a subscriber. Fails if already registered.
    async fn add_subscriber(&self, id: &str) -> Result<()>;

    /// Unregister a subscriber and drop their subscriptions.
    async fn remove_subscriber(&self, id: &str) -> Result<()>;

    async fn is_subscriber_registered(&self, id: &str) -> Result<bool>;

    /// Fails if the subscriber is unknown or already subscribed.
    async fn add_subscription(&self, subscriber: &str, uri: &str) -> Result<()>;

    /// Fails if the subscription does not exist.
    async fn remove_subscription(&self, subscriber: &str, uri: &str) -> Result<()>;

    async fn subscribers_of(&self, uri: &str) -> Result<Vec<String>>;

    async fn subscriptions_of(&self, subscriber: &str) -> Result<Vec<String>>;
}

/// Compare-and-swap the timestamp of the most recent snapshot in a history.
pub(crate) fn bump_timestamp(
    history: &mut [Snapshot],
    uri: &str,
    old: DateTime<Utc>,
    new: DateTime<Utc>,
) -> Result<()> {
    let latest = history.iter_mut().max_by_key(|s| s.recency());
    match latest {
        Some(snapshot) if snapshot.observed_at == old => {
            snapshot.observed_at = new;
            Ok(())
        }
        _ => Err(AppError::NotPersisted {
            uri: uri.to_string(),
            observed_at: old,
        }),
    }
}

/// Copy of a history sorted newest first.
pub(crate) fn newest_first(history: &[Snapshot]) -> Vec<Snapshot> {
    let mut sorted = history.to_vec();
    sorted.sort_by(|a, b| b.recency().cmp(&a.recency()));
    sorted
}
