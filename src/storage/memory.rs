//! In-memory storage implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Snapshot, most_recent};
use crate::storage::{Registry, SnapshotStore, bump_timestamp, newest_first};

#[derive(Debug, Default)]
struct State {
    registry: Registry,
    snapshots: HashMap<String, Vec<Snapshot>>,
}

/// Mutex-guarded store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn add_resource(&self, uri: &str) -> Result<()> {
        self.state.lock().await.registry.add_resource(uri);
        Ok(())
    }

    async fn remove_resource(&self, uri: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.registry.remove_resource(uri);
        state.snapshots.remove(uri);
        Ok(())
    }

    async fn is_resource_registered(&self, uri: &str) -> Result<bool> {
        Ok(self.state.lock().await.registry.has_resource(uri))
    }

    async fn list_resources(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().await.registry.resources.clone())
    }

    async fn most_recent_snapshot(&self, uri: &str) -> Result<Option<Snapshot>> {
        let state = self.state.lock().await;
        Ok(state
            .snapshots
            .get(uri)
            .and_then(|history| most_recent(history))
            .cloned())
    }

    async fn all_snapshots(&self, uri: &str) -> Result<Vec<Snapshot>> {
        let state = self.state.lock().await;
        Ok(state
            .snapshots
            .get(uri)
            .map(|history| newest_first(history))
            .unwrap_or_default())
    }

    async fn insert_snapshot(&self, mut snapshot: Snapshot) -> Result<Snapshot> {
        let mut state = self.state.lock().await;
        state.registry.add_resource(&snapshot.uri);
        snapshot.seq = state.registry.next_seq();
        state
            .snapshots
            .entry(snapshot.uri.clone())
            .or_default()
            .push(snapshot.clone());
        Ok(snapshot)
    }

    async fn update_snapshot_timestamp(
        &self,
        uri: &str,
        old: DateTime<Utc>,
        new: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut missing = Vec::new();
        let history = state.snapshots.get_mut(uri).unwrap_or(&mut missing);
        bump_timestamp(history, uri, old, new)
    }

    async fn add_subscriber(&self, id: &str) -> Result<()> {
        self.state.lock().await.registry.add_subscriber(id)
    }

    async fn remove_subscriber(&self, id: &str) -> Result<()> {
        self.state.lock().await.registry.remove_subscriber(id)
    }

    async fn is_subscriber_registered(&self, id: &str) -> Result<bool> {
        Ok(self.state.lock().await.registry.has_subscriber(id))
    }

    async fn add_subscription(&self, subscriber: &str, uri: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .registry
            .add_subscription(subscriber, uri)
    }

    async fn remove_subscription(&self, subscriber: &str, uri: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .registry
            .remove_subscription(subscriber, uri)
    }

    async fn subscribers_of(&self, uri: &str) -> Result<Vec<String>> {
        Ok(self.state.lock().await.registry.subscribers_of(uri))
    }

    async fn subscriptions_of(&self, subscriber: &str) -> Result<Vec<String>> {
        Ok(self.state.lock().await.registry.subscriptions_of(subscriber))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::TimeZone;

    const URI: &str = "http://example.com/deals";

    fn snapshot(secs: i64) -> Snapshot {
        Snapshot::new(
            URI,
            Some(vec!["A".into()]),
            Some("text/html".into()),
            200,
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_self_registers_resource() {
        let store = MemoryStore::new();
        assert!(!store.is_resource_registered(URI).await.unwrap());

        let stored = store.insert_snapshot(snapshot(10)).await.unwrap();
        assert_eq!(stored.seq, 1);
        assert!(store.is_resource_registered(URI).await.unwrap());
        assert_eq!(store.list_resources().await.unwrap(), vec![URI]);
    }

    #[tokio::test]
    async fn test_most_recent_and_history() {
        let store = MemoryStore::new();
        store.insert_snapshot(snapshot(10)).await.unwrap();
        store.insert_snapshot(snapshot(30)).await.unwrap();
        store.insert_snapshot(snapshot(20)).await.unwrap();

        let latest = store.most_recent_snapshot(URI).await.unwrap().unwrap();
        assert_eq!(latest.observed_at, Utc.timestamp_opt(30, 0).unwrap());

        let history = store.all_snapshots(URI).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].observed_at, Utc.timestamp_opt(10, 0).unwrap());
    }

    #[tokio::test]
    async fn test_timestamp_collision_uses_latest_insert() {
        let store = MemoryStore::new();
        store.insert_snapshot(snapshot(10)).await.unwrap();
        let mut second = snapshot(10);
        second.content = Some(vec!["B".into()]);
        store.insert_snapshot(second).await.unwrap();

        let latest = store.most_recent_snapshot(URI).await.unwrap().unwrap();
        assert_eq!(latest.content, Some(vec!["B".to_string()]));
    }

    #[tokio::test]
    async fn test_update_timestamp() {
        let store = MemoryStore::new();
        store.insert_snapshot(snapshot(10)).await.unwrap();

        let old = Utc.timestamp_opt(10, 0).unwrap();
        let new = Utc.timestamp_opt(50, 0).unwrap();
        store.update_snapshot_timestamp(URI, old, new).await.unwrap();

        assert_eq!(store.all_snapshots(URI).await.unwrap().len(), 1);
        let latest = store.most_recent_snapshot(URI).await.unwrap().unwrap();
        assert_eq!(latest.observed_at, new);

        // Second swap from the stale value must fail
        let result = store.update_snapshot_timestamp(URI, old, new).await;
        assert!(matches!(result, Err(AppError::NotPersisted { .. })));
    }

    #[tokio::test]
    async fn test_remove_resource_drops_snapshots() {
        let store = MemoryStore::new();
        store.add_subscriber("a@example.com").await.unwrap();
        store.add_subscription("a@example.com", URI).await.unwrap();
        store.insert_snapshot(snapshot(10)).await.unwrap();

        store.remove_resource(URI).await.unwrap();
        assert!(store.most_recent_snapshot(URI).await.unwrap().is_none());
        assert!(store.subscribers_of(URI).await.unwrap().is_empty());
        assert!(!store.is_resource_registered(URI).await.unwrap());
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let store = MemoryStore::new();
        assert!(store.add_subscription("a@example.com", URI).await.is_err());

        store.add_subscriber("a@example.com").await.unwrap();
        assert!(store.is_subscriber_registered("a@example.com").await.unwrap());
        store.add_subscription("a@example.com", URI).await.unwrap();
        assert_eq!(
            store.subscriptions_of("a@example.com").await.unwrap(),
            vec![URI]
        );

        store.remove_subscription("a@example.com", URI).await.unwrap();
        assert!(store.subscribers_of(URI).await.unwrap().is_empty());
        assert!(store.remove_subscription("a@example.com", URI).await.is_err());
    }
}
