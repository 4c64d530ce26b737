//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── registry.json         # Resources, subscribers, subscriptions, seq counter
//! └── snapshots/
//!     └── {sha256(uri)}.json  # Snapshot history of one resource
//! ```
//!
//! Every file is written atomically (temp file, then rename). Mutations are
//! serialized through one async mutex, which also makes the timestamp update
//! a proper compare-and-swap.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, most_recent};
use crate::storage::{Registry, SnapshotStore, bump_timestamp, newest_first};

const REGISTRY_KEY: &str = "registry.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// File key for a resource history. URIs are hashed to stay filesystem safe.
    fn snapshot_key(uri: &str) -> String {
        let digest = Sha256::digest(uri.as_bytes());
        format!("snapshots/{}.json", hex::encode(digest))
    }

    async fn load_registry(&self) -> Result<Registry> {
        Ok(self.read_json(REGISTRY_KEY).await?.unwrap_or_default())
    }

    async fn save_registry(&self, registry: &Registry) -> Result<()> {
        self.write_json(REGISTRY_KEY, registry).await
    }

    async fn load_history(&self, uri: &str) -> Result<Vec<Snapshot>> {
        Ok(self
            .read_json(&Self::snapshot_key(uri))
            .await?
            .unwrap_or_default())
    }

    async fn save_history(&self, uri: &str, history: &[Snapshot]) -> Result<()> {
        self.write_json(&Self::snapshot_key(uri), history).await
    }

    async fn delete_history(&self, uri: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(&Self::snapshot_key(uri))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Load the registry, apply a fallible change and persist it.
    async fn modify_registry<T>(
        &self,
        change: impl FnOnce(&mut Registry) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.load_registry().await?;
        let out = change(&mut registry)?;
        self.save_registry(&registry).await?;
        Ok(out)
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn add_resource(&self, uri: &str) -> Result<()> {
        let added = self
            .modify_registry(|registry| Ok(registry.add_resource(uri)))
            .await?;
        if added {
            log::info!("Registered resource {}", uri);
        }
        Ok(())
    }

    async fn remove_resource(&self, uri: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.load_registry().await?;
        if registry.remove_resource(uri) {
            self.save_registry(&registry).await?;
            log::info!("Unregistered resource {}", uri);
        }
        self.delete_history(uri).await
    }

    async fn is_resource_registered(&self, uri: &str) -> Result<bool> {
        Ok(self.load_registry().await?.has_resource(uri))
    }

    async fn list_resources(&self) -> Result<Vec<String>> {
        Ok(self.load_registry().await?.resources)
    }

    async fn most_recent_snapshot(&self, uri: &str) -> Result<Option<Snapshot>> {
        let history = self.load_history(uri).await?;
        Ok(most_recent(&history).cloned())
    }

    async fn all_snapshots(&self, uri: &str) -> Result<Vec<Snapshot>> {
        let history = self.load_history(uri).await?;
        Ok(newest_first(&history))
    }

    async fn insert_snapshot(&self, mut snapshot: Snapshot) -> Result<Snapshot> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.load_registry().await?;
        if registry.add_resource(&snapshot.uri) {
            log::info!("Registered resource {} on first snapshot", snapshot.uri);
        }

        // The history may be ahead of the counter if a registry write was lost
        let mut history = self.load_history(&snapshot.uri).await?;
        let floor = history.iter().map(|s| s.seq).max().unwrap_or(0);
        snapshot.seq = registry.next_seq_above(floor);
        history.push(snapshot.clone());

        self.save_registry(&registry).await?;
        self.save_history(&snapshot.uri, &history).await?;
        Ok(snapshot)
    }

    async fn update_snapshot_timestamp(
        &self,
        uri: &str,
        old: DateTime<Utc>,
        new: DateTime<Utc>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut history = self.load_history(uri).await?;
        bump_timestamp(&mut history, uri, old, new)?;
        self.save_history(uri, &history).await
    }

    async fn add_subscriber(&self, id: &str) -> Result<()> {
        self.modify_registry(|registry| registry.add_subscriber(id))
            .await
    }

    async fn remove_subscriber(&self, id: &str) -> Result<()> {
        self.modify_registry(|registry| registry.remove_subscriber(id))
            .await
    }

    async fn is_subscriber_registered(&self, id: &str) -> Result<bool> {
        Ok(self.load_registry().await?.has_subscriber(id))
    }

    async fn add_subscription(&self, subscriber: &str, uri: &str) -> Result<()> {
        self.modify_registry(|registry| registry.add_subscription(subscriber, uri))
            .await
    }

    async fn remove_subscription(&self, subscriber: &str, uri: &str) -> Result<()> {
        self.modify_registry(|registry| registry.remove_subscription(subscriber, uri))
            .await
    }

    async fn subscribers_of(&self, uri: &str) -> Result<Vec<String>> {
        Ok(self.load_registry().await?.subscribers_of(uri))
    }

    async fn subscriptions_of(&self, subscriber: &str) -> Result<Vec<String>> {
        Ok(self.load_registry().await?.subscriptions_of(subscriber))
    }
}
