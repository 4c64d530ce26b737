//! Snapshot data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One retrieval of a monitored resource.
///
/// `content` keeps the items in document order. Comparison treats it as an
/// unordered multiset (see [`crate::pipeline::compare`]), so the order is only
/// informational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// URI of the resource this snapshot belongs to
    pub uri: String,

    /// Extracted content items, `None` when the payload had no extractable markup
    pub content: Option<Vec<String>>,

    /// MIME type reported by the server
    pub content_type: Option<String>,

    /// Transport status code
    pub status_code: u16,

    /// Fetch completion time
    pub observed_at: DateTime<Utc>,

    /// Insertion sequence assigned by the store, breaks `observed_at` ties
    #[serde(default)]
    pub seq: u64,
}

impl Snapshot {
    /// Create a snapshot that has not been persisted yet.
    pub fn new(
        uri: impl Into<String>,
        content: Option<Vec<String>>,
        content_type: Option<String>,
        status_code: u16,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uri: uri.into(),
            content,
            content_type,
            status_code,
            observed_at,
            seq: 0,
        }
    }

    /// Number of content items (zero when content is absent).
    pub fn item_count(&self) -> usize {
        self.content.as_ref().map_or(0, Vec::len)
    }

    /// Ordering key for "most recent" selection.
    pub fn recency(&self) -> (DateTime<Utc>, u64) {
        (self.observed_at, self.seq)
    }
}

/// Pick the most recent snapshot from a history.
pub fn most_recent(history: &[Snapshot]) -> Option<&Snapshot> {
    history.iter().max_by_key(|s| s.recency())
}
