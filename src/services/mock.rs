//! Test doubles for the fetcher and notifier.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::services::{Fetcher, Notifier};

/// One scripted fetch result.
#[derive(Debug, Clone)]
pub enum Reply {
    Page {
        status: u16,
        content_type: Option<String>,
        content: Option<Vec<String>>,
    },
    Fail,
}

impl Reply {
    pub fn html(items: &[&str]) -> Self {
        Self::Page {
            status: 200,
            content_type: Some("text/html".into()),
            content: Some(items.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn status(status: u16, items: &[&str]) -> Self {
        Self::Page {
            status,
            content_type: Some("text/html".into()),
            content: Some(items.iter().map(|s| s.to_string()).collect()),
        }
    }
}

/// Fetcher replaying queued replies per URI; the last reply repeats.
///
/// Every successful fetch is stamped a little over one second after the
/// previous one, with a sub-second part so stores must keep full precision.
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
    clock: Mutex<DateTime<Utc>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            clock: Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        }
    }

    pub fn push(&self, uri: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(uri.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self, uri: &str) -> usize {
        self.calls.lock().unwrap().get(uri).copied().unwrap_or(0)
    }

    fn tick(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::seconds(1) + Duration::nanoseconds(123_456_789);
        *clock
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, uri: &str) -> Result<Snapshot> {
        *self.calls.lock().unwrap().entry(uri.to_string()).or_default() += 1;

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies.entry(uri.to_string()).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match reply {
            Some(Reply::Page {
                status,
                content_type,
                content,
            }) => Ok(Snapshot::new(uri, content, content_type, status, self.tick())),
            Some(Reply::Fail) | None => Err(AppError::fetch(uri, "connection refused")),
        }
    }
}

/// Notifier recording every delivery; selected recipients always fail.
#[derive(Default)]
pub struct RecordingNotifier {
    failing: HashSet<String>,
    delivered: Mutex<Vec<(String, String, Vec<String>)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<(String, String, Vec<String>)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, uri: &str, added: &[String]) -> Result<()> {
        if self.failing.contains(recipient) {
            return Err(AppError::notification(recipient, "transport rejected message"));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((recipient.to_string(), uri.to_string(), added.to_vec()));
        Ok(())
    }
}
