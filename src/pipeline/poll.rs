// src/pipeline/poll.rs

//! Poll cycle: fetch every registered resource, detect changes, persist, notify.
//!
//! Per resource the steps run strictly in order:
//!
//! ```text
//! fetch (bounded retries) ─┬─ all attempts failed ──────────▶ skipped this cycle
//!                          └─ snapshot ─┬─ no prior ────────▶ insert, no notification
//!                                       └─ compare ─┬─ same ▶ bump timestamp
//!                                                   └─ diff ▶ insert, notify each subscriber
//! ```
//!
//! Resources are independent. With `max_concurrent > 1` several resources are
//! in flight at once, but outcomes are still reported in listing order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, MonitorConfig, Snapshot};
use crate::pipeline::compare::{Verdict, compare};
use crate::services::{Fetcher, HttpFetcher, Notifier, notifier};
use crate::storage::SnapshotStore;
use crate::utils::log::{header, summary};

/// What happened to one resource during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// Every fetch attempt failed
    Skipped { attempts: u32 },
    /// First snapshot stored, nobody notified
    Initialized,
    /// Content unchanged, timestamp bumped
    Unchanged,
    /// New snapshot stored and subscribers notified
    Changed {
        added: Vec<String>,
        notified: usize,
        failed: usize,
    },
    /// A store operation failed
    Failed { error: String },
}

/// Result of one poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Outcome per resource, in listing order
    pub outcomes: Vec<(String, ResourceOutcome)>,
}

impl CycleReport {
    fn count(&self, pred: impl Fn(&ResourceOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Skipped { .. }))
    }

    pub fn initialized(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Initialized))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Unchanged))
    }

    pub fn changed(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Changed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Failed { .. }))
    }

    /// Notifications delivered and failed across all changed resources.
    pub fn notifications(&self) -> (usize, usize) {
        self.outcomes
            .iter()
            .fold((0, 0), |(ok, err), (_, outcome)| match outcome {
                ResourceOutcome::Changed {
                    notified, failed, ..
                } => (ok + notified, err + failed),
                _ => (ok, err),
            })
    }

    pub fn outcome(&self, uri: &str) -> Option<&ResourceOutcome> {
        self.outcomes
            .iter()
            .find(|(u, _)| u == uri)
            .map(|(_, outcome)| outcome)
    }

    fn log_summary(&self) {
        let (sent, undelivered) = self.notifications();
        let elapsed = self.finished_at - self.started_at;
        summary(
            "Poll cycle",
            &[
                ("Resources", self.outcomes.len().to_string()),
                ("Initialized", self.initialized().to_string()),
                ("Unchanged", self.unchanged().to_string()),
                ("Changed", self.changed().to_string()),
                ("Skipped", self.skipped().to_string()),
                ("Failed", self.failed().to_string()),
                ("Notifications sent", sent.to_string()),
                ("Notifications failed", undelivered.to_string()),
                ("Elapsed", format!("{} ms", elapsed.num_milliseconds())),
            ],
        );
    }
}

/// Drives poll cycles over the resources of a store.
pub struct Monitor {
    store: Arc<dyn SnapshotStore>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(
        config: &MonitorConfig,
        store: Arc<dyn SnapshotStore>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            config: config.clone(),
        }
    }

    /// Run one full pass over every registered resource.
    ///
    /// Only a failure to list resources is returned as an error; everything
    /// that goes wrong for a single resource or subscriber is logged and
    /// recorded in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        let resources = self.store.list_resources().await?;
        log::info!("Poll cycle starting: {} resources", resources.len());

        let concurrency = self.config.max_concurrent.max(1);
        let outcomes: Vec<(String, ResourceOutcome)> = stream::iter(resources)
            .map(|uri| async move {
                let outcome = self.process(&uri).await;
                (uri, outcome)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        report.log_summary();
        Ok(report)
    }

    /// Process a single resource end to end.
    pub async fn process(&self, uri: &str) -> ResourceOutcome {
        let Some(mut current) = self.fetch_with_retry(uri).await else {
            return ResourceOutcome::Skipped {
                attempts: self.max_attempts(),
            };
        };
        current.uri = uri.to_string();

        let result = match self.store.most_recent_snapshot(uri).await {
            Ok(previous) => self.settle(uri, previous, current).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            log::error!("Could not update {}: {}", uri, e);
            ResourceOutcome::Failed {
                error: e.to_string(),
            }
        })
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_retrieval_attempts.max(1)
    }

    /// Fetch with a bounded number of attempts; `None` once they are exhausted.
    ///
    /// Transient and permanent failures count alike.
    async fn fetch_with_retry(&self, uri: &str) -> Option<Snapshot> {
        let max = self.max_attempts();
        let delay = Duration::from_millis(self.config.retry_delay_ms);

        for attempt in 1..=max {
            match self.fetcher.fetch(uri).await {
                Ok(snapshot) => return Some(snapshot),
                Err(e) => {
                    log::warn!(
                        "I/O issue while retrieving {} at attempt {}/{}: {}",
                        uri,
                        attempt,
                        max,
                        e
                    );
                    if attempt < max && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        log::warn!(
            "Could not retrieve {} because of repeated I/O errors, skipping this cycle",
            uri
        );
        None
    }

    /// Persist the fresh snapshot according to the comparison with `previous`.
    async fn settle(
        &self,
        uri: &str,
        previous: Option<Snapshot>,
        current: Snapshot,
    ) -> Result<ResourceOutcome> {
        let Some(previous) = previous else {
            let stored = self.store.insert_snapshot(current).await?;
            log::info!(
                "First snapshot of {} stored ({} items)",
                uri,
                stored.item_count()
            );
            return Ok(ResourceOutcome::Initialized);
        };

        match compare(&previous, &current) {
            Verdict::Unchanged => {
                self.store
                    .update_snapshot_timestamp(uri, previous.observed_at, current.observed_at)
                    .await?;
                log::info!("There is no change on {}", uri);
                Ok(ResourceOutcome::Unchanged)
            }
            Verdict::Changed { added } => {
                self.store.insert_snapshot(current).await?;
                log::info!("{} changed, {} new item(s)", uri, added.len());

                let (notified, failed) = self.fan_out(uri, &added).await?;
                Ok(ResourceOutcome::Changed {
                    added,
                    notified,
                    failed,
                })
            }
        }
    }

    /// Notify every subscriber independently; returns (delivered, failed).
    async fn fan_out(&self, uri: &str, added: &[String]) -> Result<(usize, usize)> {
        let subscribers = self.store.subscribers_of(uri).await?;
        let mut delivered = 0;
        let mut failed = 0;

        for subscriber in &subscribers {
            match self.notifier.notify(subscriber, uri, added).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    log::warn!(
                        "Could not notify {} about changes to {}: {}",
                        subscriber,
                        uri,
                        e
                    );
                }
            }
        }

        Ok((delivered, failed))
    }
}

/// Run one poll cycle with the HTTP fetcher and the configured notifier.
pub async fn run_poll(config: &Config, store: Arc<dyn SnapshotStore>) -> Result<CycleReport> {
    header("Web monitor poll");

    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let notifier: Arc<dyn Notifier> =
        Arc::from(notifier::from_config(&config.notifier, config.fetcher.timeout_secs)?);

    Monitor::new(&config.monitor, store, fetcher, notifier)
        .run_cycle()
        .await
}
