// src/models/mod.rs

//! Domain models for the monitor.

mod config;
mod seed;
mod snapshot;

// Re-export all public types
pub use config::{
    Config, FetcherConfig, LoggingConfig, MonitorConfig, NotifierConfig, StorageConfig,
};
pub use seed::{Seed, SeedSummary, SubscriptionSeed};
pub use snapshot::{Snapshot, most_recent};
