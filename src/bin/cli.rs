//! Web Monitor CLI
//!
//! Manages registrations and runs poll cycles against a local snapshot store.
//! Scheduling is left to the caller (cron, systemd timer, ...): each `poll`
//! invocation runs exactly one cycle.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use webmonitor::{
    error::{AppError, Result},
    models::{Config, Seed},
    pipeline,
    services::HttpFetcher,
    storage::{LocalStorage, SnapshotStore},
    utils::{log::level_filter, url::normalize},
};

/// webmonitor - Web page change notifier
#[derive(Parser, Debug)]
#[command(
    name = "webmonitor",
    version,
    about = "Polls web pages and notifies subscribers about new content"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Storage directory (overrides storage.root_dir)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one poll cycle over all registered resources
    Poll,

    /// Register subscribers, resources and subscriptions from a seed file
    Seed {
        /// Path to the seed TOML file
        file: PathBuf,
    },

    /// Register a resource to monitor
    AddResource { uri: String },

    /// Unregister a resource with its snapshots and subscriptions
    RemoveResource { uri: String },

    /// Register a subscriber
    AddSubscriber { id: String },

    /// Unregister a subscriber and their subscriptions
    RemoveSubscriber { id: String },

    /// Subscribe a registered subscriber to a resource
    Subscribe { subscriber: String, uri: String },

    /// Remove a subscription
    Unsubscribe { subscriber: String, uri: String },

    /// List resources with their subscribers and latest snapshot
    List,

    /// Show the snapshot history of a resource
    History { uri: String },

    /// Fetch a resource once and print the extracted items without storing them
    Probe { uri: String },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        log::LevelFilter::Debug
    } else {
        level_filter(level)
    };
    env_logger::Builder::from_default_env()
        .filter_level(filter)
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging depends on the config, so a load failure is reported afterwards
    let (config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(cli.verbose, &config.logging.level);
    if let Some(e) = load_error {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
    }

    let storage_dir = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.root_dir));
    log::debug!("Using storage directory {}", storage_dir.display());

    let store = Arc::new(LocalStorage::new(&storage_dir));

    match cli.command {
        Command::Poll => {
            config.validate()?;
            let report = pipeline::run_poll(&config, store).await?;
            if report.failed() > 0 {
                log::warn!("{} resource(s) could not be updated", report.failed());
            }
        }

        Command::Seed { file } => {
            let seed = Seed::load(&file)?;
            seed.validate()?;
            let summary = seed.apply(store.as_ref()).await?;
            log::info!(
                "Seeded {} subscriber(s), {} resource(s), {} subscription(s); {} skipped",
                summary.subscribers_added,
                summary.resources_added,
                summary.subscriptions_added,
                summary.skipped
            );
        }

        Command::AddResource { uri } => {
            let uri = normalize(&uri)?;
            store.add_resource(&uri).await?;
            log::info!("Monitoring {}", uri);
        }

        Command::RemoveResource { uri } => {
            let uri = normalize(&uri)?;
            if !store.is_resource_registered(&uri).await? {
                return Err(AppError::registration(format!(
                    "Resource {} is not registered",
                    uri
                )));
            }
            store.remove_resource(&uri).await?;
            log::info!("Stopped monitoring {}", uri);
        }

        Command::AddSubscriber { id } => {
            store.add_subscriber(&id).await?;
            log::info!("Registered subscriber {}", id);
        }

        Command::RemoveSubscriber { id } => {
            store.remove_subscriber(&id).await?;
            log::info!("Removed subscriber {}", id);
        }

        Command::Subscribe { subscriber, uri } => {
            let uri = normalize(&uri)?;
            store.add_subscription(&subscriber, &uri).await?;
            log::info!("{} subscribed to {}", subscriber, uri);
        }

        Command::Unsubscribe { subscriber, uri } => {
            let uri = normalize(&uri)?;
            store.remove_subscription(&subscriber, &uri).await?;
            log::info!("{} unsubscribed from {}", subscriber, uri);
        }

        Command::List => {
            let resources = store.list_resources().await?;
            if resources.is_empty() {
                log::info!("No resources registered yet.");
            }
            for uri in resources {
                let subscribers = store.subscribers_of(&uri).await?;
                let latest = store.most_recent_snapshot(&uri).await?;
                log::info!("{}", uri);
                log::info!("    subscribers: {}", subscribers.join(", "));
                match latest {
                    Some(s) => log::info!(
                        "    last seen: {} (status {}, {} items)",
                        s.observed_at,
                        s.status_code,
                        s.item_count()
                    ),
                    None => log::info!("    last seen: never"),
                }
            }
        }

        Command::History { uri } => {
            let uri = normalize(&uri)?;
            let history = store.all_snapshots(&uri).await?;
            log::info!("{} snapshot(s) of {}", history.len(), uri);
            for s in history {
                log::info!(
                    "#{} {} status={} type={} items={}",
                    s.seq,
                    s.observed_at,
                    s.status_code,
                    s.content_type.as_deref().unwrap_or("-"),
                    s.item_count()
                );
            }
        }

        Command::Probe { uri } => {
            use webmonitor::services::Fetcher;

            let uri = normalize(&uri)?;
            let fetcher = HttpFetcher::new(&config.fetcher)?;
            let snapshot = fetcher.fetch(&uri).await?;
            log::info!(
                "status={} type={}",
                snapshot.status_code,
                snapshot.content_type.as_deref().unwrap_or("-")
            );
            match &snapshot.content {
                Some(items) => {
                    for item in items {
                        log::info!("    {}", item);
                    }
                }
                None => log::info!("    (no extractable content)"),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            log::debug!("Effective configuration:\n{}", config.to_toml()?);
        }
    }

    Ok(())
}
