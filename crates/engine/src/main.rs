use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kol_engine::config;
use kol_engine::core::aggregator::Aggregator;
use kol_engine::core::alerts::AlertMatcher;
use kol_engine::core::scheduler::AlertScheduler;
use kol_engine::ingest::{ActivityFeed, SnapshotFeed};
use kol_engine::logging;
use kol_engine::store::SqliteLeaderboard;
use kol_engine::types::AlertEvent;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    // Determine config directory — default to `./config`.
    let config_dir = std::env::var("ENGINE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    // Load and validate configuration.
    let config = config::load_config(&config_dir)?;

    // Initialize tracing — hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.app.logging)?;

    info!(
        snapshot = %config.aggregator.snapshot_path,
        db = %config.aggregator.db_path,
        alerts_enabled = config.alerts.enabled,
        "KOL analytics engine starting"
    );

    // -----------------------------------------------------------------------
    // Component construction (dependency injection order)
    // -----------------------------------------------------------------------

    // 1. Leaderboard store (async — creates SQLite DB + schema)
    if let Some(parent) = PathBuf::from(&config.aggregator.db_path).parent() {
        std::fs::create_dir_all(parent).context("failed to create data directory")?;
    }
    let store = Arc::new(
        SqliteLeaderboard::new(&config.aggregator.db_path)
            .await
            .context("failed to initialize leaderboard store")?,
    );

    // 2. Activity feed over the externally-written snapshot
    let feed: Arc<dyn ActivityFeed> =
        Arc::new(SnapshotFeed::new(config.aggregator.snapshot_path.clone()));

    let shutdown = CancellationToken::new();

    // 3. Aggregator actor
    let aggregator = Aggregator::new(
        store.clone(),
        feed.clone(),
        Duration::from_secs(config.aggregator.refresh_interval_seconds),
        shutdown.clone(),
    );

    // Initial pass so the leaderboard is populated before the first tick.
    match feed.latest().await {
        Ok(records) => {
            if let Err(e) = aggregator.run_pass(&records).await {
                error!(error = %e, "initial aggregation pass failed");
            }
        }
        Err(e) => warn!(error = %e, "no activity snapshot yet — leaderboard starts empty"),
    }

    // -----------------------------------------------------------------------
    // Launch concurrent tasks
    // -----------------------------------------------------------------------

    info!("spawning runtime tasks");

    let aggregator_handle = tokio::spawn(async move {
        if let Err(e) = aggregator.run().await {
            error!(error = %e, "aggregator exited with error");
        }
    });

    let (scheduler_handle, sink_handle) = if config.alerts.enabled {
        let (event_tx, event_rx) = mpsc::channel::<AlertEvent>(config.alerts.channel_capacity);

        let scheduler = AlertScheduler::new(
            Arc::new(AlertMatcher::new(config.alerts.clone())),
            feed.clone(),
            config.alerts.watches.clone(),
            Duration::from_secs(config.alerts.interval_seconds),
            event_tx,
            shutdown.clone(),
        );

        let scheduler_handle = tokio::spawn(async move {
            if let Err(e) = scheduler.run().await {
                error!(error = %e, "alert scheduler exited with error");
            }
        });

        (Some(scheduler_handle), Some(tokio::spawn(log_alerts(event_rx))))
    } else {
        info!("alerts disabled — scheduler not started");
        (None, None)
    };

    info!("all tasks running — press Ctrl+C to shutdown");

    // -----------------------------------------------------------------------
    // Wait for shutdown signal
    // -----------------------------------------------------------------------

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    info!("shutdown signal received, stopping gracefully...");
    shutdown.cancel();

    if let Err(e) = aggregator_handle.await {
        error!(error = %e, "aggregator task panicked");
    }
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "alert scheduler task panicked");
        }
    }
    if let Some(handle) = sink_handle {
        // The scheduler owns the only sender; joining it closed the channel.
        if let Err(e) = handle.await {
            error!(error = %e, "alert sink task panicked");
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Drain emitted alerts into the structured log. A real deployment would
/// fan these out to notification channels instead.
async fn log_alerts(mut event_rx: mpsc::Receiver<AlertEvent>) {
    while let Some(event) = event_rx.recv().await {
        info!(
            user = %event.user_id,
            token = %event.token_symbol,
            kol = %event.kol_name,
            pnl = event.pnl_percent,
            kols = event.kols_count,
            priority = event.priority.as_str(),
            "{}",
            event.title
        );
    }
}
