use serde::Deserialize;

use crate::types::WatchConfig;

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub app: AppConfig,
    pub aggregator: AggregatorConfig,
    pub alerts: AlertsConfig,
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
}

// ---------------------------------------------------------------------------
// aggregator.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// JSON snapshot of activity records written by the external ingester.
    pub snapshot_path: String,
    /// SQLite file backing the wallet leaderboard.
    pub db_path: String,
    /// Seconds between aggregation passes.
    pub refresh_interval_seconds: u64,
}

// ---------------------------------------------------------------------------
// alerts.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Seconds between alert scans.
    pub interval_seconds: u64,
    /// Only buys newer than this are alertable; also the dedup horizon.
    pub recency_window_seconds: u64,
    /// Newest-first cap on tokens considered per scan.
    pub max_tokens_per_scan: usize,
    /// Bound of the emitted-event channel.
    pub channel_capacity: usize,
    /// Per-user watch thresholds.
    #[serde(default)]
    pub watches: Vec<WatchConfig>,
}
