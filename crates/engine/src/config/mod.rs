pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Load and merge all config JSON files into a single [`EngineConfig`],
/// then apply environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   aggregator.json
///   alerts.json
/// ```
///
/// # Environment variable overrides
///
/// | Env Var                       | Config Field                          |
/// |-------------------------------|---------------------------------------|
/// | `ENGINE_DB_PATH`              | `aggregator.db_path`                  |
/// | `ENGINE_SNAPSHOT_PATH`        | `aggregator.snapshot_path`            |
/// | `ENGINE_REFRESH_INTERVAL`     | `aggregator.refresh_interval_seconds` |
/// | `ALERTS_ENABLED`              | `alerts.enabled`                      |
/// | `ALERTS_INTERVAL`             | `alerts.interval_seconds`             |
pub fn load_config(config_dir: &Path) -> Result<EngineConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig =
        serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let aggregator: AggregatorConfig =
        serde_json::from_str(&read("aggregator.json")?).context("parsing aggregator.json")?;

    let alerts: AlertsConfig =
        serde_json::from_str(&read("alerts.json")?).context("parsing alerts.json")?;

    let mut config = EngineConfig {
        app,
        aggregator,
        alerts,
    };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides to the loaded config.
///
/// Only non-empty env vars take effect. Parse failures are skipped (the JSON
/// default remains).
fn apply_env_overrides(config: &mut EngineConfig) {
    if let Some(val) = env_string("ENGINE_DB_PATH") {
        info!("env override: ENGINE_DB_PATH");
        config.aggregator.db_path = val;
    }

    if let Some(val) = env_string("ENGINE_SNAPSHOT_PATH") {
        info!("env override: ENGINE_SNAPSHOT_PATH");
        config.aggregator.snapshot_path = val;
    }

    if let Some(val) = env_parse::<u64>("ENGINE_REFRESH_INTERVAL") {
        info!(val, "env override: ENGINE_REFRESH_INTERVAL");
        config.aggregator.refresh_interval_seconds = val;
    }

    if let Some(val) = env_bool("ALERTS_ENABLED") {
        info!(enabled = val, "env override: ALERTS_ENABLED");
        config.alerts.enabled = val;
    }

    if let Some(val) = env_parse::<u64>("ALERTS_INTERVAL") {
        info!(val, "env override: ALERTS_INTERVAL");
        config.alerts.interval_seconds = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var as a bool (`true`, `1`, `yes` → true).
fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // -----------------------------------------------------------------------
    // Helper: write a minimal set of config JSON files to a temp dir.
    // -----------------------------------------------------------------------

    fn write_test_configs(dir: &Path) {
        std::fs::write(
            dir.join("app.json"),
            r#"{ "logging": { "log_dir": "logs" } }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("aggregator.json"),
            r#"{
                "snapshot_path": "data/activity.json",
                "db_path": "data/leaderboard.db",
                "refresh_interval_seconds": 300
            }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("alerts.json"),
            r#"{
                "enabled": true,
                "interval_seconds": 30,
                "recency_window_seconds": 300,
                "max_tokens_per_scan": 50,
                "channel_capacity": 64,
                "watches": [
                    {
                        "user_id": "u1",
                        "kol_names": ["alpha"],
                        "min_kols_count": 2,
                        "min_pnl_percent": 100.0,
                        "position_status": "holding"
                    }
                ]
            }"#,
        )
        .unwrap();
    }

    /// Remove all engine env vars so tests don't interfere with each other.
    fn clean_engine_env() {
        for key in [
            "ENGINE_DB_PATH",
            "ENGINE_SNAPSHOT_PATH",
            "ENGINE_REFRESH_INTERVAL",
            "ALERTS_ENABLED",
            "ALERTS_INTERVAL",
        ] {
            std::env::remove_var(key);
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    #[serial]
    fn test_load_valid_configs() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        let config = load_config(tmp.path()).expect("test config should load");
        assert_eq!(config.aggregator.refresh_interval_seconds, 300);
        assert!(config.alerts.enabled);
        assert_eq!(config.alerts.watches.len(), 1);
        assert_eq!(config.alerts.watches[0].kol_names, vec!["alpha"]);
        assert!(config.alerts.watches[0].active); // serde default
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_missing_config_file_errors() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(
            err.to_string().contains("failed to read config file"),
            "expected file-not-found error, got: {err}"
        );
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_env_override_db_path() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("ENGINE_DB_PATH", "/tmp/custom.db");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.aggregator.db_path, "/tmp/custom.db");
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_env_override_alerts_disabled() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("ALERTS_ENABLED", "false");
        let config = load_config(tmp.path()).unwrap();
        assert!(!config.alerts.enabled);
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_string_ignored() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("ENGINE_REFRESH_INTERVAL", "");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.aggregator.refresh_interval_seconds, 300);
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_parse_ignored() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("ENGINE_REFRESH_INTERVAL", "not_a_number");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.aggregator.refresh_interval_seconds, 300);
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_validation_accumulates_all_errors() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        // Two independent violations — both must be reported at once.
        std::fs::write(
            tmp.path().join("aggregator.json"),
            r#"{
                "snapshot_path": "",
                "db_path": "data/leaderboard.db",
                "refresh_interval_seconds": 0
            }"#,
        )
        .unwrap();

        let err = load_config(tmp.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2 errors"), "got: {msg}");
        assert!(msg.contains("snapshot_path"));
        assert!(msg.contains("refresh_interval_seconds"));
        clean_engine_env();
    }

    #[test]
    #[serial]
    fn test_watch_with_empty_kol_set_rejected() {
        clean_engine_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::fs::write(
            tmp.path().join("alerts.json"),
            r#"{
                "enabled": true,
                "interval_seconds": 30,
                "recency_window_seconds": 300,
                "max_tokens_per_scan": 50,
                "channel_capacity": 64,
                "watches": [{ "user_id": "u1", "kol_names": [] }]
            }"#,
        )
        .unwrap();

        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("kol_names is empty"));
        clean_engine_env();
    }
}
