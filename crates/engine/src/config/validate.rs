use anyhow::{bail, Result};

use super::types::EngineConfig;

/// Validate invariants across the merged config that serde alone cannot
/// enforce. Called automatically by [`super::load_config`].
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_app_config(config, &mut errors);
    validate_aggregator_config(config, &mut errors);
    validate_alerts_config(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

fn validate_app_config(config: &EngineConfig, errors: &mut Vec<String>) {
    if config.app.logging.log_dir.is_empty() {
        errors.push("app.logging: log_dir is empty".into());
    }
}

fn validate_aggregator_config(config: &EngineConfig, errors: &mut Vec<String>) {
    let agg = &config.aggregator;

    if agg.snapshot_path.is_empty() {
        errors.push("aggregator: snapshot_path is empty".into());
    }
    if agg.db_path.is_empty() {
        errors.push("aggregator: db_path is empty".into());
    }
    if agg.refresh_interval_seconds == 0 {
        errors.push("aggregator: refresh_interval_seconds must be positive".into());
    }
}

fn validate_alerts_config(config: &EngineConfig, errors: &mut Vec<String>) {
    let alerts = &config.alerts;

    if alerts.interval_seconds == 0 {
        errors.push("alerts: interval_seconds must be positive".into());
    }
    if alerts.recency_window_seconds == 0 {
        errors.push("alerts: recency_window_seconds must be positive".into());
    }
    if alerts.max_tokens_per_scan == 0 {
        errors.push("alerts: max_tokens_per_scan must be positive".into());
    }
    if alerts.channel_capacity == 0 {
        errors.push("alerts: channel_capacity must be positive".into());
    }

    for (i, watch) in alerts.watches.iter().enumerate() {
        if watch.user_id.is_empty() {
            errors.push(format!("alerts.watches[{i}]: user_id is empty"));
        }
        if watch.kol_names.is_empty() {
            errors.push(format!("alerts.watches[{i}]: kol_names is empty"));
        }
        if watch.min_pnl_percent.is_some_and(|p| !p.is_finite()) {
            errors.push(format!("alerts.watches[{i}]: min_pnl_percent is not finite"));
        }
    }
}
