//! Alert matching: recent KOL-buy activity scanned against per-user watch
//! thresholds, with (user, token, wallet) dedup inside the recency window.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::config::AlertsConfig;
use crate::types::{AlertEvent, AlertPriority, KolBuyer, TokenActivity, WatchConfig};

/// Classify an alert's urgency from the KOL's realized P&L and how many KOLs
/// are in the token.
pub fn determine_priority(pnl_percent: f64, kols_count: u32) -> AlertPriority {
    if pnl_percent > 1000.0 || kols_count > 10 {
        AlertPriority::Urgent
    } else if pnl_percent > 500.0 || kols_count > 5 {
        AlertPriority::High
    } else if pnl_percent > 100.0 || kols_count > 2 {
        AlertPriority::Medium
    } else {
        AlertPriority::Low
    }
}

/// Dedup key: one alert per (user, token, wallet) per recency window.
type DedupKey = (String, String, String);

/// Threshold matcher over the activity stream.
///
/// Stateless per scan except for the dedup table, which is interior-mutexed
/// so the scheduler and manual triggers can share one matcher.
pub struct AlertMatcher {
    config: AlertsConfig,
    /// Last emission time per (user, token, wallet).
    seen: Mutex<HashMap<DedupKey, i64>>,
}

impl AlertMatcher {
    pub fn new(config: AlertsConfig) -> Self {
        Self {
            config,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Scan a batch of activity records for every watch config.
    ///
    /// Emits zero or more events for buyer sub-records whose first buy falls
    /// inside the recency window ending at `now` and which pass every
    /// configured threshold. Never re-emits for the same (user, token,
    /// wallet) tuple within the window.
    pub fn check_alerts(
        &self,
        watches: &[WatchConfig],
        records: &[TokenActivity],
        now: i64,
    ) -> Vec<AlertEvent> {
        let cutoff = now - self.config.recency_window_seconds as i64;
        self.prune_seen(cutoff);

        let mut events = Vec::new();
        for watch in watches {
            if !watch.active || watch.kol_names.is_empty() {
                continue;
            }
            self.check_watch(watch, records, now, cutoff, &mut events);
        }

        debug!(watches = watches.len(), events = events.len(), "alert scan complete");
        events
    }

    fn check_watch(
        &self,
        watch: &WatchConfig,
        records: &[TokenActivity],
        now: i64,
        cutoff: i64,
        events: &mut Vec<AlertEvent>,
    ) {
        // Recent tokens first, bounded per scan.
        let mut recent: Vec<&TokenActivity> = records
            .iter()
            .filter(|t| t.last_kol_buy >= cutoff)
            .collect();
        recent.sort_by_key(|t| std::cmp::Reverse(t.last_kol_buy));
        recent.truncate(self.config.max_tokens_per_scan);

        for token in recent {
            for buyer in &token.kol_buyers {
                if !watch.kol_names.iter().any(|n| n == &buyer.name) {
                    continue;
                }
                if buyer.first_buy_at < cutoff {
                    continue; // stale buy, outside the recency window
                }
                if !self.passes_thresholds(watch, token, buyer) {
                    continue;
                }

                let key = (
                    watch.user_id.clone(),
                    token.token_address.clone(),
                    buyer.wallet_address.clone(),
                );
                {
                    let mut seen = self.seen.lock().expect("dedup lock poisoned");
                    if seen.get(&key).is_some_and(|&last| last >= cutoff) {
                        continue;
                    }
                    seen.insert(key, now);
                }

                events.push(build_event(watch, token, buyer, now));
            }
        }
    }

    fn passes_thresholds(
        &self,
        watch: &WatchConfig,
        token: &TokenActivity,
        buyer: &KolBuyer,
    ) -> bool {
        if let Some(min_kols) = watch.min_kols_count {
            if token.kols_count < min_kols {
                return false;
            }
        }
        if let Some(min_pnl) = watch.min_pnl_percent {
            if buyer.realized_pnl_percent < min_pnl {
                return false;
            }
        }
        if let Some(status) = watch.position_status {
            if buyer.position_status != status {
                return false;
            }
        }
        true
    }

    /// Drop dedup entries older than the window so the table stays bounded.
    fn prune_seen(&self, cutoff: i64) {
        let mut seen = self.seen.lock().expect("dedup lock poisoned");
        seen.retain(|_, &mut last| last >= cutoff);
    }
}

fn build_event(
    watch: &WatchConfig,
    token: &TokenActivity,
    buyer: &KolBuyer,
    now: i64,
) -> AlertEvent {
    let priority = determine_priority(buyer.realized_pnl_percent, token.kols_count);

    AlertEvent {
        user_id: watch.user_id.clone(),
        token_address: token.token_address.clone(),
        token_name: token.name.clone(),
        token_symbol: token.symbol.clone(),
        kol_name: buyer.name.clone(),
        wallet_address: buyer.wallet_address.clone(),
        buy_price: buyer.avg_buy_price,
        pnl_percent: buyer.realized_pnl_percent,
        kols_count: token.kols_count,
        timestamp: now,
        priority,
        title: format!("{} bought {}", buyer.name, token.symbol),
        message: format!(
            "{} just bought {} at {:.8}. {} KOLs active.",
            buyer.name, token.symbol, buyer.avg_buy_price, token.kols_count
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LastAction, PositionStatus};

    const NOW: i64 = 1_700_000_000;
    const WINDOW: u64 = 300; // 5 minutes

    fn alerts_config() -> AlertsConfig {
        AlertsConfig {
            enabled: true,
            interval_seconds: 30,
            recency_window_seconds: WINDOW,
            max_tokens_per_scan: 50,
            channel_capacity: 64,
            watches: Vec::new(),
        }
    }

    fn watch(user: &str, names: &[&str]) -> WatchConfig {
        WatchConfig {
            user_id: user.into(),
            kol_names: names.iter().map(|s| s.to_string()).collect(),
            min_kols_count: None,
            min_pnl_percent: None,
            position_status: None,
            active: true,
        }
    }

    fn buyer(name: &str, first_buy_at: i64, pnl: f64) -> KolBuyer {
        KolBuyer {
            name: name.into(),
            wallet_address: format!("{name}-wallet"),
            avg_buy_price: 0.0001,
            avg_sell_price: 0.0,
            avg_hold_time_seconds: 0.0,
            first_buy_at,
            last_action: LastAction::Buy,
            position_status: PositionStatus::Holding,
            realized_pnl_percent: pnl,
            realized_pnl_sol: 0.0,
            total_buys: 1,
            total_sells: 0,
            total_volume_sol: 1.0,
        }
    }

    fn token(address: &str, kols_count: u32, buyers: Vec<KolBuyer>) -> TokenActivity {
        let last = buyers.iter().map(|b| b.first_buy_at).max().unwrap_or(NOW);
        TokenActivity {
            token_address: address.into(),
            name: format!("{address} coin"),
            symbol: address.to_uppercase(),
            kols_count,
            first_kol_buy: last,
            last_kol_buy: last,
            kol_buyers: buyers,
        }
    }

    #[test]
    fn fresh_buy_emits_alert() {
        let matcher = AlertMatcher::new(alerts_config());
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        let events = matcher.check_alerts(&[watch("u1", &["alpha"])], &records, NOW);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "u1");
        assert_eq!(events[0].priority, AlertPriority::Medium);
        assert_eq!(events[0].title, "alpha bought TOK1");
    }

    #[test]
    fn stale_buy_outside_window_emits_nothing() {
        // Scenario D: buy 10 minutes ago, window 5 minutes.
        let matcher = AlertMatcher::new(alerts_config());
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 600, 150.0)])];

        let events = matcher.check_alerts(&[watch("u1", &["alpha"])], &records, NOW);
        assert!(events.is_empty());
    }

    #[test]
    fn unwatched_kol_emits_nothing() {
        let matcher = AlertMatcher::new(alerts_config());
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        let events = matcher.check_alerts(&[watch("u1", &["beta"])], &records, NOW);
        assert!(events.is_empty());
    }

    #[test]
    fn inactive_watch_is_skipped() {
        let matcher = AlertMatcher::new(alerts_config());
        let mut w = watch("u1", &["alpha"]);
        w.active = false;
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        assert!(matcher.check_alerts(&[w], &records, NOW).is_empty());
    }

    #[test]
    fn min_kols_threshold_filters() {
        let matcher = AlertMatcher::new(alerts_config());
        let mut w = watch("u1", &["alpha"]);
        w.min_kols_count = Some(5);
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        assert!(matcher.check_alerts(&[w], &records, NOW).is_empty());
    }

    #[test]
    fn min_pnl_threshold_filters() {
        let matcher = AlertMatcher::new(alerts_config());
        let mut w = watch("u1", &["alpha"]);
        w.min_pnl_percent = Some(500.0);
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        assert!(matcher.check_alerts(&[w], &records, NOW).is_empty());
    }

    #[test]
    fn position_status_filter_must_match() {
        let matcher = AlertMatcher::new(alerts_config());
        let mut w = watch("u1", &["alpha"]);
        w.position_status = Some(PositionStatus::FullySold);
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        assert!(matcher.check_alerts(&[w], &records, NOW).is_empty());
    }

    #[test]
    fn duplicate_suppressed_within_window() {
        let matcher = AlertMatcher::new(alerts_config());
        let watches = [watch("u1", &["alpha"])];
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        let first = matcher.check_alerts(&watches, &records, NOW);
        assert_eq!(first.len(), 1);

        // Same tuple 30s later, still inside the window → suppressed.
        let second = matcher.check_alerts(&watches, &records, NOW + 30);
        assert!(second.is_empty());
    }

    #[test]
    fn distinct_users_each_get_an_alert() {
        let matcher = AlertMatcher::new(alerts_config());
        let watches = [watch("u1", &["alpha"]), watch("u2", &["alpha"])];
        let records = vec![token("tok1", 3, vec![buyer("alpha", NOW - 60, 150.0)])];

        let events = matcher.check_alerts(&watches, &records, NOW);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn priority_classification_boundaries() {
        assert_eq!(determine_priority(1500.0, 1), AlertPriority::Urgent);
        assert_eq!(determine_priority(0.0, 11), AlertPriority::Urgent);
        assert_eq!(determine_priority(600.0, 1), AlertPriority::High);
        assert_eq!(determine_priority(0.0, 6), AlertPriority::High);
        assert_eq!(determine_priority(150.0, 1), AlertPriority::Medium);
        assert_eq!(determine_priority(0.0, 3), AlertPriority::Medium);
        assert_eq!(determine_priority(100.0, 2), AlertPriority::Low);
        assert_eq!(determine_priority(-50.0, 0), AlertPriority::Low);
    }

    #[test]
    fn scan_limit_bounds_tokens_considered() {
        let mut cfg = alerts_config();
        cfg.max_tokens_per_scan = 1;
        let matcher = AlertMatcher::new(cfg);

        // Newer token wins the single scan slot.
        let records = vec![
            token("old", 3, vec![buyer("alpha", NOW - 200, 150.0)]),
            token("new", 3, vec![buyer("alpha", NOW - 10, 150.0)]),
        ];

        let events = matcher.check_alerts(&[watch("u1", &["alpha"])], &records, NOW);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].token_address, "new");
    }
}
