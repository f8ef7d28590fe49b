//! Rolling aggregation pipeline: per-token activity records folded into
//! per-wallet lifetime statistics and a momentum score.
//!
//! `aggregate` is a pure batch transform — each pass recomputes every wallet
//! aggregate from the full record set it is given, never incrementing
//! existing rows, so repeated runs over the same input converge to identical
//! values. The [`Aggregator`] actor wraps it with a leaderboard store and a
//! recurring refresh loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::constants::SECONDS_PER_HOUR;
use crate::core::metrics;
use crate::ingest::ActivityFeed;
use crate::store::LeaderboardStore;
use crate::types::{TokenActivity, TokenStats, WalletAggregate};

// ---------------------------------------------------------------------------
// Pure aggregation
// ---------------------------------------------------------------------------

/// Running per-wallet accumulator used during a single fold pass.
#[derive(Debug)]
struct WalletAccumulator {
    name: String,
    wallet_address: String,
    total_tokens_traded: u32,
    total_volume_sol: f64,
    total_realized_pnl_sol: f64,
    total_trades: u32,
    pnl_samples: Vec<f64>,
    hold_time_samples: Vec<f64>,
    last_active: i64,
}

impl WalletAccumulator {
    fn new(name: &str, wallet_address: &str, first_buy_at: i64) -> Self {
        Self {
            name: name.to_string(),
            wallet_address: wallet_address.to_string(),
            total_tokens_traded: 0,
            total_volume_sol: 0.0,
            total_realized_pnl_sol: 0.0,
            total_trades: 0,
            pnl_samples: Vec::new(),
            hold_time_samples: Vec::new(),
            last_active: first_buy_at,
        }
    }

    fn finish(self) -> WalletAggregate {
        let win_rate = metrics::win_rate(&self.pnl_samples);
        let avg_pnl_percent = metrics::avg_pnl_percent(&self.pnl_samples);
        let avg_hold_time_hours = metrics::avg_hold_time_hours(&self.hold_time_samples);

        // Default to 0 when no samples exist — never ±infinity.
        let best_trade_pnl = self.pnl_samples.iter().copied().fold(0.0, f64::max);
        let worst_trade_pnl = self.pnl_samples.iter().copied().fold(0.0, f64::min);

        WalletAggregate {
            momentum_score: metrics::wallet_momentum_score(
                win_rate,
                avg_pnl_percent,
                avg_hold_time_hours,
            ),
            name: self.name,
            wallet_address: self.wallet_address,
            total_tokens_traded: self.total_tokens_traded,
            total_volume_sol: self.total_volume_sol,
            total_realized_pnl_sol: self.total_realized_pnl_sol,
            total_trades: self.total_trades,
            avg_pnl_percent,
            win_rate,
            avg_hold_time_hours,
            best_trade_pnl,
            worst_trade_pnl,
            last_active: self.last_active,
        }
    }
}

/// Fold a batch of activity records into per-wallet lifetime statistics.
///
/// The wallet address is the natural key. Per sub-record the fold increments
/// tokens-traded, sums volume / realized P&L / trade counts, appends the P&L
/// and hold-time samples, and advances last-active to the max observed
/// first-buy timestamp. Derived metrics come from [`metrics`].
pub fn aggregate(records: &[TokenActivity]) -> HashMap<String, WalletAggregate> {
    let mut accumulators: HashMap<String, WalletAccumulator> = HashMap::new();

    for token in records {
        for buyer in &token.kol_buyers {
            let acc = accumulators
                .entry(buyer.wallet_address.clone())
                .or_insert_with(|| {
                    WalletAccumulator::new(&buyer.name, &buyer.wallet_address, buyer.first_buy_at)
                });

            acc.total_tokens_traded += 1;
            acc.total_volume_sol += buyer.total_volume_sol;
            acc.total_realized_pnl_sol += buyer.realized_pnl_sol;
            acc.total_trades += buyer.total_buys + buyer.total_sells;
            acc.pnl_samples.push(buyer.realized_pnl_percent);
            acc.hold_time_samples.push(buyer.avg_hold_time_seconds);
            acc.last_active = acc.last_active.max(buyer.first_buy_at);
        }
    }

    accumulators
        .into_iter()
        .map(|(address, acc)| (address, acc.finish()))
        .collect()
}

/// Derive the per-token summary (volume, average KOL P&L, momentum score).
///
/// `now` is explicit because the recency factor makes the score
/// time-dependent — recompute on read, or timestamp the result.
pub fn token_stats(token: &TokenActivity, now: i64) -> TokenStats {
    let total_volume_sol: f64 = token.kol_buyers.iter().map(|b| b.total_volume_sol).sum();
    let pnl_samples: Vec<f64> = token
        .kol_buyers
        .iter()
        .map(|b| b.realized_pnl_percent)
        .collect();
    let avg_kol_pnl_percent = metrics::avg_pnl_percent(&pnl_samples);

    let hours_since_last_buy = (now - token.last_kol_buy) as f64 / SECONDS_PER_HOUR as f64;

    TokenStats {
        token_address: token.token_address.clone(),
        total_volume_sol,
        avg_kol_pnl_percent,
        momentum_score: metrics::token_momentum_score(
            token.kols_count,
            avg_kol_pnl_percent,
            total_volume_sol,
            hours_since_last_buy,
        ),
    }
}

// ---------------------------------------------------------------------------
// Aggregator actor
// ---------------------------------------------------------------------------

/// Persisting aggregator: folds activity snapshots and upserts every wallet
/// into the injected leaderboard store on a recurring interval.
pub struct Aggregator {
    store: Arc<dyn LeaderboardStore>,
    feed: Arc<dyn ActivityFeed>,
    refresh_interval: Duration,
    shutdown: CancellationToken,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn LeaderboardStore>,
        feed: Arc<dyn ActivityFeed>,
        refresh_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            feed,
            refresh_interval,
            shutdown,
        }
    }

    /// Run one aggregation pass over a snapshot and upsert every wallet.
    ///
    /// Upsert-by-address keeps the pass idempotent; wallets absent from this
    /// snapshot persist in the store untouched.
    pub async fn run_pass(&self, records: &[TokenActivity]) -> Result<usize> {
        let aggregates = aggregate(records);

        for aggregate in aggregates.values() {
            self.store
                .upsert(aggregate)
                .await
                .with_context(|| format!("upserting wallet {}", aggregate.wallet_address))?;
        }

        debug!(
            tokens = records.len(),
            wallets = aggregates.len(),
            "aggregation pass complete"
        );
        Ok(aggregates.len())
    }

    /// Recurring refresh loop. Runs until the CancellationToken is cancelled.
    pub async fn run(&self) -> Result<()> {
        info!(
            interval_s = self.refresh_interval.as_secs(),
            "aggregator started"
        );

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("aggregator shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.refresh_interval) => {
                    match self.feed.latest().await {
                        Ok(records) => {
                            if let Err(e) = self.run_pass(&records).await {
                                error!(error = %e, "aggregation pass failed");
                            }
                        }
                        Err(e) => error!(error = %e, "failed to fetch activity snapshot"),
                    }
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
