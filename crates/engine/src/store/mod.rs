//! Leaderboard store abstraction.
//!
//! The aggregator writes wallet aggregates through this trait instead of a
//! process-wide map, so ownership is explicit and the store is swappable in
//! tests. Keyed by wallet address; upsert is idempotent and wallets absent
//! from a pass are never removed.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::WalletAggregate;

pub use memory::MemoryLeaderboard;
pub use sqlite::SqliteLeaderboard;

/// Field the leaderboard can be ranked by (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    MomentumScore,
    WinRate,
    TotalRealizedPnl,
    LastActive,
}

impl SortField {
    /// Column name in the SQLite schema.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::MomentumScore => "momentum_score",
            Self::WinRate => "win_rate",
            Self::TotalRealizedPnl => "total_realized_pnl_sol",
            Self::LastActive => "last_active",
        }
    }
}

/// Key-value leaderboard keyed by wallet address.
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Insert or replace the aggregate for its wallet address.
    async fn upsert(&self, aggregate: &WalletAggregate) -> Result<()>;

    /// Fetch one wallet's aggregate, if present.
    async fn get(&self, wallet_address: &str) -> Result<Option<WalletAggregate>>;

    /// Top `n` wallets by `sort`, descending.
    async fn top_n(&self, n: usize, sort: SortField) -> Result<Vec<WalletAggregate>>;
}
