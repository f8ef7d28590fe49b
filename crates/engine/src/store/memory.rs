//! In-memory leaderboard for tests and embedded use.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::WalletAggregate;

use super::{LeaderboardStore, SortField};

/// `HashMap`-backed store behind a `tokio::sync::RwLock`.
#[derive(Default)]
pub struct MemoryLeaderboard {
    inner: RwLock<HashMap<String, WalletAggregate>>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cmp_by(sort: SortField, a: &WalletAggregate, b: &WalletAggregate) -> Ordering {
    match sort {
        SortField::MomentumScore => a.momentum_score.cmp(&b.momentum_score),
        SortField::WinRate => a.win_rate.partial_cmp(&b.win_rate).unwrap_or(Ordering::Equal),
        SortField::TotalRealizedPnl => a
            .total_realized_pnl_sol
            .partial_cmp(&b.total_realized_pnl_sol)
            .unwrap_or(Ordering::Equal),
        SortField::LastActive => a.last_active.cmp(&b.last_active),
    }
}

#[async_trait]
impl LeaderboardStore for MemoryLeaderboard {
    async fn upsert(&self, aggregate: &WalletAggregate) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(aggregate.wallet_address.clone(), aggregate.clone());
        Ok(())
    }

    async fn get(&self, wallet_address: &str) -> Result<Option<WalletAggregate>> {
        Ok(self.inner.read().await.get(wallet_address).cloned())
    }

    async fn top_n(&self, n: usize, sort: SortField) -> Result<Vec<WalletAggregate>> {
        let mut all: Vec<WalletAggregate> = self.inner.read().await.values().cloned().collect();
        all.sort_by(|a, b| cmp_by(sort, b, a)); // descending
        all.truncate(n);
        Ok(all)
    }
}
