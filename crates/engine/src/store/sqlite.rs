//! SQLite-backed leaderboard.
//!
//! Uses `sqlx::query()` runtime queries; the schema is created idempotently
//! on open so the store is self-contained. Single-writer pool — SQLite.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::types::WalletAggregate;

use super::{LeaderboardStore, SortField};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS wallet_leaderboard (
    wallet_address          TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    total_tokens_traded     INTEGER NOT NULL,
    total_volume_sol        REAL NOT NULL,
    total_realized_pnl_sol  REAL NOT NULL,
    total_trades            INTEGER NOT NULL,
    avg_pnl_percent         REAL NOT NULL,
    win_rate                REAL NOT NULL,
    avg_hold_time_hours     REAL NOT NULL,
    momentum_score          INTEGER NOT NULL,
    best_trade_pnl          REAL NOT NULL,
    worst_trade_pnl         REAL NOT NULL,
    last_active             INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_leaderboard_momentum ON wallet_leaderboard (momentum_score DESC);
CREATE INDEX IF NOT EXISTS idx_leaderboard_last_active ON wallet_leaderboard (last_active DESC);";

/// SQLite leaderboard store.
pub struct SqliteLeaderboard {
    pool: SqlitePool,
}

impl SqliteLeaderboard {
    /// Open (creating if needed, `mode=rwc`) and ensure the schema exists.
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1) // SQLite is single-writer
            .connect(&format!("sqlite:{db_path}?mode=rwc"))
            .await
            .context("failed to connect to SQLite database")?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("failed to create leaderboard schema")?;

        info!(db_path, "leaderboard store initialized");
        Ok(Self { pool })
    }

    /// Direct access to the underlying pool (for advanced queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_aggregate(row: &sqlx::sqlite::SqliteRow) -> WalletAggregate {
    WalletAggregate {
        wallet_address: row.get("wallet_address"),
        name: row.get("name"),
        total_tokens_traded: row.get::<i64, _>("total_tokens_traded") as u32,
        total_volume_sol: row.get("total_volume_sol"),
        total_realized_pnl_sol: row.get("total_realized_pnl_sol"),
        total_trades: row.get::<i64, _>("total_trades") as u32,
        avg_pnl_percent: row.get("avg_pnl_percent"),
        win_rate: row.get("win_rate"),
        avg_hold_time_hours: row.get("avg_hold_time_hours"),
        momentum_score: row.get::<i64, _>("momentum_score") as u8,
        best_trade_pnl: row.get("best_trade_pnl"),
        worst_trade_pnl: row.get("worst_trade_pnl"),
        last_active: row.get("last_active"),
    }
}

#[async_trait]
impl LeaderboardStore for SqliteLeaderboard {
    async fn upsert(&self, aggregate: &WalletAggregate) -> Result<()> {
        sqlx::query(
            "INSERT INTO wallet_leaderboard (wallet_address, name, total_tokens_traded, \
             total_volume_sol, total_realized_pnl_sol, total_trades, avg_pnl_percent, \
             win_rate, avg_hold_time_hours, momentum_score, best_trade_pnl, \
             worst_trade_pnl, last_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(wallet_address) DO UPDATE SET \
             name = excluded.name, \
             total_tokens_traded = excluded.total_tokens_traded, \
             total_volume_sol = excluded.total_volume_sol, \
             total_realized_pnl_sol = excluded.total_realized_pnl_sol, \
             total_trades = excluded.total_trades, \
             avg_pnl_percent = excluded.avg_pnl_percent, \
             win_rate = excluded.win_rate, \
             avg_hold_time_hours = excluded.avg_hold_time_hours, \
             momentum_score = excluded.momentum_score, \
             best_trade_pnl = excluded.best_trade_pnl, \
             worst_trade_pnl = excluded.worst_trade_pnl, \
             last_active = excluded.last_active",
        )
        .bind(&aggregate.wallet_address)
        .bind(&aggregate.name)
        .bind(i64::from(aggregate.total_tokens_traded))
        .bind(aggregate.total_volume_sol)
        .bind(aggregate.total_realized_pnl_sol)
        .bind(i64::from(aggregate.total_trades))
        .bind(aggregate.avg_pnl_percent)
        .bind(aggregate.win_rate)
        .bind(aggregate.avg_hold_time_hours)
        .bind(i64::from(aggregate.momentum_score))
        .bind(aggregate.best_trade_pnl)
        .bind(aggregate.worst_trade_pnl)
        .bind(aggregate.last_active)
        .execute(&self.pool)
        .await
        .context("failed to upsert wallet aggregate")?;

        Ok(())
    }

    async fn get(&self, wallet_address: &str) -> Result<Option<WalletAggregate>> {
        let row = sqlx::query("SELECT * FROM wallet_leaderboard WHERE wallet_address = ?")
            .bind(wallet_address)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_aggregate))
    }

    async fn top_n(&self, n: usize, sort: SortField) -> Result<Vec<WalletAggregate>> {
        // Column name comes from a closed enum, never from caller input.
        let sql = format!(
            "SELECT * FROM wallet_leaderboard ORDER BY {} DESC LIMIT ?",
            sort.column()
        );
        let rows = sqlx::query(&sql)
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_aggregate).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (SqliteLeaderboard, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("leaderboard.db");
        let store = SqliteLeaderboard::new(db_path.to_str().unwrap())
            .await
            .unwrap();
        (store, dir)
    }

    fn aggregate(address: &str, momentum: u8, win_rate: f64) -> WalletAggregate {
        WalletAggregate {
            name: address.to_lowercase(),
            wallet_address: address.into(),
            total_tokens_traded: 3,
            total_volume_sol: 12.5,
            total_realized_pnl_sol: 4.2,
            total_trades: 9,
            avg_pnl_percent: 33.3,
            win_rate,
            avg_hold_time_hours: 2.5,
            momentum_score: momentum,
            best_trade_pnl: 120.0,
            worst_trade_pnl: -15.0,
            last_active: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let (store, _dir) = temp_store().await;
        let original = aggregate("W1", 55, 60.0);
        store.upsert(&original).await.unwrap();

        let loaded = store.get("W1").await.unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_upsert_converges_to_one_row() {
        let (store, _dir) = temp_store().await;
        store.upsert(&aggregate("W1", 40, 50.0)).await.unwrap();
        store.upsert(&aggregate("W1", 75, 80.0)).await.unwrap();

        let all = store.top_n(10, SortField::MomentumScore).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].momentum_score, 75);
        assert_eq!(all[0].win_rate, 80.0);
    }

    #[tokio::test]
    async fn top_n_respects_sort_field_and_limit() {
        let (store, _dir) = temp_store().await;
        store.upsert(&aggregate("W1", 30, 90.0)).await.unwrap();
        store.upsert(&aggregate("W2", 80, 10.0)).await.unwrap();
        store.upsert(&aggregate("W3", 55, 50.0)).await.unwrap();

        let by_momentum = store.top_n(2, SortField::MomentumScore).await.unwrap();
        assert_eq!(by_momentum.len(), 2);
        assert_eq!(by_momentum[0].wallet_address, "W2");

        let by_win_rate = store.top_n(1, SortField::WinRate).await.unwrap();
        assert_eq!(by_win_rate[0].wallet_address, "W1");
    }
}
