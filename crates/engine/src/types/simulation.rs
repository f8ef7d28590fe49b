//! Copytrade simulation configuration, trade ledger, and result types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When the simulated follower enters after a KOL buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStrategy {
    /// Enter at the KOL's recorded first-buy time.
    Immediate,
    /// Enter `delay_minutes` after the KOL's first buy.
    Delayed,
    /// Only enter tokens where at least `min_kols_count` KOLs bought.
    Filtered,
}

impl FollowStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Delayed => "delayed",
            Self::Filtered => "filtered",
        }
    }
}

/// Immutable configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// KOL display names to follow.
    pub kol_names: Vec<String>,
    /// Unix seconds; the simulated window is `[start, end]`.
    pub start: i64,
    pub end: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub initial_capital: Decimal,
    /// Max position size as a percentage of current capital.
    #[serde(with = "rust_decimal::serde::str")]
    pub max_position_size_pct: Decimal,
    pub stop_loss_percent: Option<f64>,
    pub take_profit_percent: Option<f64>,
    pub follow_strategy: FollowStrategy,
    /// Entry delay for [`FollowStrategy::Delayed`].
    pub delay_minutes: Option<i64>,
    /// Minimum concurrent-KOL count for [`FollowStrategy::Filtered`].
    pub min_kols_count: Option<u32>,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Why a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The source record shows the KOL fully exited.
    KolSell,
    StopLoss,
    TakeProfit,
    /// Held flat until the end of the simulated window.
    EndDate,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KolSell => "kol_sell",
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::EndDate => "end_date",
        }
    }
}

/// One completed simulated trade. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub token_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub kol_name: String,
    pub buy_price: f64,
    pub sell_price: f64,
    /// Unix seconds.
    pub buy_time: i64,
    pub sell_time: i64,
    pub hold_time_hours: f64,
    pub pnl_percent: f64,
    #[serde(with = "rust_decimal::serde::str")]
    pub pnl_sol: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub position_size: Decimal,
    pub reason: ExitReason,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Realized equity at one calendar-day boundary of the simulated window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyEquityPoint {
    /// `YYYY-MM-DD` (UTC).
    pub date: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub capital: Decimal,
    /// Cumulative realized P&L up to this day boundary.
    #[serde(with = "rust_decimal::serde::str")]
    pub pnl: Decimal,
}

/// Per-KOL slice of the simulation outcome. Every configured name gets a row,
/// all-zero when the KOL produced no trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolPerformance {
    pub kol_name: String,
    pub trades: u32,
    pub win_rate: f64,
    pub avg_pnl_percent: f64,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_pnl_sol: Decimal,
}

/// Complete outcome of one simulation run.
///
/// Derived entirely from the trade ledger; never mutated after computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub config: SimulationConfig,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub total_pnl_percent: f64,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_pnl_sol: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_capital: Decimal,
    /// Largest peak-to-trough decline over the capital history, as a
    /// fraction in `[0, 1]`.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub best_trade: Option<SimulatedTrade>,
    pub worst_trade: Option<SimulatedTrade>,
    pub trades: Vec<SimulatedTrade>,
    pub daily_equity: Vec<DailyEquityPoint>,
    pub kol_performance: Vec<KolPerformance>,
}
