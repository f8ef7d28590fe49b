use serde::{Deserialize, Serialize};

/// Lifetime statistics for one tracked wallet, keyed by wallet address.
///
/// Owned exclusively by the aggregator: every pass recomputes aggregates from
/// the full record set it is given, so a `WalletAggregate` is a pure function
/// of the source records and repeated passes converge to identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAggregate {
    pub name: String,
    pub wallet_address: String,
    pub total_tokens_traded: u32,
    pub total_volume_sol: f64,
    pub total_realized_pnl_sol: f64,
    /// Buys plus sells across every observed token.
    pub total_trades: u32,
    pub avg_pnl_percent: f64,
    /// Percentage of P&L samples above zero, in `[0, 100]`.
    pub win_rate: f64,
    pub avg_hold_time_hours: f64,
    /// Bounded composite score in `[0, 100]`.
    pub momentum_score: u8,
    /// Max / min over observed P&L samples; 0 when no samples exist.
    pub best_trade_pnl: f64,
    pub worst_trade_pnl: f64,
    /// Unix seconds; monotonic max over observed first-buy timestamps.
    pub last_active: i64,
}
