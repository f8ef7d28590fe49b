//! Pure computation module for wallet and token performance metrics.
//!
//! No I/O, no side effects. Takes raw sample arrays and returns metric
//! values. Everything works in `f64`; money flows live in `Decimal` at the
//! call sites and convert to `f64` at this boundary for numerical work.
//!
//! Every function is total: empty sample sets and degenerate denominators
//! resolve to a defined default (0) rather than propagating NaN or infinity.

use crate::constants::MAX_MOMENTUM_SCORE;

// ---------------------------------------------------------------------------
// Basic statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation. Returns 0 for fewer than two samples.
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let variance = samples.iter().map(|s| (s - m) * (s - m)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Wallet-level formulas
// ---------------------------------------------------------------------------

/// Percentage of P&L samples above zero, in `[0, 100]`. 0 if empty.
pub fn win_rate(pnl_samples: &[f64]) -> f64 {
    if pnl_samples.is_empty() {
        return 0.0;
    }
    let wins = pnl_samples.iter().filter(|&&p| p > 0.0).count();
    wins as f64 / pnl_samples.len() as f64 * 100.0
}

/// Mean realized P&L percent. 0 if empty.
pub fn avg_pnl_percent(pnl_samples: &[f64]) -> f64 {
    mean(pnl_samples)
}

/// Mean hold time converted from seconds to hours. 0 if empty.
pub fn avg_hold_time_hours(hold_seconds_samples: &[f64]) -> f64 {
    mean(hold_seconds_samples) / 3600.0
}

/// Wallet momentum score in `[0, 100]`.
///
/// Weighted composite: win-rate factor (40), P&L factor (30), hold-time
/// factor (30). Shorter holds score higher; a zero hold time is treated as
/// one hour to guard the reciprocal.
pub fn wallet_momentum_score(win_rate: f64, avg_pnl: f64, avg_hold_hours: f64) -> u8 {
    let hold_hours = if avg_hold_hours <= 0.0 { 1.0 } else { avg_hold_hours };

    let win_rate_factor = clamp01(win_rate / 100.0) * 40.0;
    let pnl_factor = clamp01(avg_pnl / 1000.0) * 30.0;
    let hold_time_factor = clamp01(1.0 / hold_hours) * 30.0;

    let score = (win_rate_factor + pnl_factor + hold_time_factor).round();
    (score as u8).min(MAX_MOMENTUM_SCORE)
}

// ---------------------------------------------------------------------------
// Token-level formula
// ---------------------------------------------------------------------------

/// Token momentum score in `[0, 100]`.
///
/// Weighted composite: KOL-count factor (30), P&L factor (30), volume factor
/// (20), recency factor (20). Recency decays linearly to zero over 24 hours
/// since the last tracked buy; the factor is clamped on both sides so a
/// future-dated last buy cannot push the score past the cap.
pub fn token_momentum_score(
    kols_count: u32,
    avg_pnl: f64,
    total_volume: f64,
    hours_since_last_buy: f64,
) -> u8 {
    let kol_factor = clamp01(f64::from(kols_count) / 10.0) * 30.0;
    let pnl_factor = clamp01(avg_pnl / 1000.0) * 30.0;
    let volume_factor = clamp01(total_volume / 100.0) * 20.0;
    let recency_factor = clamp01(1.0 - hours_since_last_buy / 24.0) * 20.0;

    let score = (kol_factor + pnl_factor + volume_factor + recency_factor).round();
    (score as u8).min(MAX_MOMENTUM_SCORE)
}

// ---------------------------------------------------------------------------
// Portfolio risk statistics
// ---------------------------------------------------------------------------

/// Largest peak-to-trough fractional decline over an equity series.
///
/// Tracks the running peak and evaluates `(peak - equity) / peak` at each
/// step. Returns 0 for an empty series or a monotonically non-decreasing one.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0;

    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Simplified Sharpe-like ratio: `mean(returns) / population stddev(returns)`.
///
/// Returns 0 when the variance is 0 or the series is too short.
pub fn sharpe_ratio(daily_returns: &[f64]) -> f64 {
    let sd = std_dev(daily_returns);
    if sd <= 0.0 {
        return 0.0;
    }
    mean(daily_returns) / sd
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
