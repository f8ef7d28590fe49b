//! Copytrade backtest simulator.
//!
//! Replays historical KOL buys against a strategy configuration and produces
//! a trade ledger plus portfolio-level performance metrics. The simulation is
//! a pure function of (config, records): no I/O, no clock reads.
//!
//! Known simplification: there is no live price feed, so mark-to-market P&L
//! for open positions is evaluated against the static buy price. Stop-loss /
//! take-profit exits therefore only trigger on degenerate thresholds, and a
//! position the KOL never exited closes flat at the window end. An external
//! price-at-time oracle would replace this (see DESIGN.md).

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR, SYNTHETIC_EXIT_HOLD_SECONDS};
use crate::core::metrics;
use crate::errors::EngineError;
use crate::types::{
    DailyEquityPoint, ExitReason, FollowStrategy, KolBuyer, KolPerformance, PositionStatus,
    SimulatedTrade, SimulationConfig, SimulationResult, TokenActivity,
};

/// Minimum position size; below this no trade is opened.
const DUST_THRESHOLD: Decimal = dec!(0.001);

/// Hard cap on the share of capital committed to a single trade.
const MAX_SINGLE_TRADE_FRACTION: Decimal = dec!(0.1);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run a copytrade simulation over a batch of activity records.
///
/// Records are filtered to the configured window and KOL set, processed in
/// chronological order, and each qualifying KOL buy becomes a simulated
/// position resolved through the exit-condition precedence of
/// [`resolve_exit`]. Returns a fail-fast error on caller misuse; data noise
/// never aborts the run.
pub fn simulate(
    config: &SimulationConfig,
    records: &[TokenActivity],
) -> Result<SimulationResult, EngineError> {
    validate_config(config)?;

    let followed: HashSet<&str> = config.kol_names.iter().map(String::as_str).collect();

    // Tokens with KOL activity inside the window, oldest first.
    let mut tokens: Vec<&TokenActivity> = records
        .iter()
        .filter(|t| t.last_kol_buy >= config.start && t.last_kol_buy <= config.end)
        .filter(|t| t.kol_buyers.iter().any(|b| followed.contains(b.name.as_str())))
        .collect();
    tokens.sort_by_key(|t| t.last_kol_buy);

    info!(
        kols = config.kol_names.len(),
        tokens = tokens.len(),
        strategy = config.follow_strategy.as_str(),
        "starting copytrade simulation"
    );

    let mut trades: Vec<SimulatedTrade> = Vec::new();
    let mut capital = config.initial_capital;
    let mut capital_history: Vec<Decimal> = vec![capital];

    for token in tokens {
        // `filtered` strategy gates on concurrent-KOL count.
        if config.follow_strategy == FollowStrategy::Filtered {
            let min_kols = config.min_kols_count.unwrap_or(1);
            if token.kols_count < min_kols {
                debug!(token = %token.token_address, kols = token.kols_count, "filtered: below min KOL count");
                continue;
            }
        }

        // Followed buyers in first-buy order.
        let mut buyers: Vec<&KolBuyer> = token
            .kol_buyers
            .iter()
            .filter(|b| followed.contains(b.name.as_str()))
            .collect();
        buyers.sort_by_key(|b| b.first_buy_at);

        for buyer in buyers {
            let mut buy_time = buyer.first_buy_at;

            // `delayed` strategy shifts the simulated entry forward.
            if config.follow_strategy == FollowStrategy::Delayed {
                if let Some(delay) = config.delay_minutes {
                    buy_time += delay * 60;
                }
            }

            // Reject entries whose (possibly shifted) entry leaves the window.
            if buy_time < config.start || buy_time > config.end {
                continue;
            }

            let buy_price = buyer.avg_buy_price;
            if buy_price <= 0.0 {
                warn!(token = %token.token_address, kol = %buyer.name, "skipping entry with non-positive buy price");
                continue;
            }

            // Position sizing against current capital, capped at 10% per trade.
            let position_size = (capital * config.max_position_size_pct / dec!(100))
                .min(capital * MAX_SINGLE_TRADE_FRACTION);
            if position_size < DUST_THRESHOLD {
                continue;
            }

            let (sell_price, sell_time, reason) = resolve_exit(config, buyer, buy_time, buy_price);
            let sell_time = sell_time.max(buy_time);

            let pnl_percent = (sell_price - buy_price) / buy_price * 100.0;
            let pnl_sol = position_size * Decimal::from_f64_retain(pnl_percent).unwrap_or_default()
                / dec!(100);
            let hold_time_hours = (sell_time - buy_time) as f64 / SECONDS_PER_HOUR as f64;

            trades.push(SimulatedTrade {
                token_address: token.token_address.clone(),
                token_name: token.name.clone(),
                token_symbol: token.symbol.clone(),
                kol_name: buyer.name.clone(),
                buy_price,
                sell_price,
                buy_time,
                sell_time,
                hold_time_hours,
                pnl_percent,
                pnl_sol,
                position_size,
                reason,
            });

            capital += pnl_sol;
            capital_history.push(capital);
        }
    }

    let result = build_result(config, trades, capital, &capital_history);

    info!(
        trades = result.total_trades,
        win_rate = result.win_rate,
        total_pnl_percent = result.total_pnl_percent,
        "simulation complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_config(config: &SimulationConfig) -> Result<(), EngineError> {
    if config.kol_names.is_empty() {
        return Err(EngineError::Config("kol_names must not be empty".into()));
    }
    if config.start >= config.end {
        return Err(EngineError::Config(format!(
            "start ({}) must be before end ({})",
            config.start, config.end
        )));
    }
    if config.initial_capital <= Decimal::ZERO {
        return Err(EngineError::Config(format!(
            "initial_capital must be positive, got {}",
            config.initial_capital
        )));
    }
    if config.max_position_size_pct <= Decimal::ZERO || config.max_position_size_pct > dec!(100) {
        return Err(EngineError::Config(format!(
            "max_position_size_pct must be in (0, 100], got {}",
            config.max_position_size_pct
        )));
    }
    if config.follow_strategy == FollowStrategy::Delayed
        && config.delay_minutes.map_or(true, |d| d <= 0)
    {
        return Err(EngineError::Config(
            "delayed strategy requires positive delay_minutes".into(),
        ));
    }
    if config.follow_strategy == FollowStrategy::Filtered && config.min_kols_count.is_none() {
        return Err(EngineError::Config(
            "filtered strategy requires min_kols_count".into(),
        ));
    }
    if config.stop_loss_percent.is_some_and(|sl| sl <= 0.0) {
        return Err(EngineError::Config(
            "stop_loss_percent must be positive when set".into(),
        ));
    }
    if config.take_profit_percent.is_some_and(|tp| tp <= 0.0) {
        return Err(EngineError::Config(
            "take_profit_percent must be positive when set".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Exit resolution
// ---------------------------------------------------------------------------

/// Resolve the exit of one simulated position.
///
/// Precedence: KOL fully sold → stop-loss → take-profit → hold to window end.
/// With no price feed, the mark price for an open position is the buy price,
/// so the stop-loss / take-profit branches evaluate against a flat 0% P&L.
fn resolve_exit(
    config: &SimulationConfig,
    buyer: &KolBuyer,
    buy_time: i64,
    buy_price: f64,
) -> (f64, i64, ExitReason) {
    if buyer.position_status == PositionStatus::FullySold {
        // Exit at the KOL's recorded average sell, dated by their hold time.
        let sell_time = buyer.first_buy_at + buyer.avg_hold_time_seconds as i64;
        return (buyer.avg_sell_price, sell_time, ExitReason::KolSell);
    }

    let mark_price = buy_price; // no live price feed
    let mtm_pnl_percent = (mark_price - buy_price) / buy_price * 100.0;

    if let Some(stop_loss) = config.stop_loss_percent {
        if mtm_pnl_percent <= -stop_loss {
            let sell_price = buy_price * (1.0 - stop_loss / 100.0);
            return (
                sell_price,
                buy_time + SYNTHETIC_EXIT_HOLD_SECONDS,
                ExitReason::StopLoss,
            );
        }
    }

    if let Some(take_profit) = config.take_profit_percent {
        if mtm_pnl_percent >= take_profit {
            let sell_price = buy_price * (1.0 + take_profit / 100.0);
            return (
                sell_price,
                buy_time + SYNTHETIC_EXIT_HOLD_SECONDS,
                ExitReason::TakeProfit,
            );
        }
    }

    (buy_price, config.end, ExitReason::EndDate)
}

// ---------------------------------------------------------------------------
// Result assembly
// ---------------------------------------------------------------------------

fn build_result(
    config: &SimulationConfig,
    trades: Vec<SimulatedTrade>,
    final_capital: Decimal,
    capital_history: &[Decimal],
) -> SimulationResult {
    let total_trades = trades.len() as u32;
    let winning_trades = trades.iter().filter(|t| t.pnl_percent > 0.0).count() as u32;
    let losing_trades = trades.iter().filter(|t| t.pnl_percent < 0.0).count() as u32;
    let win_rate = if total_trades > 0 {
        f64::from(winning_trades) / f64::from(total_trades) * 100.0
    } else {
        0.0
    };

    let total_pnl_sol = final_capital - config.initial_capital;
    let total_pnl_percent = (total_pnl_sol / config.initial_capital * dec!(100))
        .to_f64()
        .unwrap_or(0.0);

    // Risk statistics work in f64 at the Decimal boundary.
    let equity_f64: Vec<f64> = capital_history
        .iter()
        .map(|c| c.to_f64().unwrap_or(0.0))
        .collect();
    let max_drawdown = metrics::max_drawdown(&equity_f64);

    let daily_equity = daily_equity_series(config, &trades);
    let daily_returns = daily_return_series(config.initial_capital, &daily_equity);
    let sharpe_ratio = metrics::sharpe_ratio(&daily_returns);

    let best_trade = trades
        .iter()
        .max_by(|a, b| cmp_pnl(a.pnl_percent, b.pnl_percent))
        .cloned();
    let worst_trade = trades
        .iter()
        .min_by(|a, b| cmp_pnl(a.pnl_percent, b.pnl_percent))
        .cloned();

    let kol_performance = kol_performance_rows(&config.kol_names, &trades);

    SimulationResult {
        config: config.clone(),
        total_trades,
        winning_trades,
        losing_trades,
        win_rate,
        total_pnl_percent,
        total_pnl_sol,
        final_capital,
        max_drawdown,
        sharpe_ratio,
        best_trade,
        worst_trade,
        trades,
        daily_equity,
        kol_performance,
    }
}

fn cmp_pnl(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Realized equity at each calendar-day boundary of the simulated window:
/// initial capital plus the P&L of every trade closed by that boundary.
fn daily_equity_series(config: &SimulationConfig, trades: &[SimulatedTrade]) -> Vec<DailyEquityPoint> {
    let span = config.end - config.start;
    let days = (span + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;

    let mut series = Vec::with_capacity(days as usize + 1);
    for i in 0..=days {
        let boundary = config.start + i * SECONDS_PER_DAY;
        let realized: Decimal = trades
            .iter()
            .filter(|t| t.sell_time <= boundary)
            .map(|t| t.pnl_sol)
            .sum();

        series.push(DailyEquityPoint {
            date: format_date(boundary),
            capital: config.initial_capital + realized,
            pnl: realized,
        });
    }
    series
}

/// Per-day equity deltas as a fraction of initial capital.
fn daily_return_series(initial_capital: Decimal, series: &[DailyEquityPoint]) -> Vec<f64> {
    let initial = initial_capital.to_f64().unwrap_or(0.0);
    if initial <= 0.0 {
        return Vec::new();
    }

    let mut previous = initial;
    series
        .iter()
        .map(|point| {
            let capital = point.capital.to_f64().unwrap_or(0.0);
            let r = (capital - previous) / initial;
            previous = capital;
            r
        })
        .collect()
}

/// One row per configured KOL name, all-zero when the name produced no trades.
fn kol_performance_rows(kol_names: &[String], trades: &[SimulatedTrade]) -> Vec<KolPerformance> {
    kol_names
        .iter()
        .map(|name| {
            let kol_trades: Vec<&SimulatedTrade> =
                trades.iter().filter(|t| &t.kol_name == name).collect();
            let pnl_samples: Vec<f64> = kol_trades.iter().map(|t| t.pnl_percent).collect();

            KolPerformance {
                kol_name: name.clone(),
                trades: kol_trades.len() as u32,
                win_rate: metrics::win_rate(&pnl_samples),
                avg_pnl_percent: metrics::avg_pnl_percent(&pnl_samples),
                total_pnl_sol: kol_trades.iter().map(|t| t.pnl_sol).sum(),
            }
        })
        .collect()
}

fn format_date(unix_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
