//! Validated activity record types and their raw ingestion-boundary shapes.
//!
//! Upstream snapshots arrive as loosely-shaped JSON. `RawTokenActivity` /
//! `RawKolBuyer` mirror that shape with optional fields; validation converts
//! them into the strongly-typed records the rest of the engine consumes, so
//! core code never branches on missing data.

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Last recorded action of a KOL on a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastAction {
    Buy,
    Sell,
}

impl LastAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Whether a KOL currently holds, has fully exited, or partially exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Holding,
    FullySold,
    PartialSold,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holding => "holding",
            Self::FullySold => "fully_sold",
            Self::PartialSold => "partial_sold",
        }
    }
}

// ---------------------------------------------------------------------------
// Validated records
// ---------------------------------------------------------------------------

/// One KOL's trading record on a single token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolBuyer {
    pub name: String,
    pub wallet_address: String,
    pub avg_buy_price: f64,
    pub avg_sell_price: f64,
    pub avg_hold_time_seconds: f64,
    /// Unix seconds of this KOL's first buy on the token.
    pub first_buy_at: i64,
    pub last_action: LastAction,
    pub position_status: PositionStatus,
    pub realized_pnl_percent: f64,
    pub realized_pnl_sol: f64,
    pub total_buys: u32,
    pub total_sells: u32,
    pub total_volume_sol: f64,
}

/// One token with its embedded KOL-buyer sub-records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenActivity {
    pub token_address: String,
    pub name: String,
    pub symbol: String,
    pub kols_count: u32,
    /// Unix seconds of the earliest / latest tracked KOL buy.
    pub first_kol_buy: i64,
    pub last_kol_buy: i64,
    pub kol_buyers: Vec<KolBuyer>,
}

/// Per-token derived summary (recomputed against an explicit `now` since the
/// recency factor makes the momentum score time-dependent).
#[derive(Debug, Clone, Serialize)]
pub struct TokenStats {
    pub token_address: String,
    pub total_volume_sol: f64,
    pub avg_kol_pnl_percent: f64,
    pub momentum_score: u8,
}

// ---------------------------------------------------------------------------
// Raw ingestion-boundary shapes
// ---------------------------------------------------------------------------

/// Unvalidated KOL-buyer record as it appears in an upstream snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKolBuyer {
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub avg_buy_price: Option<f64>,
    pub avg_sell_price: Option<f64>,
    pub avg_hold_time_seconds: Option<f64>,
    pub first_buy_at: Option<i64>,
    pub last_action: Option<LastAction>,
    pub position_status: Option<PositionStatus>,
    pub realized_pnl_percent: Option<f64>,
    pub realized_pnl_sol: Option<f64>,
    pub total_buys: Option<u32>,
    pub total_sells: Option<u32>,
    pub total_volume_sol: Option<f64>,
}

/// Unvalidated token record as it appears in an upstream snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTokenActivity {
    pub token_address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub kols_count: Option<u32>,
    pub first_kol_buy: Option<i64>,
    pub last_kol_buy: Option<i64>,
    #[serde(default)]
    pub kol_buyers: Vec<RawKolBuyer>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require<T>(field: Option<T>, name: &str) -> Result<T, EngineError> {
    field.ok_or_else(|| EngineError::InputShape {
        reason: format!("missing required field `{name}`"),
    })
}

fn require_finite(value: Option<f64>, name: &str) -> Result<f64, EngineError> {
    let value = require(value, name)?;
    if !value.is_finite() {
        return Err(EngineError::InputShape {
            reason: format!("field `{name}` is not finite: {value}"),
        });
    }
    Ok(value)
}

fn require_non_negative(value: Option<f64>, name: &str) -> Result<f64, EngineError> {
    let value = require_finite(value, name)?;
    if value < 0.0 {
        return Err(EngineError::InputShape {
            reason: format!("field `{name}` is negative: {value}"),
        });
    }
    Ok(value)
}

impl TryFrom<RawKolBuyer> for KolBuyer {
    type Error = EngineError;

    fn try_from(raw: RawKolBuyer) -> Result<Self, Self::Error> {
        let last_action = require(raw.last_action, "last_action")?;
        let position_status = require(raw.position_status, "position_status")?;

        // A fully exited position must have ended on a sell.
        if position_status == PositionStatus::FullySold && last_action != LastAction::Sell {
            return Err(EngineError::InputShape {
                reason: "position_status is fully_sold but last_action is not sell".into(),
            });
        }

        Ok(Self {
            name: require(raw.name, "name")?,
            wallet_address: require(raw.wallet_address, "wallet_address")?,
            avg_buy_price: require_non_negative(raw.avg_buy_price, "avg_buy_price")?,
            avg_sell_price: require_non_negative(raw.avg_sell_price, "avg_sell_price")?,
            avg_hold_time_seconds: require_non_negative(
                raw.avg_hold_time_seconds,
                "avg_hold_time_seconds",
            )?,
            first_buy_at: require(raw.first_buy_at, "first_buy_at")?,
            last_action,
            position_status,
            realized_pnl_percent: require_finite(raw.realized_pnl_percent, "realized_pnl_percent")?,
            realized_pnl_sol: require_finite(raw.realized_pnl_sol, "realized_pnl_sol")?,
            total_buys: require(raw.total_buys, "total_buys")?,
            total_sells: require(raw.total_sells, "total_sells")?,
            total_volume_sol: require_non_negative(raw.total_volume_sol, "total_volume_sol")?,
        })
    }
}

impl TokenActivity {
    /// Validate a raw token record.
    ///
    /// Malformed buyer sub-records are dropped with a warning — one bad KOL
    /// entry must not abort the token. A token missing its own required
    /// fields is an error for the caller to skip.
    pub fn from_raw(raw: RawTokenActivity) -> Result<Self, EngineError> {
        let token_address = require(raw.token_address, "token_address")?;

        let mut kol_buyers = Vec::with_capacity(raw.kol_buyers.len());
        for raw_buyer in raw.kol_buyers {
            match KolBuyer::try_from(raw_buyer) {
                Ok(buyer) => kol_buyers.push(buyer),
                Err(e) => {
                    tracing::warn!(token = %token_address, error = %e, "skipping malformed KOL sub-record");
                }
            }
        }

        Ok(Self {
            token_address,
            name: require(raw.name, "name")?,
            symbol: require(raw.symbol, "symbol")?,
            kols_count: require(raw.kols_count, "kols_count")?,
            first_kol_buy: require(raw.first_kol_buy, "first_kol_buy")?,
            last_kol_buy: require(raw.last_kol_buy, "last_kol_buy")?,
            kol_buyers,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
