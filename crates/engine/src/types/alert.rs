use serde::{Deserialize, Serialize};

use super::activity::PositionStatus;

/// Urgency class assigned to an emitted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// One user's alert thresholds over the activity stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub user_id: String,
    /// KOL display names to watch.
    pub kol_names: Vec<String>,
    pub min_kols_count: Option<u32>,
    pub min_pnl_percent: Option<f64>,
    pub position_status: Option<PositionStatus>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A KOL-buy notification matched against a user's watch config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub user_id: String,
    pub token_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub kol_name: String,
    pub wallet_address: String,
    pub buy_price: f64,
    pub pnl_percent: f64,
    pub kols_count: u32,
    /// Unix seconds at which the alert was emitted.
    pub timestamp: i64,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
}
