pub mod activity;
pub mod alert;
pub mod simulation;
pub mod wallet;

pub use activity::{
    KolBuyer, LastAction, PositionStatus, RawKolBuyer, RawTokenActivity, TokenActivity, TokenStats,
};
pub use alert::{AlertEvent, AlertPriority, WatchConfig};
pub use simulation::{
    DailyEquityPoint, ExitReason, FollowStrategy, KolPerformance, SimulatedTrade, SimulationConfig,
    SimulationResult,
};
pub use wallet::WalletAggregate;
