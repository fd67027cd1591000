/// Meter power balance.
pub mod balance;
pub mod cost;
pub mod optimizer;
/// Time-of-day windows and price signal construction.
pub mod tariff;
pub mod types;

pub use cost::{CostBreakdown, DispatchSummary};
pub use optimizer::DispatchOptimizer;
pub use types::{BatteryParams, DispatchSchedule, GridLimits, PriceSignal, TerminalSoc};
