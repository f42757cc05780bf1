//! The monthly simulation engine and its supporting state

pub mod assets;
pub mod basis;
pub mod monthly;
pub mod results;
pub mod state;
pub mod withdrawals;

pub use basis::CostBasis;
pub use monthly::{AnnualMarket, MonthOutcome, MonthlyEngine};
pub use results::{
    AnnualResult, Bands, MonthResult, PercentileBands, RunSummary, SimulationMetadata,
    SimulationResult,
};
pub use state::PlanState;
