//! Household financial-planning simulation engine
//!
//! This library provides:
//! - A month-by-month projection engine over a household's accounts, cash
//!   flows, real assets, and retirement features
//! - A full annual tax engine: federal ordinary, capital gains, NIIT, AMT,
//!   state, payroll, and early-withdrawal penalties, settled against
//!   withholding every December
//! - Social Security, RMD, Roth-conversion, and Medicare/IRMAA modeling
//! - Deterministic, Monte-Carlo, and historical-replay projection modes
//!   with seeded reproducibility and percentile aggregation

pub mod engine;
pub mod error;
pub mod plan;
pub mod retirement;
pub mod simulation;
pub mod tax;

// Re-export commonly used types
pub use engine::{AnnualResult, MonthResult, MonthlyEngine, PlanState, SimulationResult};
pub use error::PlanError;
pub use plan::{Plan, SimulationMode};
pub use simulation::{run_simulation, run_simulation_with_cancel};
pub use tax::{TaxResult, TaxTables};
