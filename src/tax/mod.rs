//! Tax tables, payroll taxes, and the annual tax engine

pub mod engine;
pub mod fica;
pub mod states;
pub mod tables;

pub use engine::{compute, TaxResult, YearIncomeSummary};
pub use fica::{self_employment_tax, wage_fica, PayrollTax};
pub use tables::{TaxTables, LAST_BUNDLED_YEAR};
