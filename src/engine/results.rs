//! Result structures emitted by the simulation
//!
//! A `MonthResult` records every flow that occurred in one month; twelve of
//! them plus the December tax settlement form an `AnnualResult`; a full run
//! (or ensemble) forms a `SimulationResult`. Results are produced by value
//! and never share references with engine state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::plan::{SimulationMode, SpendingType, YearMonth};
use crate::tax::TaxResult;

/// Why an account balance changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaReason {
    Growth,
    Dividend,
    Fee,
    Contribution,
    EmployerMatch,
    TransferIn,
    TransferOut,
    ConversionIn,
    ConversionOut,
    Rmd,
    Withdrawal,
    Deposit,
    SaleProceeds,
    AssetPurchase,
    TaxSettlement,
}

/// A labeled per-account balance change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDelta {
    pub account: String,
    pub reason: DeltaReason,
    pub amount: f64,
}

/// One income payment received during the month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub name: String,
    pub amount: f64,
}

/// One contribution leg, with any employer match deposited alongside
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub name: String,
    pub destination: String,
    pub amount: f64,
    pub employer_match: f64,
}

/// One transfer leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub name: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    /// Portion added to ordinary income (traditional -> Roth style moves)
    pub taxable: f64,
}

/// One Roth conversion leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub name: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
}

/// Required distribution taken from one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmdRecord {
    pub account: String,
    pub amount: f64,
}

/// A shortfall-driven withdrawal from one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub account: String,
    pub amount: f64,
    /// Portion taxed as ordinary income
    pub ordinary_income: f64,
    /// Realized long-term gain portion
    pub taxable_gain: f64,
    /// Amount subject to the 10% early-withdrawal penalty
    pub penalized: f64,
}

/// Healthcare cost breakdown for the month (all household members)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HealthcareBreakdown {
    pub premiums: f64,
    pub out_of_pocket: f64,
    pub irmaa: f64,
}

impl HealthcareBreakdown {
    pub fn total(&self) -> f64 {
        self.premiums + self.out_of_pocket + self.irmaa
    }
}

/// Expenses for the month, by category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExpenseBreakdown {
    pub essential: f64,
    pub discretionary: f64,
    pub healthcare: f64,
    pub property_tax: f64,
    pub maintenance: f64,
    pub mortgage: f64,
}

impl ExpenseBreakdown {
    pub fn total(&self) -> f64 {
        self.essential
            + self.discretionary
            + self.healthcare
            + self.property_tax
            + self.maintenance
            + self.mortgage
    }

    pub fn add_spending(&mut self, spending_type: SpendingType, amount: f64) {
        match spending_type {
            SpendingType::Essential => self.essential += amount,
            SpendingType::Discretionary => self.discretionary += amount,
        }
    }
}

/// Record of every flow during one calendar month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthResult {
    pub month: YearMonth,
    pub primary_age_months: u32,
    pub spouse_age_months: Option<u32>,

    pub incomes: Vec<IncomeRecord>,
    pub total_income: f64,
    pub fica_withheld: f64,
    pub tax_withheld: f64,

    pub contributions: Vec<ContributionRecord>,
    pub transfers: Vec<TransferRecord>,
    pub conversions: Vec<ConversionRecord>,
    pub rmds: Vec<RmdRecord>,
    pub account_deltas: Vec<AccountDelta>,

    /// Dividends paid out to cash (reinvested dividends appear as deltas)
    pub dividends_to_cash: f64,

    pub expenses: ExpenseBreakdown,
    pub healthcare: HealthcareBreakdown,
    pub withdrawals: Vec<WithdrawalRecord>,

    /// December settlement against withholding: positive owed, negative refund
    pub tax_settlement: Option<f64>,
    /// Expenses or tax that could not be paid this month
    pub unpaid: f64,
    pub insolvent: bool,

    pub cash_balance: f64,
    pub net_worth: f64,
}

impl MonthResult {
    pub fn new(month: YearMonth) -> Self {
        Self {
            month,
            primary_age_months: 0,
            spouse_age_months: None,
            incomes: Vec::new(),
            total_income: 0.0,
            fica_withheld: 0.0,
            tax_withheld: 0.0,
            contributions: Vec::new(),
            transfers: Vec::new(),
            conversions: Vec::new(),
            rmds: Vec::new(),
            account_deltas: Vec::new(),
            dividends_to_cash: 0.0,
            expenses: ExpenseBreakdown::default(),
            healthcare: HealthcareBreakdown::default(),
            withdrawals: Vec::new(),
            tax_settlement: None,
            unpaid: 0.0,
            insolvent: false,
            cash_balance: 0.0,
            net_worth: 0.0,
        }
    }
}

/// One calendar year of results plus the December settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualResult {
    pub year: i32,
    pub months: Vec<MonthResult>,
    pub tax: TaxResult,
    /// MAGI recorded for future IRMAA lookback
    pub magi: f64,
    pub end_balances: BTreeMap<String, f64>,
    pub net_worth: f64,
}

impl AnnualResult {
    pub fn total_income(&self) -> f64 {
        self.months.iter().map(|m| m.total_income).sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.months.iter().map(|m| m.expenses.total()).sum()
    }

    pub fn any_insolvent(&self) -> bool {
        self.months.iter().any(|m| m.insolvent)
    }
}

/// Percentile series (one value per projection year) for one statistic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bands {
    pub p10: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub p90: Vec<f64>,
}

/// Percentile bands across an ensemble of runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileBands {
    pub years: Vec<i32>,
    pub net_worth: Bands,
    pub income: Bands,
    pub expenses: Bands,
    pub taxes: Bands,
}

/// Compact per-run summary kept for every ensemble member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_index: usize,
    pub final_net_worth: f64,
    pub insolvent: bool,
}

/// Run-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMetadata {
    pub mode: SimulationMode,
    pub runs: usize,
    pub seed: u64,
    pub insolvent_runs: usize,
    /// First insolvent year of the representative trajectory, if any
    pub first_insolvent_year: Option<i32>,
    pub warnings: usize,
}

/// Complete output of a simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub metadata: SimulationMetadata,
    /// The deterministic trajectory, or the median run of an ensemble
    pub annual: Vec<AnnualResult>,
    /// Per-run summaries (empty in deterministic mode)
    pub runs: Vec<RunSummary>,
    /// 10/25/50/75/90 bands (ensemble modes only)
    pub percentiles: Option<PercentileBands>,
    /// Fraction of runs ending with positive net worth (ensemble modes only)
    pub success_rate: Option<f64>,
}
