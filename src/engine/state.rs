//! Mutable simulation state for a single run
//!
//! `PlanState` exclusively owns every account balance, cost basis, real
//! asset, and year-to-date accumulator for the duration of one run. The
//! monthly engine is the only mutator.

use std::collections::BTreeMap;

use crate::engine::assets::RealAssetState;
use crate::engine::basis::CostBasis;
use crate::plan::{Account, AccountKind, Owner, Plan, TaxTreatment, YearMonth};

/// Mutable per-account state
#[derive(Debug, Clone)]
pub struct AccountState {
    pub name: String,
    pub kind: AccountKind,
    pub owner: Owner,
    pub balance: f64,
    pub growth_rate: f64,
    pub dividend_rate: f64,
    pub fee_rate: f64,
    pub bond_share: f64,
    pub allow_withdrawals: bool,
    pub reinvest_dividends: bool,
    /// Resolved dividend treatment (account override or plan default)
    pub dividend_tax: TaxTreatment,
}

impl AccountState {
    fn from_input(account: &Account, default_dividend_tax: TaxTreatment) -> Self {
        Self {
            name: account.name.clone(),
            kind: account.kind,
            owner: account.owner,
            balance: account.balance,
            growth_rate: account.growth_rate,
            dividend_rate: account.dividend_rate,
            fee_rate: account.fee_rate,
            bond_share: account.bond_share(),
            allow_withdrawals: account.allow_withdrawals,
            reinvest_dividends: account.reinvest_dividends,
            dividend_tax: account
                .dividend_tax_treatment
                .unwrap_or(default_dividend_tax),
        }
    }
}

/// Year-to-date accumulators, reset at every December boundary
#[derive(Debug, Clone, Default)]
pub struct YtdAccumulators {
    /// Wages per person, for the Social Security wage base
    pub wages_primary: f64,
    pub wages_spouse: f64,
    /// Household wages, for the Additional Medicare threshold
    pub household_wages: f64,

    /// Ordinary income (wages, taxable interest, conversions, withdrawals,
    /// taxable Social Security once included in December)
    pub ordinary_income: f64,
    /// Gross Social Security received; its taxable share joins
    /// `ordinary_income` in December
    pub ss_gross: f64,
    pub long_term_gains: f64,
    pub investment_income: f64,
    pub tax_exempt_interest: f64,
    pub roth_conversion_income: f64,
    pub penalized_withdrawals: f64,

    pub tax_withheld: f64,
    pub fica_withheld: f64,

    /// Itemizable amounts accrued during the year
    pub state_local_taxes_paid: f64,
    pub mortgage_interest_paid: f64,
}

/// Complete mutable state threaded through the monthly engine
#[derive(Debug, Clone)]
pub struct PlanState {
    pub current: YearMonth,
    pub primary_age_months: u32,
    pub spouse_age_months: Option<u32>,

    pub accounts: BTreeMap<String, AccountState>,
    /// Average-cost basis per taxable account
    pub basis: BTreeMap<String, CostBasis>,
    /// Cumulative contributions per Roth account, for the early-withdrawal
    /// earnings approximation
    pub roth_contributions: BTreeMap<String, f64>,
    pub real_assets: Vec<RealAssetState>,

    pub ytd: YtdAccumulators,
    /// MAGI by calendar year, for the IRMAA lookback window
    pub magi_by_year: BTreeMap<i32, f64>,
    /// Balances at the end of the prior calendar year, for RMDs
    pub prior_year_end_balances: BTreeMap<String, f64>,

    /// Name of the account that receives income and pays expenses
    pub primary_cash: String,
    /// Raised on the first month a shortfall cannot be covered
    pub insolvent: bool,
}

impl PlanState {
    /// Build initial state from a validated plan
    pub fn from_plan(plan: &Plan) -> Self {
        let default_dividend_tax = plan.settings.default_dividend_tax_treatment;
        let mut accounts = BTreeMap::new();
        let mut basis = BTreeMap::new();
        let mut roth_contributions = BTreeMap::new();
        let mut primary_cash = None;

        for account in &plan.accounts {
            if account.kind == AccountKind::Cash && primary_cash.is_none() {
                primary_cash = Some(account.name.clone());
            }
            if let Some(cost_basis) = account.cost_basis {
                basis.insert(account.name.clone(), CostBasis::new(cost_basis));
            }
            if account.kind == AccountKind::RothIra {
                // Opening balance counts as contributions under the
                // average-basis simplification
                roth_contributions.insert(account.name.clone(), account.balance);
            }
            accounts.insert(
                account.name.clone(),
                AccountState::from_input(account, default_dividend_tax),
            );
        }

        let prior_year_end_balances = accounts
            .iter()
            .map(|(name, a)| (name.clone(), a.balance))
            .collect();

        let start = plan.settings.plan_start;
        Self {
            current: start,
            primary_age_months: plan.primary.age_months(start),
            spouse_age_months: plan.spouse.as_ref().map(|s| s.age_months(start)),
            accounts,
            basis,
            roth_contributions,
            real_assets: plan
                .real_assets
                .iter()
                .map(|a| RealAssetState::from_input(a, start))
                .collect(),
            ytd: YtdAccumulators::default(),
            magi_by_year: BTreeMap::new(),
            prior_year_end_balances,
            // Validation guarantees a cash account; fall back to the first
            // account so a malformed state still fails soft
            primary_cash: primary_cash.unwrap_or_else(|| {
                plan.accounts
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_default()
            }),
            insolvent: false,
        }
    }

    pub fn cash_balance(&self) -> f64 {
        self.accounts
            .get(&self.primary_cash)
            .map(|a| a.balance)
            .unwrap_or(0.0)
    }

    pub fn credit_cash(&mut self, amount: f64) {
        if let Some(cash) = self.accounts.get_mut(&self.primary_cash) {
            cash.balance += amount;
        }
    }

    /// Deduct from cash, clamping at zero; returns the amount actually paid
    pub fn debit_cash(&mut self, amount: f64) -> f64 {
        let Some(cash) = self.accounts.get_mut(&self.primary_cash) else {
            return 0.0;
        };
        let paid = amount.min(cash.balance).max(0.0);
        cash.balance -= paid;
        paid
    }

    /// Total net worth: account balances plus real-asset equity
    pub fn net_worth(&self) -> f64 {
        let accounts: f64 = self.accounts.values().map(|a| a.balance).sum();
        let assets: f64 = self.real_assets.iter().map(|a| a.equity()).sum();
        accounts + assets
    }

    /// Age in whole months for an owner (joint resolves to primary)
    pub fn age_months(&self, owner: Owner) -> u32 {
        match owner {
            Owner::Primary | Owner::Joint => self.primary_age_months,
            Owner::Spouse => self.spouse_age_months.unwrap_or(self.primary_age_months),
        }
    }

    /// Record wages for the per-person FICA wage base counters
    pub fn add_wages(&mut self, owner: Owner, amount: f64) {
        match owner {
            Owner::Primary | Owner::Joint => self.ytd.wages_primary += amount,
            Owner::Spouse => self.ytd.wages_spouse += amount,
        }
        self.ytd.household_wages += amount;
    }

    pub fn ytd_wages(&self, owner: Owner) -> f64 {
        match owner {
            Owner::Primary | Owner::Joint => self.ytd.wages_primary,
            Owner::Spouse => self.ytd.wages_spouse,
        }
    }

    /// The ordered account names the withdrawal strategy may drain,
    /// excluding the primary cash account it refills.
    pub fn withdrawal_order(&self, plan: &Plan) -> Vec<String> {
        let strategy = &plan.withdrawal_strategy;
        let order: Vec<String> = if strategy.use_account_specific {
            strategy.account_order.clone()
        } else {
            let mut names = Vec::new();
            for kind in &strategy.kind_order {
                for account in &plan.accounts {
                    if account.kind == *kind {
                        names.push(account.name.clone());
                    }
                }
            }
            names
        };
        order
            .into_iter()
            .filter(|name| name != &self.primary_cash)
            .collect()
    }

    /// Snapshot balances for next year's RMD computation and reset the YTD
    /// accumulators. Called after December settlement.
    pub fn roll_year(&mut self) {
        self.prior_year_end_balances = self
            .accounts
            .iter()
            .map(|(name, a)| (name.clone(), a.balance))
            .collect();
        self.ytd = YtdAccumulators::default();
    }
}
