//! Validated household plan input model

pub mod data;
pub mod validate;

pub use data::{
    Account, AccountKind, AgeSpec, ChangePolicy, Contribution, EmployerMatch, Expense,
    FilingStatus, Frequency, HealthcarePlan, HistoricalParams, Income, IncomeKind,
    MaintenanceItem, MedicareConfig, MonteCarloParams, Mortgage, Owner, Person, Plan,
    PlanSettings, PreMedicarePolicy, RealAsset, RmdConfig, RothConversion, RothStrategy,
    SimulationMode, SimulationSettings, SocialSecurityConfig, SpendingType, TaxConfig,
    TaxHandling, TaxTreatment, Transaction, TransactionKind, Transfer, WithdrawalStrategy,
    YearMonth, monthly_amount,
};
pub use validate::validate;

#[cfg(test)]
pub mod test_fixtures {
    //! Shared plan builders for unit tests

    use super::data::*;

    pub fn cash_account(name: &str, balance: f64) -> Account {
        Account {
            name: name.to_string(),
            kind: AccountKind::Cash,
            owner: Owner::Joint,
            balance,
            cost_basis: None,
            growth_rate: 0.0,
            dividend_rate: 0.0,
            fee_rate: 0.0,
            bond_percent: 0.0,
            allow_withdrawals: true,
            reinvest_dividends: false,
            dividend_tax_treatment: None,
        }
    }

    pub fn account(name: &str, kind: AccountKind, balance: f64) -> Account {
        Account {
            name: name.to_string(),
            kind,
            owner: Owner::Primary,
            balance,
            cost_basis: if kind.tracks_basis() { Some(balance) } else { None },
            growth_rate: 0.0,
            dividend_rate: 0.0,
            fee_rate: 0.0,
            bond_percent: 0.0,
            allow_withdrawals: true,
            reinvest_dividends: true,
            dividend_tax_treatment: None,
        }
    }

    pub fn salary(name: &str, owner: Owner, annual: f64, start: YearMonth, end: YearMonth) -> Income {
        Income {
            name: name.to_string(),
            owner,
            amount: annual,
            frequency: Frequency::Annual,
            start_date: start,
            end_date: end,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            kind: IncomeKind::Wages,
            tax_handling: TaxHandling::Withhold,
            withhold_percent: Some(0.2),
        }
    }

    /// Two-person MFJ household with a small account spread
    pub fn minimal_plan() -> Plan {
        let start = YearMonth::new(2025, 1);
        let end = YearMonth::new(2030, 12);
        Plan {
            primary: Person {
                name: "Alex".into(),
                birth_date: YearMonth::new(1980, 6),
            },
            spouse: Some(Person {
                name: "Sam".into(),
                birth_date: YearMonth::new(1982, 3),
            }),
            accounts: vec![
                cash_account("checking", 50_000.0),
                account("brokerage", AccountKind::TaxableBrokerage, 100_000.0),
                account("401k", AccountKind::Traditional401k, 200_000.0),
                account("ira", AccountKind::TraditionalIra, 150_000.0),
                account("roth", AccountKind::RothIra, 50_000.0),
            ],
            incomes: vec![salary("salary", Owner::Primary, 120_000.0, start, end)],
            expenses: vec![Expense {
                name: "living".into(),
                amount: 5_000.0,
                frequency: Frequency::Monthly,
                start_date: start,
                end_date: end,
                change_policy: ChangePolicy::MatchInflation,
                change_rate: None,
                spending_type: SpendingType::Essential,
            }],
            contributions: Vec::new(),
            transfers: Vec::new(),
            transactions: Vec::new(),
            real_assets: Vec::new(),
            taxes: TaxConfig {
                filing_status: FilingStatus::Mfj,
                state: "CA".into(),
                state_rate_override: None,
                niit_enabled: true,
                amt_enabled: true,
                charitable_annual: 0.0,
            },
            social_security: Vec::new(),
            rmds: None,
            roth_conversions: Vec::new(),
            healthcare: Vec::new(),
            withdrawal_strategy: WithdrawalStrategy::default(),
            settings: PlanSettings {
                plan_start: start,
                plan_end: end,
                inflation_rate: 0.03,
                default_dividend_tax_treatment: TaxTreatment::CapitalGains,
            },
            simulation: SimulationSettings::default(),
        }
    }
}
