//! Plan input data structures matching the validated household schema
//!
//! Everything here is immutable once validation has passed. The simulation
//! engine owns its own mutable state (`PlanState`) built from these inputs.

use serde::{Deserialize, Serialize};

/// A calendar year-month pair. All plan dates are month-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Total months since year 0, for ordering and distance arithmetic
    fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Signed number of months from `earlier` to `self`
    pub fn months_since(&self, earlier: YearMonth) -> i64 {
        self.index() - earlier.index()
    }

    /// Whole years elapsed from `earlier` to `self` (floored, never negative)
    pub fn whole_years_since(&self, earlier: YearMonth) -> u32 {
        (self.months_since(earlier).max(0) / 12) as u32
    }

    /// The month `n` months after this one
    pub fn plus_months(&self, n: i64) -> YearMonth {
        let idx = self.index() + n;
        YearMonth {
            year: idx.div_euclid(12) as i32,
            month: (idx.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn is_december(&self) -> bool {
        self.month == 12
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// An age expressed in whole years and months (e.g. FRA of 67y 0m)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeSpec {
    pub years: u32,
    #[serde(default)]
    pub months: u32,
}

impl AgeSpec {
    pub fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }
}

/// Federal filing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    Single,
    /// Married filing jointly
    Mfj,
    /// Married filing separately
    Mfs,
    /// Head of household
    Hoh,
    /// Qualifying surviving spouse
    Qss,
}

impl FilingStatus {
    /// Statuses that use the married-jointly schedule where a table only
    /// distinguishes single/married
    pub fn uses_joint_schedule(&self) -> bool {
        matches!(self, FilingStatus::Mfj | FilingStatus::Qss)
    }
}

/// Kind of financial account, which determines tax treatment of withdrawals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "taxable_brokerage")]
    TaxableBrokerage,
    #[serde(rename = "401k")]
    Traditional401k,
    #[serde(rename = "traditional_ira")]
    TraditionalIra,
    #[serde(rename = "roth_ira")]
    RothIra,
    #[serde(rename = "hsa")]
    Hsa,
    #[serde(rename = "529")]
    CollegeSavings,
    #[serde(rename = "other")]
    Other,
}

impl AccountKind {
    /// Withdrawals are ordinary income (tax-deferred accounts)
    pub fn is_tax_deferred(&self) -> bool {
        matches!(self, AccountKind::Traditional401k | AccountKind::TraditionalIra)
    }

    /// Average cost basis is tracked for these accounts
    pub fn tracks_basis(&self) -> bool {
        matches!(self, AccountKind::TaxableBrokerage)
    }

    /// Qualified withdrawals are tax-free
    pub fn is_tax_free(&self) -> bool {
        matches!(
            self,
            AccountKind::RothIra | AccountKind::Hsa | AccountKind::CollegeSavings
        )
    }
}

/// Who owns an account or receives a cash flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Primary,
    Spouse,
    Joint,
}

/// How often a cash flow item recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Annual,
    OneTime,
}

/// How an amount changes over the years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Constant nominal amount
    Fixed,
    /// Grows by `change_rate` per year
    Increase,
    /// Shrinks by `change_rate` per year
    Decrease,
    /// Grows with the plan inflation rate
    MatchInflation,
    /// Grows at inflation + `change_rate`
    InflationPlus,
    /// Grows at inflation - `change_rate`
    InflationMinus,
}

impl ChangePolicy {
    /// Whether this policy requires an explicit `change_rate`
    pub fn needs_rate(&self) -> bool {
        matches!(
            self,
            ChangePolicy::Increase
                | ChangePolicy::Decrease
                | ChangePolicy::InflationPlus
                | ChangePolicy::InflationMinus
        )
    }

    /// Annual growth rate under this policy
    pub fn annual_rate(&self, inflation: f64, change_rate: f64) -> f64 {
        match self {
            ChangePolicy::Fixed => 0.0,
            ChangePolicy::Increase => change_rate,
            ChangePolicy::Decrease => -change_rate,
            ChangePolicy::MatchInflation => inflation,
            ChangePolicy::InflationPlus => inflation + change_rate,
            ChangePolicy::InflationMinus => inflation - change_rate,
        }
    }

    /// Amount after `years` whole years of this policy
    pub fn apply(&self, base: f64, inflation: f64, change_rate: f64, years: u32) -> f64 {
        base * (1.0 + self.annual_rate(inflation, change_rate)).powi(years as i32)
    }
}

/// Tax treatment of a flow (transfer leg, dividend, transaction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxTreatment {
    TaxFree,
    /// Taxed as ordinary income
    Income,
    /// Taxed as long-term capital gains
    CapitalGains,
}

/// Expense classification for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingType {
    Essential,
    Discretionary,
}

/// How income tax is handled for an income item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxHandling {
    /// `withhold_percent` of each payment is withheld monthly
    Withhold,
    /// Taxed at settlement with no withholding
    Settle,
    /// Not subject to income tax
    TaxFree,
}

/// Classification of an income item for payroll tax purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeKind {
    /// W-2 wages, subject to employee FICA
    Wages,
    /// Self-employment income, subject to SE tax
    SelfEmployment,
    /// Pensions, rents, annuities - no payroll tax
    Other,
}

fn default_true() -> bool {
    true
}

/// A person in the household
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Person {
    pub name: String,
    pub birth_date: YearMonth,
}

impl Person {
    /// Age in whole months at the given calendar month
    pub fn age_months(&self, at: YearMonth) -> u32 {
        at.months_since(self.birth_date).max(0) as u32
    }

    /// Age in whole years at the given calendar month
    pub fn age_years(&self, at: YearMonth) -> u32 {
        self.age_months(at) / 12
    }
}

/// A financial account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    /// Unique name; referenced by contributions, transfers, withdrawals
    pub name: String,
    pub kind: AccountKind,
    pub owner: Owner,
    pub balance: f64,

    /// Required for taxable brokerage, absent otherwise
    #[serde(default)]
    pub cost_basis: Option<f64>,

    /// Annual growth rate as a decimal (deterministic mode)
    #[serde(default)]
    pub growth_rate: f64,

    /// Annual dividend yield as a decimal
    #[serde(default)]
    pub dividend_rate: f64,

    /// Annual fee rate as a decimal
    #[serde(default)]
    pub fee_rate: f64,

    /// Percent of the account allocated to bonds (0-100), for ensemble modes
    #[serde(default)]
    pub bond_percent: f64,

    /// Whether the withdrawal strategy may drain this account
    #[serde(default = "default_true")]
    pub allow_withdrawals: bool,

    /// Whether dividends are reinvested (otherwise paid to cash)
    #[serde(default = "default_true")]
    pub reinvest_dividends: bool,

    /// Overrides `settings.default_dividend_tax_treatment` when set
    #[serde(default)]
    pub dividend_tax_treatment: Option<TaxTreatment>,
}

impl Account {
    pub fn bond_share(&self) -> f64 {
        (self.bond_percent / 100.0).clamp(0.0, 1.0)
    }
}

/// An income stream (salary, pension, rent)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Income {
    pub name: String,
    pub owner: Owner,
    /// Amount per period: monthly amount, annual amount, or one-time amount
    pub amount: f64,
    pub frequency: Frequency,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
    #[serde(default = "Income::default_change")]
    pub change_policy: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
    #[serde(default = "Income::default_kind")]
    pub kind: IncomeKind,
    #[serde(default = "Income::default_handling")]
    pub tax_handling: TaxHandling,
    /// Required when `tax_handling` is `withhold`
    #[serde(default)]
    pub withhold_percent: Option<f64>,
}

impl Income {
    fn default_change() -> ChangePolicy {
        ChangePolicy::MatchInflation
    }
    fn default_kind() -> IncomeKind {
        IncomeKind::Wages
    }
    fn default_handling() -> TaxHandling {
        TaxHandling::Withhold
    }
}

/// A recurring or one-time expense
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expense {
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
    #[serde(default = "Expense::default_change")]
    pub change_policy: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
    #[serde(default = "Expense::default_spending")]
    pub spending_type: SpendingType,
}

impl Expense {
    fn default_change() -> ChangePolicy {
        ChangePolicy::MatchInflation
    }
    fn default_spending() -> SpendingType {
        SpendingType::Essential
    }
}

/// Sentinel account name meaning "deduct from gross income before it
/// reaches cash" (payroll-sourced contributions)
pub const INCOME_SOURCE: &str = "income";

/// Employer match terms attached to a payroll contribution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployerMatch {
    /// Fraction of the employee contribution matched (e.g. 0.5)
    pub match_percent: f64,
    /// Cap expressed as a fraction of the referenced salary (e.g. 0.06)
    pub up_to_percent_of_salary: f64,
    /// Name of the income item whose salary the cap references
    pub salary_income: String,
}

/// A contribution from a source account (or payroll) into a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contribution {
    pub name: String,
    /// Account name, or `"income"` for payroll-sourced
    pub source_account: String,
    pub destination_account: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
    #[serde(default = "Contribution::default_change")]
    pub change_policy: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
    #[serde(default)]
    pub employer_match: Option<EmployerMatch>,
}

impl Contribution {
    fn default_change() -> ChangePolicy {
        ChangePolicy::Fixed
    }

    pub fn is_payroll(&self) -> bool {
        self.source_account == INCOME_SOURCE
    }
}

/// A recurring transfer between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transfer {
    pub name: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
    #[serde(default = "Transfer::default_change")]
    pub change_policy: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
    /// `income` makes the gross amount taxable (e.g. traditional -> Roth)
    #[serde(default = "Transfer::default_tax")]
    pub tax_treatment: TaxTreatment,
}

impl Transfer {
    fn default_change() -> ChangePolicy {
        ChangePolicy::Fixed
    }
    fn default_tax() -> TaxTreatment {
        TaxTreatment::TaxFree
    }
}

/// One-time scheduled transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    SellAsset,
    BuyAsset,
    Transfer,
    Other,
}

/// A transaction scheduled for a specific month
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub name: String,
    pub kind: TransactionKind,
    pub date: YearMonth,
    /// Account credited (sell) or debited (buy/other)
    pub account: String,
    pub amount: f64,
    #[serde(default)]
    pub fees: f64,
    /// Real-asset name for sell_asset / buy_asset
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default = "Transaction::default_tax")]
    pub tax_treatment: TaxTreatment,
}

impl Transaction {
    fn default_tax() -> TaxTreatment {
        TaxTreatment::CapitalGains
    }
}

/// Mortgage attached to a real asset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mortgage {
    pub monthly_payment: f64,
    pub remaining_balance: f64,
    /// Annual interest rate as a decimal
    pub interest_rate: f64,
    pub end_date: YearMonth,
}

/// Recurring upkeep cost tied to a real asset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceItem {
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    #[serde(default = "MaintenanceItem::default_change")]
    pub change_policy: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
}

impl MaintenanceItem {
    fn default_change() -> ChangePolicy {
        ChangePolicy::MatchInflation
    }
}

/// A house, land, or other real asset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RealAsset {
    /// Unique name; referenced by sell_asset transactions
    pub name: String,
    pub value: f64,
    /// Required when a sell_asset transaction links to this asset
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub primary_residence: bool,
    #[serde(default = "RealAsset::default_change")]
    pub change_policy: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
    /// Annual property tax as a fraction of current value
    #[serde(default)]
    pub property_tax_rate: f64,
    #[serde(default)]
    pub mortgage: Option<Mortgage>,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceItem>,
}

impl RealAsset {
    fn default_change() -> ChangePolicy {
        ChangePolicy::MatchInflation
    }
}

/// Household tax configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxConfig {
    pub filing_status: FilingStatus,
    /// Two-letter state code, e.g. "CA"
    pub state: String,
    /// Replaces the state bracket computation with a flat rate
    #[serde(default)]
    pub state_rate_override: Option<f64>,
    #[serde(default = "default_true")]
    pub niit_enabled: bool,
    #[serde(default = "default_true")]
    pub amt_enabled: bool,
    /// Annual charitable contributions, itemizable
    #[serde(default)]
    pub charitable_annual: f64,
}

/// Social Security benefit configuration for one person
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialSecurityConfig {
    pub owner: Owner,
    /// Monthly Primary Insurance Amount at Full Retirement Age
    pub monthly_pia: f64,
    #[serde(default = "SocialSecurityConfig::default_fra")]
    pub full_retirement_age: AgeSpec,
    /// Age at which benefits are claimed
    pub claim_age: AgeSpec,
    /// Annual cost-of-living adjustment assumption
    #[serde(default = "SocialSecurityConfig::default_cola")]
    pub cola_assumption: f64,
}

impl SocialSecurityConfig {
    fn default_fra() -> AgeSpec {
        AgeSpec { years: 67, months: 0 }
    }
    fn default_cola() -> f64 {
        0.025
    }
}

/// Required Minimum Distribution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RmdConfig {
    pub owner: Owner,
    /// Tax-deferred accounts subject to RMD
    pub accounts: Vec<String>,
    pub destination_account: String,
    #[serde(default = "RmdConfig::default_start_age")]
    pub start_age: u32,
    /// Satisfy the RMD before any shortfall-driven withdrawal
    #[serde(default = "default_true")]
    pub satisfied_first: bool,
}

impl RmdConfig {
    fn default_start_age() -> u32 {
        73
    }
}

/// Roth conversion strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RothStrategy {
    /// Convert `annual_amount / 12` every month
    Fixed { annual_amount: f64 },
    /// In December, convert up to the top of the named bracket (e.g. "22%")
    FillBracket { bracket: String },
}

/// A Roth conversion schedule from a traditional account into a Roth account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RothConversion {
    pub name: String,
    pub source_account: String,
    pub destination_account: String,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
    pub strategy: RothStrategy,
}

/// Health insurance prior to Medicare eligibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreMedicarePolicy {
    pub monthly_premium: f64,
    #[serde(default)]
    pub annual_out_of_pocket: f64,
    #[serde(default = "HealthcarePlan::default_change")]
    pub change_over_time: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
}

/// Medicare cost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicareConfig {
    pub part_b: f64,
    #[serde(default)]
    pub supplement: f64,
    #[serde(default)]
    pub part_d: f64,
    #[serde(default)]
    pub annual_out_of_pocket: f64,
    /// Years of MAGI lookback for the IRMAA surcharge
    #[serde(default = "MedicareConfig::default_lookback")]
    pub irmaa_lookback_years: u32,
    #[serde(default = "HealthcarePlan::default_change")]
    pub change_over_time: ChangePolicy,
    #[serde(default)]
    pub change_rate: Option<f64>,
}

impl MedicareConfig {
    fn default_lookback() -> u32 {
        2
    }
}

/// Healthcare cost plan for one person
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthcarePlan {
    pub owner: Owner,
    #[serde(default)]
    pub pre_medicare: Option<PreMedicarePolicy>,
    /// Medicare begins here if earlier than the month of turning 65
    #[serde(default)]
    pub medicare_start_date: Option<YearMonth>,
    #[serde(default)]
    pub medicare: Option<MedicareConfig>,
}

impl HealthcarePlan {
    fn default_change() -> ChangePolicy {
        ChangePolicy::MatchInflation
    }
}

/// Account drain order for covering shortfalls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawalStrategy {
    /// Drain by explicit account names instead of by kind
    #[serde(default)]
    pub use_account_specific: bool,
    /// Account-name order (when `use_account_specific`)
    #[serde(default)]
    pub account_order: Vec<String>,
    /// Account-kind order (otherwise)
    #[serde(default = "WithdrawalStrategy::default_kind_order")]
    pub kind_order: Vec<AccountKind>,
}

impl WithdrawalStrategy {
    fn default_kind_order() -> Vec<AccountKind> {
        vec![
            AccountKind::Cash,
            AccountKind::TaxableBrokerage,
            AccountKind::Traditional401k,
            AccountKind::TraditionalIra,
            AccountKind::RothIra,
            AccountKind::Hsa,
            AccountKind::Other,
        ]
    }
}

impl Default for WithdrawalStrategy {
    fn default() -> Self {
        Self {
            use_account_specific: false,
            account_order: Vec::new(),
            kind_order: Self::default_kind_order(),
        }
    }
}

/// Global plan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanSettings {
    pub plan_start: YearMonth,
    pub plan_end: YearMonth,
    /// Annual inflation assumption as a decimal
    pub inflation_rate: f64,
    #[serde(default = "PlanSettings::default_dividend_tax")]
    pub default_dividend_tax_treatment: TaxTreatment,
}

impl PlanSettings {
    fn default_dividend_tax() -> TaxTreatment {
        TaxTreatment::CapitalGains
    }
}

/// Projection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    Deterministic,
    MonteCarlo,
    Historical,
}

/// Monte-Carlo return distribution parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonteCarloParams {
    pub stock_mean: f64,
    pub stock_std: f64,
    pub bond_mean: f64,
    pub bond_std: f64,
    /// Stock/bond correlation in [-1, 1]
    pub correlation: f64,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        // Long-run US annual return assumptions
        Self {
            stock_mean: 0.10,
            stock_std: 0.16,
            bond_mean: 0.04,
            bond_std: 0.05,
            correlation: -0.1,
        }
    }
}

/// Historical-replay parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoricalParams {
    /// Sample a contiguous window per run instead of independent years
    #[serde(default = "default_true")]
    pub use_rolling_periods: bool,
}

impl Default for HistoricalParams {
    fn default() -> Self {
        Self {
            use_rolling_periods: true,
        }
    }
}

fn default_runs() -> usize {
    1000
}

/// Simulation mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    #[serde(default = "SimulationSettings::default_mode")]
    pub mode: SimulationMode,
    /// Runs per ensemble (ignored in deterministic mode)
    #[serde(default = "default_runs")]
    pub runs: usize,
    #[serde(default)]
    pub monte_carlo: MonteCarloParams,
    #[serde(default)]
    pub historical: HistoricalParams,
}

impl SimulationSettings {
    fn default_mode() -> SimulationMode {
        SimulationMode::Deterministic
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            mode: SimulationMode::Deterministic,
            runs: default_runs(),
            monte_carlo: MonteCarloParams::default(),
            historical: HistoricalParams::default(),
        }
    }
}

/// The complete household plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub primary: Person,
    #[serde(default)]
    pub spouse: Option<Person>,
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub real_assets: Vec<RealAsset>,
    pub taxes: TaxConfig,
    #[serde(default)]
    pub social_security: Vec<SocialSecurityConfig>,
    #[serde(default)]
    pub rmds: Option<RmdConfig>,
    #[serde(default)]
    pub roth_conversions: Vec<RothConversion>,
    #[serde(default)]
    pub healthcare: Vec<HealthcarePlan>,
    #[serde(default)]
    pub withdrawal_strategy: WithdrawalStrategy,
    pub settings: PlanSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl Plan {
    /// Parse a plan from JSON. Unknown keys are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn person(&self, owner: Owner) -> Option<&Person> {
        match owner {
            Owner::Primary | Owner::Joint => Some(&self.primary),
            Owner::Spouse => self.spouse.as_ref(),
        }
    }

    /// Months in the projection horizon, inclusive of both endpoints
    pub fn horizon_months(&self) -> u32 {
        (self
            .settings
            .plan_end
            .months_since(self.settings.plan_start)
            .max(0) as u32)
            + 1
    }

    pub fn horizon_years(&self) -> u32 {
        self.settings.plan_end.year.saturating_sub(self.settings.plan_start.year) as u32 + 1
    }
}

/// Per-month amount of a cash-flow item, shared by income/expense/etc.
///
/// Annual amounts are spread evenly; one-time amounts land in the start
/// month only.
pub fn monthly_amount(
    amount: f64,
    frequency: Frequency,
    start: YearMonth,
    end: YearMonth,
    change_policy: ChangePolicy,
    change_rate: Option<f64>,
    inflation: f64,
    current: YearMonth,
) -> f64 {
    // One-time amounts fire at the start month regardless of the window
    if frequency == Frequency::OneTime {
        return if current == start { amount } else { 0.0 };
    }
    if current < start || current > end {
        return 0.0;
    }
    let years = current.whole_years_since(start);
    let grown = change_policy.apply(amount, inflation, change_rate.unwrap_or(0.0), years);
    match frequency {
        Frequency::Monthly => grown,
        Frequency::Annual => grown / 12.0,
        Frequency::OneTime => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_arithmetic() {
        let a = YearMonth::new(2026, 3);
        let b = YearMonth::new(2024, 11);
        assert_eq!(a.months_since(b), 16);
        assert_eq!(a.whole_years_since(b), 1);
        assert_eq!(b.plus_months(16), a);
        assert_eq!(YearMonth::new(2024, 12).plus_months(1), YearMonth::new(2025, 1));
        assert!(YearMonth::new(2024, 12).is_december());
    }

    #[test]
    fn test_change_policy_rates() {
        let base = 1000.0;
        assert_eq!(ChangePolicy::Fixed.apply(base, 0.03, 0.0, 5), 1000.0);
        let inflated = ChangePolicy::MatchInflation.apply(base, 0.03, 0.0, 2);
        assert!((inflated - 1000.0 * 1.03_f64.powi(2)).abs() < 1e-9);
        let plus = ChangePolicy::InflationPlus.apply(base, 0.03, 0.01, 1);
        assert!((plus - 1040.0).abs() < 1e-9);
        let dec = ChangePolicy::Decrease.apply(base, 0.03, 0.10, 1);
        assert!((dec - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_amount_windows() {
        let start = YearMonth::new(2025, 1);
        let end = YearMonth::new(2027, 12);
        // Annual salary spread across months
        let m = monthly_amount(
            120_000.0,
            Frequency::Annual,
            start,
            end,
            ChangePolicy::Fixed,
            None,
            0.03,
            YearMonth::new(2025, 6),
        );
        assert!((m - 10_000.0).abs() < 1e-9);

        // Inactive outside the window
        let outside = monthly_amount(
            120_000.0,
            Frequency::Annual,
            start,
            end,
            ChangePolicy::Fixed,
            None,
            0.03,
            YearMonth::new(2028, 1),
        );
        assert_eq!(outside, 0.0);

        // One-time lands only in the start month
        let once = monthly_amount(
            5_000.0,
            Frequency::OneTime,
            start,
            end,
            ChangePolicy::Fixed,
            None,
            0.03,
            start,
        );
        assert_eq!(once, 5_000.0);
        let later = monthly_amount(
            5_000.0,
            Frequency::OneTime,
            start,
            end,
            ChangePolicy::Fixed,
            None,
            0.03,
            YearMonth::new(2025, 2),
        );
        assert_eq!(later, 0.0);
    }

    #[test]
    fn test_account_kind_classification() {
        assert!(AccountKind::TraditionalIra.is_tax_deferred());
        assert!(AccountKind::Traditional401k.is_tax_deferred());
        assert!(AccountKind::TaxableBrokerage.tracks_basis());
        assert!(AccountKind::RothIra.is_tax_free());
        assert!(!AccountKind::Cash.is_tax_deferred());
    }
}
