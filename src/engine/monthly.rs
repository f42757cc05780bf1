//! The monthly simulation engine
//!
//! Advances `PlanState` by one calendar month and emits a `MonthResult`.
//! The order of sub-steps is normative: later steps depend on accumulators
//! populated by earlier ones (bracket-fill needs YTD ordinary income, IRMAA
//! needs the MAGI window, RMDs must precede shortfall withdrawals).

use crate::engine::assets::{sale_gain, RealAssetState};
use crate::engine::results::{
    AccountDelta, ContributionRecord, ConversionRecord, DeltaReason, IncomeRecord, MonthResult,
    RmdRecord, TransferRecord,
};
use crate::engine::state::PlanState;
use crate::engine::withdrawals::{cover_shortfall, WithdrawalOutcome};
use crate::plan::{
    monthly_amount, AccountKind, IncomeKind, Plan, TaxHandling, TaxTreatment, TransactionKind,
    YearMonth,
};
use crate::retirement::{healthcare, rmd, roth, social_security};
use crate::tax::{self, TaxResult, TaxTables, YearIncomeSummary};

/// Annual stock/bond returns for the current simulated year. Absent in
/// deterministic mode, where each account uses its fixed rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualMarket {
    pub stock: f64,
    pub bond: f64,
}

/// One month of output, plus the tax settlement at December boundaries
#[derive(Debug, Clone)]
pub struct MonthOutcome {
    pub result: MonthResult,
    pub tax: Option<TaxResult>,
}

/// Convert an annual rate to its monthly geometric equivalent. Draws below
/// -100% are clamped so the factor stays real.
fn monthly_rate(annual: f64) -> f64 {
    (1.0 + annual.max(-0.99)).powf(1.0 / 12.0) - 1.0
}

/// The monthly engine: owns the plan reference and tax tables, mutates the
/// run's `PlanState`.
pub struct MonthlyEngine<'a> {
    plan: &'a Plan,
    tables: TaxTables,
    withdrawal_order: Vec<String>,
}

impl<'a> MonthlyEngine<'a> {
    pub fn new(plan: &'a Plan) -> Self {
        let tables = TaxTables::new(plan.settings.inflation_rate);
        // The order never changes during a run; resolve it once
        let state = PlanState::from_plan(plan);
        let withdrawal_order = state.withdrawal_order(plan);
        Self {
            plan,
            tables,
            withdrawal_order,
        }
    }

    pub fn tables(&self) -> &TaxTables {
        &self.tables
    }

    /// Advance state by one calendar month
    pub fn advance_month(&self, state: &mut PlanState, market: Option<AnnualMarket>) -> MonthOutcome {
        let current = state.current;
        let mut result = MonthResult::new(current);

        // 1. Ages
        state.primary_age_months = self.plan.primary.age_months(current);
        state.spouse_age_months = self.plan.spouse.as_ref().map(|s| s.age_months(current));
        result.primary_age_months = state.primary_age_months;
        result.spouse_age_months = state.spouse_age_months;

        // 2. Income collection (Social Security included once claimed)
        self.collect_income(state, &mut result);

        // 3. Payroll taxes
        self.withhold_fica(state, &mut result);

        // 4. Income-tax withholding
        self.withhold_income_tax(state, &mut result);

        // 5-6. Payroll contributions and employer match
        self.payroll_contributions(state, &mut result);

        // 7. Other contributions
        self.other_contributions(state, &mut result);

        // 8. Recurring transfers
        self.transfers(state, &mut result);

        // 9. Roth conversions
        self.roth_conversions(state, &mut result);

        // 10. RMDs (December only), before shortfall withdrawals when
        // configured to be satisfied first
        let rmd_first = self.plan.rmds.as_ref().map(|r| r.satisfied_first).unwrap_or(true);
        if rmd_first {
            self.required_distributions(state, &mut result);
        }

        // 11-13. Growth, dividends, fees
        self.grow_accounts(state, &mut result, market);

        // 14. Real assets: appreciation, mortgage, property tax, maintenance
        self.real_assets(state, &mut result);

        // 15. Scheduled transactions
        self.transactions(state, &mut result);

        // 16. Healthcare
        self.healthcare_costs(state, &mut result);

        // 17. Other expenses
        self.regular_expenses(state, &mut result);

        // 18. Shortfall coverage
        let outflow = result.expenses.total();
        let cash = state.cash_balance();
        if cash < outflow {
            let outcome = cover_shortfall(state, &self.withdrawal_order, outflow - cash);
            self.apply_withdrawal_taxes(state, &outcome);
            for draw in &outcome.draws {
                result.account_deltas.push(AccountDelta {
                    account: draw.account.clone(),
                    reason: DeltaReason::Withdrawal,
                    amount: -draw.amount,
                });
            }
            result.withdrawals.extend(outcome.draws);
            if outcome.uncovered > 1e-9 {
                result.insolvent = true;
                result.unpaid += outcome.uncovered;
                state.insolvent = true;
            }
        }

        if !rmd_first {
            self.required_distributions(state, &mut result);
        }

        // 19. Pay expenses from cash
        state.debit_cash(outflow - result.unpaid);

        // 20. Basis bookkeeping: keep basis within balance after market moves
        for (name, basis) in state.basis.iter_mut() {
            if let Some(account) = state.accounts.get(name) {
                basis.clamp_to(account.balance);
            }
        }

        // Year boundary: annual settlement, MAGI recording, YTD reset
        let tax = if current.is_december() {
            Some(self.settle_year(state, &mut result))
        } else {
            None
        };

        // 21. Recording
        result.cash_balance = state.cash_balance();
        result.net_worth = state.net_worth();
        state.current = current.plus_months(1);

        MonthOutcome { result, tax }
    }

    fn collect_income(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for income in &self.plan.incomes {
            let amount = monthly_amount(
                income.amount,
                income.frequency,
                income.start_date,
                income.end_date,
                income.change_policy,
                income.change_rate,
                inflation,
                current,
            );
            if amount <= 0.0 {
                continue;
            }
            state.credit_cash(amount);
            if income.tax_handling != TaxHandling::TaxFree {
                state.ytd.ordinary_income += amount;
            }
            if matches!(income.kind, IncomeKind::Wages | IncomeKind::SelfEmployment) {
                state.add_wages(income.owner, amount);
            }
            result.incomes.push(IncomeRecord {
                name: income.name.clone(),
                amount,
            });
            result.total_income += amount;
        }

        // Social Security benefits
        for config in &self.plan.social_security {
            let Some(person) = self.plan.person(config.owner) else {
                continue;
            };
            let spouse_config = self
                .plan
                .social_security
                .iter()
                .find(|other| other.owner != config.owner);
            let benefit = social_security::benefit_for_month(person, config, spouse_config, current);
            if benefit <= 0.0 {
                continue;
            }
            state.credit_cash(benefit);
            state.ytd.ss_gross += benefit;
            result.incomes.push(IncomeRecord {
                name: format!("social security ({})", person.name),
                amount: benefit,
            });
            result.total_income += benefit;
        }

        // In December the year's taxable share of benefits joins ordinary
        // income, ahead of bracket-fill and settlement
        if current.is_december() && state.ytd.ss_gross > 0.0 {
            let taxable = social_security::taxable_benefits(
                state.ytd.ss_gross,
                state.ytd.ordinary_income,
                state.ytd.tax_exempt_interest,
                self.plan.taxes.filing_status,
            );
            state.ytd.ordinary_income += taxable;
        }
    }

    fn withhold_fica(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let status = self.plan.taxes.filing_status;
        let inflation = self.plan.settings.inflation_rate;

        for income in &self.plan.incomes {
            if !matches!(income.kind, IncomeKind::Wages | IncomeKind::SelfEmployment) {
                continue;
            }
            let amount = monthly_amount(
                income.amount,
                income.frequency,
                income.start_date,
                income.end_date,
                income.change_policy,
                income.change_rate,
                inflation,
                current,
            );
            if amount <= 0.0 {
                continue;
            }
            // Wage counters were updated during collection; rewind this
            // payment to get the pre-payment YTD the tax law keys on
            let ytd_person = state.ytd_wages(income.owner) - amount;
            let ytd_household = state.ytd.household_wages - amount;
            let tax = match income.kind {
                IncomeKind::Wages => tax::wage_fica(
                    &self.tables,
                    current.year,
                    status,
                    amount,
                    ytd_person,
                    ytd_household,
                ),
                IncomeKind::SelfEmployment => tax::self_employment_tax(
                    &self.tables,
                    current.year,
                    status,
                    amount,
                    ytd_person,
                    ytd_household,
                ),
                IncomeKind::Other => continue,
            };
            let total = tax.total();
            state.debit_cash(total);
            state.ytd.fica_withheld += total;
            result.fica_withheld += total;
        }
    }

    fn withhold_income_tax(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for income in &self.plan.incomes {
            if income.tax_handling != TaxHandling::Withhold {
                continue;
            }
            let amount = monthly_amount(
                income.amount,
                income.frequency,
                income.start_date,
                income.end_date,
                income.change_policy,
                income.change_rate,
                inflation,
                current,
            );
            if amount <= 0.0 {
                continue;
            }
            let withheld = amount * income.withhold_percent.unwrap_or(0.0);
            state.debit_cash(withheld);
            state.ytd.tax_withheld += withheld;
            result.tax_withheld += withheld;
        }
    }

    /// Steps 5 and 6: payroll-sourced contributions and their employer match
    fn payroll_contributions(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for contribution in &self.plan.contributions {
            if !contribution.is_payroll() {
                continue;
            }
            let amount = monthly_amount(
                contribution.amount,
                contribution.frequency,
                contribution.start_date,
                contribution.end_date,
                contribution.change_policy,
                contribution.change_rate,
                inflation,
                current,
            );
            if amount <= 0.0 {
                continue;
            }
            // These dollars never stay in cash: they arrived with income
            // and flow straight to the destination
            let employee = state.debit_cash(amount);
            let dest_kind = state
                .accounts
                .get(&contribution.destination_account)
                .map(|a| a.kind);
            self.deposit(
                state,
                &contribution.destination_account,
                employee,
                DeltaReason::Contribution,
                result,
            );
            // Deferrals into tax-deferred destinations are pre-tax; FICA
            // was already taken on the gross wages
            if matches!(dest_kind, Some(k) if k.is_tax_deferred() || k == AccountKind::Hsa) {
                state.ytd.ordinary_income -= employee;
            }

            let mut match_amount = 0.0;
            if let Some(terms) = &contribution.employer_match {
                if let Some(salary_item) = self
                    .plan
                    .incomes
                    .iter()
                    .find(|i| i.name == terms.salary_income)
                {
                    let salary = monthly_amount(
                        salary_item.amount,
                        salary_item.frequency,
                        salary_item.start_date,
                        salary_item.end_date,
                        salary_item.change_policy,
                        salary_item.change_rate,
                        inflation,
                        current,
                    );
                    match_amount = (terms.match_percent * employee)
                        .min(terms.up_to_percent_of_salary * salary);
                    if match_amount > 0.0 {
                        self.deposit(
                            state,
                            &contribution.destination_account,
                            match_amount,
                            DeltaReason::EmployerMatch,
                            result,
                        );
                    }
                }
            }

            result.contributions.push(ContributionRecord {
                name: contribution.name.clone(),
                destination: contribution.destination_account.clone(),
                amount: employee,
                employer_match: match_amount,
            });
        }
    }

    /// Step 7: contributions funded from another account
    fn other_contributions(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for contribution in &self.plan.contributions {
            if contribution.is_payroll() {
                continue;
            }
            let amount = monthly_amount(
                contribution.amount,
                contribution.frequency,
                contribution.start_date,
                contribution.end_date,
                contribution.change_policy,
                contribution.change_rate,
                inflation,
                current,
            );
            if amount <= 0.0 {
                continue;
            }
            let moved = self.withdraw_for_move(
                state,
                &contribution.source_account,
                amount,
                DeltaReason::TransferOut,
                result,
            );
            if moved <= 0.0 {
                continue;
            }
            self.deposit(
                state,
                &contribution.destination_account,
                moved,
                DeltaReason::Contribution,
                result,
            );
            result.contributions.push(ContributionRecord {
                name: contribution.name.clone(),
                destination: contribution.destination_account.clone(),
                amount: moved,
                employer_match: 0.0,
            });
        }
    }

    /// Step 8: recurring transfers; `income` treatment adds the gross to
    /// ordinary income (e.g. traditional -> Roth moves)
    fn transfers(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for transfer in &self.plan.transfers {
            let amount = monthly_amount(
                transfer.amount,
                transfer.frequency,
                transfer.start_date,
                transfer.end_date,
                transfer.change_policy,
                transfer.change_rate,
                inflation,
                current,
            );
            if amount <= 0.0 {
                continue;
            }
            let moved = self.withdraw_for_move(
                state,
                &transfer.from_account,
                amount,
                DeltaReason::TransferOut,
                result,
            );
            if moved <= 0.0 {
                continue;
            }
            self.deposit(state, &transfer.to_account, moved, DeltaReason::TransferIn, result);

            let mut taxable = 0.0;
            match transfer.tax_treatment {
                TaxTreatment::Income => {
                    state.ytd.ordinary_income += moved;
                    taxable = moved;
                }
                TaxTreatment::CapitalGains => {
                    state.ytd.long_term_gains += moved;
                    state.ytd.investment_income += moved;
                    taxable = moved;
                }
                TaxTreatment::TaxFree => {}
            }
            result.transfers.push(TransferRecord {
                name: transfer.name.clone(),
                from: transfer.from_account.clone(),
                to: transfer.to_account.clone(),
                amount: moved,
                taxable,
            });
        }
    }

    /// Step 9: Roth conversions add to ordinary income and fund no
    /// withholding; tax settles at the December boundary
    fn roth_conversions(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let status = self.plan.taxes.filing_status;

        for conversion in &self.plan.roth_conversions {
            let source_balance = state
                .accounts
                .get(&conversion.source_account)
                .map(|a| a.balance)
                .unwrap_or(0.0);
            let amount = roth::conversion_amount(
                conversion,
                &self.tables,
                status,
                current,
                state.ytd.ordinary_income,
                source_balance,
            );
            if amount <= 0.0 {
                continue;
            }
            if let Some(source) = state.accounts.get_mut(&conversion.source_account) {
                source.balance -= amount;
            }
            result.account_deltas.push(AccountDelta {
                account: conversion.source_account.clone(),
                reason: DeltaReason::ConversionOut,
                amount: -amount,
            });
            self.deposit(
                state,
                &conversion.destination_account,
                amount,
                DeltaReason::ConversionIn,
                result,
            );
            state.ytd.ordinary_income += amount;
            state.ytd.roth_conversion_income += amount;
            result.conversions.push(ConversionRecord {
                name: conversion.name.clone(),
                from: conversion.source_account.clone(),
                to: conversion.destination_account.clone(),
                amount,
            });
        }
    }

    /// Step 10: required minimum distributions, December only
    fn required_distributions(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        if !current.is_december() {
            return;
        }
        let Some(config) = &self.plan.rmds else {
            return;
        };
        let age_years = state.age_months(config.owner) / 12;
        if age_years < config.start_age {
            return;
        }

        let prior_balances: Vec<(String, f64)> = config
            .accounts
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    state
                        .prior_year_end_balances
                        .get(name)
                        .copied()
                        .unwrap_or(0.0),
                )
            })
            .collect();
        let aggregate: f64 = prior_balances.iter().map(|(_, b)| b).sum();
        let required = rmd::required_amount(aggregate, age_years);
        if required <= 0.0 {
            return;
        }

        // Pro-rata by prior year-end balances, capped at current balances
        let mut distributed = 0.0;
        for (name, prior) in &prior_balances {
            if *prior <= 0.0 {
                continue;
            }
            let share = required * prior / aggregate;
            let Some(account) = state.accounts.get_mut(name) else {
                continue;
            };
            let taken = share.min(account.balance);
            if taken <= 0.0 {
                continue;
            }
            account.balance -= taken;
            distributed += taken;
            result.account_deltas.push(AccountDelta {
                account: name.clone(),
                reason: DeltaReason::Rmd,
                amount: -taken,
            });
            result.rmds.push(RmdRecord {
                account: name.clone(),
                amount: taken,
            });
        }
        if distributed > 0.0 {
            self.deposit(
                state,
                &config.destination_account,
                distributed,
                DeltaReason::Deposit,
                result,
            );
            state.ytd.ordinary_income += distributed;
        }
    }

    /// Steps 11-13: growth, dividends, and fees for every account
    fn grow_accounts(
        &self,
        state: &mut PlanState,
        result: &mut MonthResult,
        market: Option<AnnualMarket>,
    ) {
        let names: Vec<String> = state.accounts.keys().cloned().collect();
        let mut dividends_to_cash = 0.0;

        for name in &names {
            let Some(account) = state.accounts.get_mut(name) else {
                continue;
            };

            // 11. Growth: fixed rate, or the year's blended market return
            let annual_growth = match market {
                Some(m) => account.bond_share * m.bond + (1.0 - account.bond_share) * m.stock,
                None => account.growth_rate,
            };
            let growth = account.balance * monthly_rate(annual_growth);
            account.balance += growth;
            if growth.abs() > 1e-9 {
                result.account_deltas.push(AccountDelta {
                    account: name.clone(),
                    reason: DeltaReason::Growth,
                    amount: growth,
                });
            }

            // 12. Dividends
            let dividend = account.balance * monthly_rate(account.dividend_rate);
            if dividend > 1e-9 {
                let kind = account.kind;
                let dividend_tax = account.dividend_tax;
                if account.reinvest_dividends {
                    account.balance += dividend;
                    if kind.tracks_basis() {
                        if let Some(basis) = state.basis.get_mut(name) {
                            basis.add(dividend);
                        }
                    }
                } else {
                    dividends_to_cash += dividend;
                }
                result.account_deltas.push(AccountDelta {
                    account: name.clone(),
                    reason: DeltaReason::Dividend,
                    amount: dividend,
                });
                // Dividend tax category applies only where dividends are
                // visible to the IRS (taxable accounts)
                if kind.tracks_basis() || kind == AccountKind::Cash || kind == AccountKind::Other {
                    match dividend_tax {
                        TaxTreatment::TaxFree => state.ytd.tax_exempt_interest += dividend,
                        TaxTreatment::Income => {
                            state.ytd.ordinary_income += dividend;
                            state.ytd.investment_income += dividend;
                        }
                        TaxTreatment::CapitalGains => {
                            state.ytd.long_term_gains += dividend;
                            state.ytd.investment_income += dividend;
                        }
                    }
                }
            }

            // 13. Fees
            let Some(account) = state.accounts.get_mut(name) else {
                continue;
            };
            let fee = account.balance * monthly_rate(account.fee_rate);
            if fee > 1e-9 {
                account.balance -= fee;
                result.account_deltas.push(AccountDelta {
                    account: name.clone(),
                    reason: DeltaReason::Fee,
                    amount: -fee,
                });
            }
        }

        if dividends_to_cash > 0.0 {
            state.credit_cash(dividends_to_cash);
            result.dividends_to_cash = dividends_to_cash;
        }
    }

    /// Step 14: real-asset appreciation, mortgage amortization, property
    /// tax, and maintenance
    fn real_assets(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for asset in &mut state.real_assets {
            asset.appreciate_monthly(inflation);

            if let Some(mortgage) = &mut asset.mortgage {
                let paid = mortgage.amortize(current);
                result.expenses.mortgage += paid.payment;
                state.ytd.mortgage_interest_paid += paid.interest;
                if paid.paid_off {
                    asset.mortgage = None;
                }
            }

            let property_tax = asset.monthly_property_tax();
            result.expenses.property_tax += property_tax;
            state.ytd.state_local_taxes_paid += property_tax;

            for item in &asset.maintenance {
                let amount = monthly_amount(
                    item.amount,
                    item.frequency,
                    asset.acquired,
                    YearMonth::new(i32::MAX, 12),
                    item.change_policy,
                    item.change_rate,
                    inflation,
                    current,
                );
                result.expenses.maintenance += amount;
            }
        }
    }

    /// Step 15: scheduled transactions
    fn transactions(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let status = self.plan.taxes.filing_status;

        for tx in &self.plan.transactions {
            if tx.date != current {
                continue;
            }
            match tx.kind {
                TransactionKind::SellAsset => {
                    let Some(asset_name) = &tx.asset else { continue };
                    let Some(position) =
                        state.real_assets.iter().position(|a| &a.name == asset_name)
                    else {
                        continue;
                    };
                    let asset = state.real_assets.remove(position);
                    let proceeds = tx.amount - tx.fees;
                    self.deposit(state, &tx.account, proceeds, DeltaReason::SaleProceeds, result);
                    let gain = sale_gain(&asset, tx.amount, status);
                    match tx.tax_treatment {
                        TaxTreatment::CapitalGains => {
                            state.ytd.long_term_gains += gain;
                            state.ytd.investment_income += gain;
                        }
                        TaxTreatment::Income => state.ytd.ordinary_income += gain,
                        TaxTreatment::TaxFree => {}
                    }
                }
                TransactionKind::BuyAsset => {
                    let Some(asset_name) = &tx.asset else { continue };
                    let available = state
                        .accounts
                        .get(&tx.account)
                        .map(|a| a.balance)
                        .unwrap_or(0.0);
                    let spent = tx.amount.min(available);
                    if let Some(account) = state.accounts.get_mut(&tx.account) {
                        account.balance -= spent;
                    }
                    result.account_deltas.push(AccountDelta {
                        account: tx.account.clone(),
                        reason: DeltaReason::AssetPurchase,
                        amount: -spent,
                    });
                    state
                        .real_assets
                        .push(RealAssetState::purchased(asset_name, tx.amount, current));
                }
                TransactionKind::Transfer | TransactionKind::Other => {
                    // One-time inflow to the named account under the
                    // declared tax treatment
                    let net = tx.amount - tx.fees;
                    self.deposit(state, &tx.account, net, DeltaReason::Deposit, result);
                    match tx.tax_treatment {
                        TaxTreatment::Income => state.ytd.ordinary_income += tx.amount,
                        TaxTreatment::CapitalGains => {
                            state.ytd.long_term_gains += tx.amount;
                            state.ytd.investment_income += tx.amount;
                        }
                        TaxTreatment::TaxFree => {}
                    }
                }
            }
        }
    }

    /// Step 16: healthcare costs per person
    fn healthcare_costs(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let status = self.plan.taxes.filing_status;
        let plan_start = self.plan.settings.plan_start;
        let inflation = self.plan.settings.inflation_rate;

        for hc in &self.plan.healthcare {
            let age_months = state.age_months(hc.owner);
            let magi_window = &state.magi_by_year;
            let cost = healthcare::monthly_cost(
                hc,
                &self.tables,
                status,
                current,
                age_months,
                plan_start,
                inflation,
                |years_back| magi_window.get(&(current.year - years_back as i32)).copied(),
            );
            result.healthcare.premiums += cost.premiums;
            result.healthcare.out_of_pocket += cost.out_of_pocket;
            result.healthcare.irmaa += cost.irmaa;
        }
        result.expenses.healthcare = result.healthcare.total();
    }

    /// Step 17: non-healthcare expenses
    fn regular_expenses(&self, state: &mut PlanState, result: &mut MonthResult) {
        let current = state.current;
        let inflation = self.plan.settings.inflation_rate;

        for expense in &self.plan.expenses {
            let amount = monthly_amount(
                expense.amount,
                expense.frequency,
                expense.start_date,
                expense.end_date,
                expense.change_policy,
                expense.change_rate,
                inflation,
                current,
            );
            if amount > 0.0 {
                result.expenses.add_spending(expense.spending_type, amount);
            }
        }
    }

    /// December boundary: compute the year's tax, settle against
    /// withholding, record MAGI, and reset the YTD accumulators.
    fn settle_year(&self, state: &mut PlanState, result: &mut MonthResult) -> TaxResult {
        let year = state.current.year;
        let taxes = &self.plan.taxes;

        let summary = YearIncomeSummary {
            year,
            filing_status: taxes.filing_status,
            state: taxes.state.clone(),
            state_rate_override: taxes.state_rate_override,
            ordinary_income: state.ytd.ordinary_income,
            long_term_gains: state.ytd.long_term_gains,
            investment_income: state.ytd.investment_income,
            tax_exempt_interest: state.ytd.tax_exempt_interest,
            state_local_taxes_paid: state.ytd.state_local_taxes_paid,
            mortgage_interest_paid: state.ytd.mortgage_interest_paid,
            charitable: taxes.charitable_annual,
            penalized_withdrawals: state.ytd.penalized_withdrawals,
            withheld: state.ytd.tax_withheld,
            niit_enabled: taxes.niit_enabled,
            amt_enabled: taxes.amt_enabled,
        };
        let tax = tax::compute(&self.tables, &summary);

        result.tax_settlement = Some(tax.net_due);
        let mut settlement_draws = WithdrawalOutcome::default();
        if tax.net_due > 0.0 {
            let paid = state.debit_cash(tax.net_due);
            let shortfall = tax.net_due - paid;
            if shortfall > 1e-9 {
                settlement_draws = cover_shortfall(state, &self.withdrawal_order, shortfall);
                state.debit_cash(shortfall - settlement_draws.uncovered);
                for draw in &settlement_draws.draws {
                    result.account_deltas.push(AccountDelta {
                        account: draw.account.clone(),
                        reason: DeltaReason::TaxSettlement,
                        amount: -draw.amount,
                    });
                }
                if settlement_draws.uncovered > 1e-9 {
                    result.insolvent = true;
                    result.unpaid += settlement_draws.uncovered;
                    state.insolvent = true;
                }
            }
        } else if tax.net_due < 0.0 {
            state.credit_cash(-tax.net_due);
        }

        state.magi_by_year.insert(year, summary.magi());
        state.roll_year();

        // Withdrawals made to pay the settlement are income of the year
        // that just started
        self.apply_withdrawal_taxes(state, &settlement_draws);
        result.withdrawals.extend(settlement_draws.draws);

        tax
    }

    fn apply_withdrawal_taxes(&self, state: &mut PlanState, outcome: &WithdrawalOutcome) {
        for draw in &outcome.draws {
            state.ytd.ordinary_income += draw.ordinary_income;
            state.ytd.long_term_gains += draw.taxable_gain;
            state.ytd.investment_income += draw.taxable_gain;
            state.ytd.penalized_withdrawals += draw.penalized;
        }
    }

    /// Credit an account, tracking basis for taxable destinations and the
    /// contribution ledger for Roth destinations
    fn deposit(
        &self,
        state: &mut PlanState,
        account_name: &str,
        amount: f64,
        reason: DeltaReason,
        result: &mut MonthResult,
    ) {
        if amount <= 0.0 {
            return;
        }
        let Some(account) = state.accounts.get_mut(account_name) else {
            return;
        };
        account.balance += amount;
        match account.kind {
            AccountKind::TaxableBrokerage => {
                state
                    .basis
                    .entry(account_name.to_string())
                    .or_default()
                    .add(amount);
            }
            AccountKind::RothIra => {
                *state
                    .roth_contributions
                    .entry(account_name.to_string())
                    .or_insert(0.0) += amount;
            }
            _ => {}
        }
        result.account_deltas.push(AccountDelta {
            account: account_name.to_string(),
            reason,
            amount,
        });
    }

    /// Debit an account for a contribution or transfer leg. Taxable sources
    /// consume basis proportionally. Returns the amount actually moved.
    fn withdraw_for_move(
        &self,
        state: &mut PlanState,
        account_name: &str,
        amount: f64,
        reason: DeltaReason,
        result: &mut MonthResult,
    ) -> f64 {
        let Some(account) = state.accounts.get_mut(account_name) else {
            return 0.0;
        };
        let moved = amount.min(account.balance).max(0.0);
        if moved <= 0.0 {
            return 0.0;
        }
        let balance_before = account.balance;
        account.balance -= moved;
        if account.kind.tracks_basis() {
            if let Some(basis) = state.basis.get_mut(account_name) {
                let split = basis.withdraw(moved, balance_before);
                state.ytd.long_term_gains += split.realized_gain;
                state.ytd.investment_income += split.realized_gain;
            }
        }
        result.account_deltas.push(AccountDelta {
            account: account_name.to_string(),
            reason,
            amount: -moved,
        });
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::test_fixtures::minimal_plan;
    use crate::plan::{
        AgeSpec, ChangePolicy, Contribution, EmployerMatch, Frequency, Owner, RmdConfig,
        RothConversion, RothStrategy, SocialSecurityConfig,
    };
    use approx::assert_relative_eq;

    fn run_one_month(plan: &Plan) -> (PlanState, MonthOutcome) {
        let engine = MonthlyEngine::new(plan);
        let mut state = PlanState::from_plan(plan);
        let outcome = engine.advance_month(&mut state, None);
        (state, outcome)
    }

    #[test]
    fn test_income_lands_in_cash() {
        let plan = minimal_plan();
        let (state, outcome) = run_one_month(&plan);
        // 10,000 salary, 20% withholding, FICA 7.65%, 5,000 expenses
        assert_relative_eq!(outcome.result.total_income, 10_000.0);
        assert_relative_eq!(outcome.result.tax_withheld, 2_000.0);
        assert_relative_eq!(outcome.result.fica_withheld, 765.0, epsilon = 0.01);
        let expected_cash = 50_000.0 + 10_000.0 - 2_000.0 - 765.0 - 5_000.0;
        assert_relative_eq!(state.cash_balance(), expected_cash, epsilon = 0.01);
    }

    #[test]
    fn test_employer_match_formula() {
        let mut plan = minimal_plan();
        plan.contributions.push(Contribution {
            name: "401k deferral".into(),
            source_account: "income".into(),
            destination_account: "401k".into(),
            amount: 1_000.0,
            frequency: Frequency::Monthly,
            start_date: plan.settings.plan_start,
            end_date: plan.settings.plan_end,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            employer_match: Some(EmployerMatch {
                match_percent: 0.5,
                up_to_percent_of_salary: 0.06,
                salary_income: "salary".into(),
            }),
        });
        let (state, outcome) = run_one_month(&plan);
        let record = &outcome.result.contributions[0];
        // min(0.5 * 1,000, 0.06 * 10,000) = 500
        assert_relative_eq!(record.employer_match, 500.0);
        assert_relative_eq!(
            state.accounts["401k"].balance,
            200_000.0 + 1_000.0 + 500.0
        );
    }

    #[test]
    fn test_match_caps_at_salary_percent() {
        let mut plan = minimal_plan();
        plan.contributions.push(Contribution {
            name: "401k deferral".into(),
            source_account: "income".into(),
            destination_account: "401k".into(),
            amount: 3_000.0,
            frequency: Frequency::Monthly,
            start_date: plan.settings.plan_start,
            end_date: plan.settings.plan_end,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            employer_match: Some(EmployerMatch {
                match_percent: 0.5,
                up_to_percent_of_salary: 0.06,
                salary_income: "salary".into(),
            }),
        });
        let (_, outcome) = run_one_month(&plan);
        // min(0.5 * 3,000, 0.06 * 10,000) = 600
        assert_relative_eq!(outcome.result.contributions[0].employer_match, 600.0);
    }

    #[test]
    fn test_growth_uses_monthly_geometric_rate() {
        let mut plan = minimal_plan();
        plan.incomes.clear();
        plan.expenses.clear();
        for a in &mut plan.accounts {
            if a.name == "brokerage" {
                a.growth_rate = 0.12;
            }
        }
        let (state, _) = run_one_month(&plan);
        let expected = 100_000.0 * 1.12_f64.powf(1.0 / 12.0);
        assert_relative_eq!(state.accounts["brokerage"].balance, expected, epsilon = 0.01);
    }

    #[test]
    fn test_market_returns_blend_by_bond_share() {
        let mut plan = minimal_plan();
        plan.incomes.clear();
        plan.expenses.clear();
        for a in &mut plan.accounts {
            if a.name == "brokerage" {
                a.bond_percent = 40.0;
            }
        }
        let engine = MonthlyEngine::new(&plan);
        let mut state = PlanState::from_plan(&plan);
        let market = AnnualMarket {
            stock: 0.10,
            bond: 0.05,
        };
        engine.advance_month(&mut state, Some(market));
        let annual: f64 = 0.4 * 0.05 + 0.6 * 0.10;
        let expected = 100_000.0 * (1.0 + annual).powf(1.0 / 12.0);
        assert_relative_eq!(state.accounts["brokerage"].balance, expected, epsilon = 0.01);
    }

    #[test]
    fn test_shortfall_triggers_withdrawal() {
        let mut plan = minimal_plan();
        plan.incomes.clear();
        for e in &mut plan.expenses {
            e.amount = 60_000.0; // more than the 50k cash
        }
        let (state, outcome) = run_one_month(&plan);
        assert!(!outcome.result.withdrawals.is_empty());
        assert!(!outcome.result.insolvent);
        assert_relative_eq!(state.cash_balance(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_insolvency_when_everything_empty() {
        let mut plan = minimal_plan();
        plan.incomes.clear();
        for a in &mut plan.accounts {
            a.balance = 0.0;
            if a.kind.tracks_basis() {
                a.cost_basis = Some(0.0);
            }
        }
        let (state, outcome) = run_one_month(&plan);
        assert!(outcome.result.insolvent);
        assert!(state.insolvent);
        assert_relative_eq!(outcome.result.unpaid, 5_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_december_settlement_present() {
        let mut plan = minimal_plan();
        plan.settings.plan_start = YearMonth::new(2025, 12);
        let (_, outcome) = run_one_month(&plan);
        assert!(outcome.tax.is_some());
        assert!(outcome.result.tax_settlement.is_some());
    }

    #[test]
    fn test_rmd_in_december() {
        let mut plan = minimal_plan();
        // Primary turns 73 in June 2025
        plan.primary.birth_date = YearMonth::new(1952, 6);
        plan.settings.plan_start = YearMonth::new(2025, 12);
        plan.incomes.clear();
        plan.rmds = Some(RmdConfig {
            owner: Owner::Primary,
            accounts: vec!["ira".into()],
            destination_account: "checking".into(),
            start_age: 73,
            satisfied_first: true,
        });
        let engine = MonthlyEngine::new(&plan);
        let mut state = PlanState::from_plan(&plan);
        state
            .prior_year_end_balances
            .insert("ira".into(), 1_000_000.0);
        let outcome = engine.advance_month(&mut state, None);
        let rmd_total: f64 = outcome.result.rmds.iter().map(|r| r.amount).sum();
        assert_relative_eq!(rmd_total, 1_000_000.0 / 26.5, epsilon = 0.01);
    }

    #[test]
    fn test_bracket_fill_conversion_in_december() {
        let mut plan = minimal_plan();
        plan.settings.plan_start = YearMonth::new(2025, 12);
        plan.incomes.clear();
        plan.expenses.clear();
        plan.roth_conversions.push(RothConversion {
            name: "fill 22".into(),
            source_account: "ira".into(),
            destination_account: "roth".into(),
            start_date: YearMonth::new(2025, 1),
            end_date: YearMonth::new(2035, 12),
            strategy: RothStrategy::FillBracket {
                bracket: "22%".into(),
            },
        });
        let (state, outcome) = run_one_month(&plan);
        let converted: f64 = outcome.result.conversions.iter().map(|c| c.amount).sum();
        // Source has 150k, bracket top is 206,700: capped by the source
        assert_relative_eq!(converted, 150_000.0);
        assert_relative_eq!(state.accounts["ira"].balance, 0.0);
    }

    #[test]
    fn test_social_security_claimed_benefit() {
        let mut plan = minimal_plan();
        plan.primary.birth_date = YearMonth::new(1958, 1);
        plan.settings.plan_start = YearMonth::new(2025, 6);
        plan.incomes.clear();
        plan.social_security.push(SocialSecurityConfig {
            owner: Owner::Primary,
            monthly_pia: 2_000.0,
            full_retirement_age: AgeSpec { years: 67, months: 0 },
            claim_age: AgeSpec { years: 67, months: 0 },
            cola_assumption: 0.0,
        });
        let (_, outcome) = run_one_month(&plan);
        let ss: f64 = outcome
            .result
            .incomes
            .iter()
            .filter(|i| i.name.starts_with("social security"))
            .map(|i| i.amount)
            .sum();
        assert_relative_eq!(ss, 2_000.0);
    }

    #[test]
    fn test_reinvested_dividends_grow_basis() {
        let mut plan = minimal_plan();
        plan.incomes.clear();
        plan.expenses.clear();
        for a in &mut plan.accounts {
            if a.name == "brokerage" {
                a.dividend_rate = 0.02;
            }
        }
        let (state, _) = run_one_month(&plan);
        assert!(state.basis["brokerage"].total > 100_000.0);
        assert!(state.ytd.long_term_gains > 0.0, "qualified dividends recorded");
    }

    #[test]
    fn test_home_sale_with_exclusion() {
        let mut plan = minimal_plan();
        plan.incomes.clear();
        plan.expenses.clear();
        plan.real_assets.push(crate::plan::RealAsset {
            name: "home".into(),
            value: 1_000_000.0,
            purchase_price: Some(320_000.0),
            primary_residence: true,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            property_tax_rate: 0.0,
            mortgage: None,
            maintenance: Vec::new(),
        });
        plan.transactions.push(crate::plan::Transaction {
            name: "sell home".into(),
            kind: TransactionKind::SellAsset,
            date: plan.settings.plan_start,
            account: "checking".into(),
            amount: 1_000_000.0,
            fees: 60_000.0,
            asset: Some("home".into()),
            tax_treatment: TaxTreatment::CapitalGains,
        });
        let (state, _) = run_one_month(&plan);
        // Proceeds: 940,000 into checking
        assert_relative_eq!(state.cash_balance(), 50_000.0 + 940_000.0, epsilon = 0.01);
        // Gain: 1,000,000 - 320,000 - 500,000 = 180,000
        assert_relative_eq!(state.ytd.long_term_gains, 180_000.0);
        assert!(state.real_assets.is_empty());
    }
}
