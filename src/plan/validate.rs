//! Cross-reference validation of a parsed plan
//!
//! The engine refuses to run without a validated plan. Fatal problems are
//! collected with JSON-path context; soft configuration issues are logged
//! as warnings and do not block the run.

use std::collections::HashSet;

use log::warn;

use crate::error::{PlanError, ValidationIssue};
use crate::plan::data::{
    AccountKind, ChangePolicy, FilingStatus, Frequency, Owner, Plan, TaxHandling, TransactionKind,
    YearMonth,
};
use crate::tax::states;

/// Validate a plan. Returns the number of soft warnings emitted.
pub fn validate(plan: &Plan) -> Result<usize, PlanError> {
    let mut issues: Vec<ValidationIssue> = Vec::new();
    let mut warnings = 0usize;

    let push = |path: String, message: String, issues: &mut Vec<ValidationIssue>| {
        issues.push(ValidationIssue { path, message });
    };

    // Plan window
    if plan.settings.plan_start > plan.settings.plan_end {
        push(
            "settings.plan_start".into(),
            format!(
                "plan_start {} is after plan_end {}",
                plan.settings.plan_start, plan.settings.plan_end
            ),
            &mut issues,
        );
    }

    // Account name uniqueness and per-account checks
    let mut account_names: HashSet<&str> = HashSet::new();
    let mut has_cash = false;
    for (i, account) in plan.accounts.iter().enumerate() {
        if !account_names.insert(account.name.as_str()) {
            push(
                format!("accounts[{i}].name"),
                format!("duplicate account name `{}`", account.name),
                &mut issues,
            );
        }
        if account.kind == AccountKind::Cash {
            has_cash = true;
        }
        match (account.kind.tracks_basis(), account.cost_basis) {
            (true, None) => push(
                format!("accounts[{i}].cost_basis"),
                "cost_basis is required for taxable_brokerage accounts".into(),
                &mut issues,
            ),
            (false, Some(_)) => push(
                format!("accounts[{i}].cost_basis"),
                format!("cost_basis is only valid for taxable_brokerage, not {:?}", account.kind),
                &mut issues,
            ),
            _ => {}
        }
        if let Some(basis) = account.cost_basis {
            if basis > account.balance {
                warn!(
                    "accounts[{i}] `{}`: cost basis {:.2} exceeds balance {:.2}",
                    account.name, basis, account.balance
                );
                warnings += 1;
            }
        }
        if !(0.0..=100.0).contains(&account.bond_percent) {
            push(
                format!("accounts[{i}].bond_percent"),
                format!("bond_percent {} outside [0, 100]", account.bond_percent),
                &mut issues,
            );
        }
        if account.growth_rate.abs() > 0.5 {
            warn!(
                "accounts[{i}] `{}`: growth_rate {:.2} looks implausible",
                account.name, account.growth_rate
            );
            warnings += 1;
        }
    }
    if !has_cash {
        push(
            "accounts".into(),
            "at least one cash account is required".into(),
            &mut issues,
        );
    }

    let account_exists = |name: &str| plan.accounts.iter().any(|a| a.name == name);

    // Spouse / filing status compatibility
    let has_spouse = plan.spouse.is_some();
    match plan.taxes.filing_status {
        FilingStatus::Mfj | FilingStatus::Mfs | FilingStatus::Qss if !has_spouse => {
            push(
                "taxes.filing_status".into(),
                format!("{:?} filing requires a spouse", plan.taxes.filing_status),
                &mut issues,
            );
        }
        FilingStatus::Single | FilingStatus::Hoh if has_spouse => {
            warn!(
                "filing status {:?} with a spouse present; spouse flows still apply",
                plan.taxes.filing_status
            );
            warnings += 1;
        }
        _ => {}
    }

    // State code
    if plan.taxes.state_rate_override.is_none() && !states::is_known_state(&plan.taxes.state) {
        push(
            "taxes.state".into(),
            format!("unknown state code `{}`", plan.taxes.state),
            &mut issues,
        );
    }

    let owner_resolves = |owner: Owner| owner != Owner::Spouse || has_spouse;

    // Windows and rates shared by all cash-flow items
    let check_window = |path: &str,
                        start: YearMonth,
                        end: YearMonth,
                        policy: ChangePolicy,
                        rate: Option<f64>,
                        frequency: Frequency,
                        issues: &mut Vec<ValidationIssue>| {
        if start > end && frequency != Frequency::OneTime {
            issues.push(ValidationIssue {
                path: format!("{path}.start_date"),
                message: format!("start_date {start} is after end_date {end}"),
            });
        }
        if policy.needs_rate() && rate.is_none() {
            issues.push(ValidationIssue {
                path: format!("{path}.change_rate"),
                message: format!("change_rate is required for {policy:?}"),
            });
        }
    };

    for (i, income) in plan.incomes.iter().enumerate() {
        let path = format!("incomes[{i}]");
        check_window(
            &path,
            income.start_date,
            income.end_date,
            income.change_policy,
            income.change_rate,
            income.frequency,
            &mut issues,
        );
        if !owner_resolves(income.owner) {
            push(
                format!("{path}.owner"),
                "owner `spouse` but no spouse in plan".into(),
                &mut issues,
            );
        }
        if income.tax_handling == TaxHandling::Withhold && income.withhold_percent.is_none() {
            push(
                format!("{path}.withhold_percent"),
                "withhold_percent is required when tax_handling is withhold".into(),
                &mut issues,
            );
        }
    }

    for (i, expense) in plan.expenses.iter().enumerate() {
        check_window(
            &format!("expenses[{i}]"),
            expense.start_date,
            expense.end_date,
            expense.change_policy,
            expense.change_rate,
            expense.frequency,
            &mut issues,
        );
    }

    for (i, c) in plan.contributions.iter().enumerate() {
        let path = format!("contributions[{i}]");
        check_window(
            &path,
            c.start_date,
            c.end_date,
            c.change_policy,
            c.change_rate,
            c.frequency,
            &mut issues,
        );
        if !c.is_payroll() && !account_exists(&c.source_account) {
            push(
                format!("{path}.source_account"),
                format!("unknown account `{}`", c.source_account),
                &mut issues,
            );
        }
        if !account_exists(&c.destination_account) {
            push(
                format!("{path}.destination_account"),
                format!("unknown account `{}`", c.destination_account),
                &mut issues,
            );
        }
        if let Some(m) = &c.employer_match {
            if !plan.incomes.iter().any(|inc| inc.name == m.salary_income) {
                push(
                    format!("{path}.employer_match.salary_income"),
                    format!("unknown income item `{}`", m.salary_income),
                    &mut issues,
                );
            }
            if !c.is_payroll() {
                warn!(
                    "contributions[{i}] `{}`: employer match on a non-payroll contribution",
                    c.name
                );
                warnings += 1;
            }
        }
    }

    for (i, t) in plan.transfers.iter().enumerate() {
        let path = format!("transfers[{i}]");
        check_window(
            &path,
            t.start_date,
            t.end_date,
            t.change_policy,
            t.change_rate,
            t.frequency,
            &mut issues,
        );
        for (field, name) in [("from_account", &t.from_account), ("to_account", &t.to_account)] {
            if !account_exists(name) {
                push(
                    format!("{path}.{field}"),
                    format!("unknown account `{name}`"),
                    &mut issues,
                );
            }
        }
    }

    // Real-asset names and linked transactions
    let mut asset_names: HashSet<&str> = HashSet::new();
    for (i, asset) in plan.real_assets.iter().enumerate() {
        if !asset_names.insert(asset.name.as_str()) {
            push(
                format!("real_assets[{i}].name"),
                format!("duplicate real asset name `{}`", asset.name),
                &mut issues,
            );
        }
        if asset.change_policy.needs_rate() && asset.change_rate.is_none() {
            push(
                format!("real_assets[{i}].change_rate"),
                format!("change_rate is required for {:?}", asset.change_policy),
                &mut issues,
            );
        }
        if let Some(m) = &asset.mortgage {
            if m.remaining_balance < 0.0 {
                push(
                    format!("real_assets[{i}].mortgage.remaining_balance"),
                    "mortgage balance must be non-negative".into(),
                    &mut issues,
                );
            }
        }
    }

    for (i, tx) in plan.transactions.iter().enumerate() {
        let path = format!("transactions[{i}]");
        if !account_exists(&tx.account) {
            push(
                format!("{path}.account"),
                format!("unknown account `{}`", tx.account),
                &mut issues,
            );
        }
        match tx.kind {
            TransactionKind::SellAsset => match &tx.asset {
                None => push(
                    format!("{path}.asset"),
                    "sell_asset requires an asset name".into(),
                    &mut issues,
                ),
                Some(name) => match plan.real_assets.iter().find(|a| &a.name == name) {
                    None => push(
                        format!("{path}.asset"),
                        format!("unknown real asset `{name}`"),
                        &mut issues,
                    ),
                    Some(asset) if asset.purchase_price.is_none() => push(
                        format!("real_assets[{}].purchase_price", plan
                            .real_assets
                            .iter()
                            .position(|a| &a.name == name)
                            .unwrap_or(0)),
                        format!("purchase_price required: asset `{name}` has a linked sell_asset"),
                        &mut issues,
                    ),
                    _ => {}
                },
            },
            TransactionKind::BuyAsset => {
                if tx.asset.is_none() {
                    push(
                        format!("{path}.asset"),
                        "buy_asset requires a name for the new asset".into(),
                        &mut issues,
                    );
                }
            }
            _ => {}
        }
    }

    // RMD configuration
    if let Some(rmd) = &plan.rmds {
        for (j, name) in rmd.accounts.iter().enumerate() {
            match plan.account(name) {
                None => push(
                    format!("rmds.accounts[{j}]"),
                    format!("unknown account `{name}`"),
                    &mut issues,
                ),
                Some(a) if !a.kind.is_tax_deferred() => push(
                    format!("rmds.accounts[{j}]"),
                    format!("account `{name}` is {:?}; RMD accounts must be tax-deferred", a.kind),
                    &mut issues,
                ),
                _ => {}
            }
        }
        if !account_exists(&rmd.destination_account) {
            push(
                "rmds.destination_account".into(),
                format!("unknown account `{}`", rmd.destination_account),
                &mut issues,
            );
        }
        if !owner_resolves(rmd.owner) {
            push(
                "rmds.owner".into(),
                "owner `spouse` but no spouse in plan".into(),
                &mut issues,
            );
        }
    }

    // Roth conversions must go traditional -> Roth
    for (i, rc) in plan.roth_conversions.iter().enumerate() {
        let path = format!("roth_conversions[{i}]");
        match plan.account(&rc.source_account) {
            None => push(
                format!("{path}.source_account"),
                format!("unknown account `{}`", rc.source_account),
                &mut issues,
            ),
            Some(a) if !a.kind.is_tax_deferred() => push(
                format!("{path}.source_account"),
                format!("conversion source must be tax-deferred, got {:?}", a.kind),
                &mut issues,
            ),
            _ => {}
        }
        match plan.account(&rc.destination_account) {
            None => push(
                format!("{path}.destination_account"),
                format!("unknown account `{}`", rc.destination_account),
                &mut issues,
            ),
            Some(a) if a.kind != AccountKind::RothIra => push(
                format!("{path}.destination_account"),
                format!("conversion destination must be roth_ira, got {:?}", a.kind),
                &mut issues,
            ),
            _ => {}
        }
        if rc.start_date > rc.end_date {
            push(
                format!("{path}.start_date"),
                format!("start_date {} is after end_date {}", rc.start_date, rc.end_date),
                &mut issues,
            );
        }
    }

    // Social Security / healthcare owners
    for (i, ss) in plan.social_security.iter().enumerate() {
        if !owner_resolves(ss.owner) {
            push(
                format!("social_security[{i}].owner"),
                "owner `spouse` but no spouse in plan".into(),
                &mut issues,
            );
        }
        if ss.claim_age.total_months() < 62 * 12 || ss.claim_age.total_months() > 70 * 12 {
            warn!(
                "social_security[{i}]: claim age {}y{}m outside the usual 62-70 range",
                ss.claim_age.years, ss.claim_age.months
            );
            warnings += 1;
        }
    }
    for (i, hc) in plan.healthcare.iter().enumerate() {
        if !owner_resolves(hc.owner) {
            push(
                format!("healthcare[{i}].owner"),
                "owner `spouse` but no spouse in plan".into(),
                &mut issues,
            );
        }
    }

    // Withdrawal strategy account names
    if plan.withdrawal_strategy.use_account_specific {
        for (j, name) in plan.withdrawal_strategy.account_order.iter().enumerate() {
            if !account_exists(name) {
                push(
                    format!("withdrawal_strategy.account_order[{j}]"),
                    format!("unknown account `{name}`"),
                    &mut issues,
                );
            }
        }
    }

    // Mode parameters
    let mc = &plan.simulation.monte_carlo;
    if !(-1.0..=1.0).contains(&mc.correlation) {
        return Err(PlanError::mode_param(
            "monte_carlo.correlation",
            format!("{} outside [-1, 1]", mc.correlation),
        ));
    }
    if mc.stock_std < 0.0 || mc.bond_std < 0.0 {
        return Err(PlanError::mode_param(
            "monte_carlo",
            "standard deviations must be non-negative",
        ));
    }
    if plan.simulation.runs == 0 {
        return Err(PlanError::mode_param("runs", "at least one run is required"));
    }

    if issues.is_empty() {
        Ok(warnings)
    } else {
        Err(PlanError::Validation(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::test_fixtures::minimal_plan;

    #[test]
    fn test_minimal_plan_validates() {
        let plan = minimal_plan();
        assert!(validate(&plan).is_ok());
    }

    #[test]
    fn test_missing_cash_account() {
        let mut plan = minimal_plan();
        plan.accounts.retain(|a| a.kind != AccountKind::Cash);
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("cash account"));
    }

    #[test]
    fn test_basis_required_for_brokerage() {
        let mut plan = minimal_plan();
        for a in &mut plan.accounts {
            if a.kind == AccountKind::TaxableBrokerage {
                a.cost_basis = None;
            }
        }
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("cost_basis"));
    }

    #[test]
    fn test_mfj_requires_spouse() {
        let mut plan = minimal_plan();
        plan.spouse = None;
        plan.taxes.filing_status = FilingStatus::Mfj;
        // Strip spouse-owned references first so only the filing check fires
        plan.incomes.retain(|i| i.owner != Owner::Spouse);
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("requires a spouse"));
    }

    #[test]
    fn test_correlation_bounds() {
        let mut plan = minimal_plan();
        plan.simulation.monte_carlo.correlation = 1.5;
        let err = validate(&plan).unwrap_err();
        assert!(matches!(err, PlanError::ModeParam { .. }));
    }

    #[test]
    fn test_unknown_account_reference() {
        let mut plan = minimal_plan();
        plan.transfers.push(crate::plan::data::Transfer {
            name: "bogus".into(),
            from_account: "nope".into(),
            to_account: "checking".into(),
            amount: 100.0,
            frequency: Frequency::Monthly,
            start_date: plan.settings.plan_start,
            end_date: plan.settings.plan_end,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            tax_treatment: crate::plan::data::TaxTreatment::TaxFree,
        });
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("unknown account `nope`"));
    }
}
