//! Annual tax computation and settlement against withholding
//!
//! The tax engine is a pure function of a `YearIncomeSummary`; the monthly
//! engine accumulates the summary on `PlanState` over the year and calls
//! `compute` at the December boundary.

use serde::{Deserialize, Serialize};

use crate::plan::FilingStatus;
use crate::tax::states;
use crate::tax::tables::{tax_from_brackets, TaxTables, EARLY_WITHDRAWAL_PENALTY_RATE, NIIT_RATE};

/// Everything the engine needs to know about one tax year
#[derive(Debug, Clone, Default)]
pub struct YearIncomeSummary {
    pub year: i32,
    pub filing_status: FilingStatus,
    /// Two-letter state code
    pub state: String,
    pub state_rate_override: Option<f64>,

    /// All ordinary income: wages, taxable interest/dividends, taxable
    /// Social Security, conversions, tax-deferred withdrawals
    pub ordinary_income: f64,
    pub long_term_gains: f64,
    /// Investment income subject to NIIT
    pub investment_income: f64,
    pub tax_exempt_interest: f64,

    /// Itemizable amounts
    pub state_local_taxes_paid: f64,
    pub mortgage_interest_paid: f64,
    pub charitable: f64,

    /// Gross withdrawals subject to the 10% early penalty
    pub penalized_withdrawals: f64,

    /// Income tax withheld during the year (FICA excluded)
    pub withheld: f64,

    pub niit_enabled: bool,
    pub amt_enabled: bool,
}

impl YearIncomeSummary {
    pub fn agi(&self) -> f64 {
        self.ordinary_income + self.long_term_gains
    }

    /// Modified AGI for IRMAA: AGI plus tax-exempt interest
    pub fn magi(&self) -> f64 {
        self.agi() + self.tax_exempt_interest
    }
}

/// Result of the annual computation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxResult {
    pub federal_ordinary: f64,
    pub long_term_gains: f64,
    pub niit: f64,
    pub amt: f64,
    pub state: f64,
    /// Always zero; FICA is settled monthly at withholding time
    pub fica_settled: f64,
    pub early_withdrawal_penalty: f64,
    /// Sum of all components above
    pub total: f64,
    /// Income tax withheld during the year
    pub withheld: f64,
    /// `total - withheld`: positive is owed, negative is a refund
    pub net_due: f64,
}

/// Compute the full-year tax for a summary
pub fn compute(tables: &TaxTables, summary: &YearIncomeSummary) -> TaxResult {
    let year = summary.year;
    let status = summary.filing_status;

    // Deduction: larger of standard and itemized
    let standard = tables.standard_deduction(year, status);
    let salt = summary
        .state_local_taxes_paid
        .min(tables.salt_cap(status) * tables.factor(year));
    let itemized = salt + summary.mortgage_interest_paid + summary.charitable;
    let deduction = standard.max(itemized);

    let taxable_ordinary = (summary.ordinary_income - deduction).max(0.0);
    let brackets = tables.ordinary_brackets(year, status);
    let federal_ordinary = tax_from_brackets(taxable_ordinary, &brackets);

    let long_term_gains = ltcg_tax(tables, year, status, taxable_ordinary, summary.long_term_gains);

    let niit = if summary.niit_enabled {
        let excess_magi = (summary.agi() - tables.niit_threshold(status)).max(0.0);
        NIIT_RATE * summary.investment_income.min(excess_magi)
    } else {
        0.0
    };

    let amt = if summary.amt_enabled {
        amt_owed(tables, summary, federal_ordinary + long_term_gains)
    } else {
        0.0
    };

    let state = state_component(tables, summary, deduction);

    let early_withdrawal_penalty = EARLY_WITHDRAWAL_PENALTY_RATE * summary.penalized_withdrawals;

    let total = federal_ordinary + long_term_gains + niit + amt + state + early_withdrawal_penalty;

    TaxResult {
        federal_ordinary,
        long_term_gains,
        niit,
        amt,
        state,
        fica_settled: 0.0,
        early_withdrawal_penalty,
        total,
        withheld: summary.withheld,
        net_due: total - summary.withheld,
    }
}

/// Long-term gains stack on top of ordinary taxable income and fill the
/// 0/15/20 brackets from there up.
fn ltcg_tax(
    tables: &TaxTables,
    year: i32,
    status: FilingStatus,
    ordinary_baseline: f64,
    gains: f64,
) -> f64 {
    if gains <= 0.0 {
        return 0.0;
    }
    let (zero_top, fifteen_top) = tables.ltcg_thresholds(year, status);

    let zero_band = (zero_top - ordinary_baseline).max(0.0).min(gains);
    let fifteen_band = ((fifteen_top - ordinary_baseline.max(zero_top)).max(0.0))
        .min(gains - zero_band);
    let twenty_band = gains - zero_band - fifteen_band;

    0.15 * fifteen_band + 0.20 * twenty_band
}

/// Simplified tentative-minimum-tax comparison
fn amt_owed(tables: &TaxTables, summary: &YearIncomeSummary, regular_federal: f64) -> f64 {
    let params = tables.amt_params(summary.year, summary.filing_status);
    // AMTI: AGI with no standard deduction or SALT
    let amti = summary.agi();
    let exemption =
        (params.exemption - 0.25 * (amti - params.phaseout_start).max(0.0)).max(0.0);
    let base = (amti - exemption).max(0.0);
    let tentative = 0.26 * base.min(params.rate_breakpoint)
        + 0.28 * (base - params.rate_breakpoint).max(0.0);
    (tentative - regular_federal).max(0.0)
}

fn state_component(tables: &TaxTables, summary: &YearIncomeSummary, deduction: f64) -> f64 {
    let taxable = (summary.agi() - deduction).max(0.0);
    if let Some(rate) = summary.state_rate_override {
        return rate * taxable;
    }
    states::state_tax(
        &summary.state,
        summary.filing_status,
        taxable,
        tables.factor(summary.year),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn summary(year: i32, status: FilingStatus) -> YearIncomeSummary {
        YearIncomeSummary {
            year,
            filing_status: status,
            state: "TX".into(),
            niit_enabled: true,
            amt_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_standard_deduction_applies() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        s.ordinary_income = 15_000.0;
        // Entirely inside the standard deduction
        let result = compute(&tables, &s);
        assert_eq!(result.federal_ordinary, 0.0);
        assert_eq!(result.total, 0.0);
    }

    #[test]
    fn test_mfj_ordinary_tax() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Mfj);
        s.ordinary_income = 130_000.0;
        let result = compute(&tables, &s);
        // Taxable 100,000: 23,850 @ 10% + 73,100 @ 12% + 3,050 @ 22%
        assert_relative_eq!(
            result.federal_ordinary,
            2_385.0 + 8_772.0 + 671.0,
            epsilon = 0.01
        );
    }

    #[test]
    fn test_ltcg_zero_bracket() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        // No ordinary income: gains below the 0% top (48,350) are untaxed
        s.long_term_gains = 40_000.0;
        let result = compute(&tables, &s);
        assert_eq!(result.long_term_gains, 0.0);
    }

    #[test]
    fn test_ltcg_stacking() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        s.ordinary_income = 115_000.0; // taxable 100,000 after deduction
        s.long_term_gains = 20_000.0;
        let result = compute(&tables, &s);
        // Baseline already above the 0% top, fully inside 15%
        assert_relative_eq!(result.long_term_gains, 3_000.0, epsilon = 0.01);
    }

    #[test]
    fn test_niit() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        s.ordinary_income = 210_000.0;
        s.investment_income = 50_000.0;
        let result = compute(&tables, &s);
        // AGI 210k is 10k over the threshold; NIIT on min(50k, 10k)
        assert_relative_eq!(result.niit, 0.038 * 10_000.0, epsilon = 0.01);
    }

    #[test]
    fn test_settlement_refund() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        s.ordinary_income = 60_000.0;
        s.withheld = 20_000.0;
        let result = compute(&tables, &s);
        assert!(result.net_due < 0.0, "over-withholding should refund");
        assert_relative_eq!(result.net_due, result.total - 20_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_itemized_beats_standard() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Mfj);
        s.ordinary_income = 200_000.0;
        s.state_local_taxes_paid = 25_000.0; // capped at 10,000
        s.mortgage_interest_paid = 18_000.0;
        s.charitable = 5_000.0;
        let result = compute(&tables, &s);
        // Itemized = 10,000 + 18,000 + 5,000 = 33,000 > 30,000 standard
        let taxable = 200_000.0 - 33_000.0;
        let expected = tax_from_brackets(
            taxable,
            &tables.ordinary_brackets(2025, FilingStatus::Mfj),
        );
        assert_relative_eq!(result.federal_ordinary, expected, epsilon = 0.01);
    }

    #[test]
    fn test_early_withdrawal_penalty() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        s.penalized_withdrawals = 30_000.0;
        let result = compute(&tables, &s);
        assert_relative_eq!(result.early_withdrawal_penalty, 3_000.0);
    }

    #[test]
    fn test_state_override() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        s.ordinary_income = 100_000.0;
        s.state_rate_override = Some(0.05);
        let result = compute(&tables, &s);
        let taxable = 100_000.0 - tables.standard_deduction(2025, FilingStatus::Single);
        assert_relative_eq!(result.state, 0.05 * taxable, epsilon = 0.01);
    }

    #[test]
    fn test_amt_kicks_in_on_large_exclusion_income() {
        let tables = TaxTables::new(0.03);
        let mut s = summary(2025, FilingStatus::Single);
        // Large itemized deductions shrink regular tax; AMT ignores them
        s.ordinary_income = 500_000.0;
        s.state_local_taxes_paid = 60_000.0;
        s.mortgage_interest_paid = 100_000.0;
        s.charitable = 150_000.0;
        let result = compute(&tables, &s);
        assert!(result.amt > 0.0, "expected AMT with heavy itemization");
    }
}
