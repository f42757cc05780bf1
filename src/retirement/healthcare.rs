//! Phase-based monthly healthcare cost model
//!
//! Before 65 an optional pre-Medicare policy applies; from 65 (or an
//! explicit earlier Medicare start) Part B, supplement, and Part D premiums
//! apply, plus an IRMAA surcharge looked up from MAGI recorded two Decembers
//! ago (configurable lookback).

use crate::plan::{FilingStatus, HealthcarePlan, YearMonth};
use crate::tax::TaxTables;

const MEDICARE_AGE_MONTHS: u32 = 65 * 12;

/// One person's healthcare cost for one month
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthcareCost {
    pub premiums: f64,
    pub out_of_pocket: f64,
    pub irmaa: f64,
}

impl HealthcareCost {
    pub fn total(&self) -> f64 {
        self.premiums + self.out_of_pocket + self.irmaa
    }
}

/// Whether the person is on Medicare this month
pub fn on_medicare(plan: &HealthcarePlan, current: YearMonth, age_months: u32) -> bool {
    if age_months >= MEDICARE_AGE_MONTHS {
        return true;
    }
    matches!(plan.medicare_start_date, Some(start) if current >= start)
}

/// Monthly cost for one person. `lookback_magi` resolves the MAGI recorded
/// `n` calendar years before the current one, if any was recorded.
pub fn monthly_cost(
    plan: &HealthcarePlan,
    tables: &TaxTables,
    status: FilingStatus,
    current: YearMonth,
    age_months: u32,
    plan_start: YearMonth,
    inflation: f64,
    lookback_magi: impl Fn(u32) -> Option<f64>,
) -> HealthcareCost {
    let years = current.whole_years_since(plan_start);

    if on_medicare(plan, current, age_months) {
        let Some(medicare) = &plan.medicare else {
            return HealthcareCost::default();
        };
        let rate = medicare.change_over_time;
        let change = medicare.change_rate.unwrap_or(0.0);
        let premiums = rate.apply(
            medicare.part_b + medicare.supplement + medicare.part_d,
            inflation,
            change,
            years,
        );
        let out_of_pocket =
            rate.apply(medicare.annual_out_of_pocket / 12.0, inflation, change, years);
        let irmaa = lookback_magi(medicare.irmaa_lookback_years)
            .map(|magi| tables.irmaa_monthly_surcharge(current.year, status, magi))
            .unwrap_or(0.0);
        HealthcareCost {
            premiums,
            out_of_pocket,
            irmaa,
        }
    } else if let Some(policy) = &plan.pre_medicare {
        let change = policy.change_rate.unwrap_or(0.0);
        HealthcareCost {
            premiums: policy
                .change_over_time
                .apply(policy.monthly_premium, inflation, change, years),
            out_of_pocket: policy.change_over_time.apply(
                policy.annual_out_of_pocket / 12.0,
                inflation,
                change,
                years,
            ),
            irmaa: 0.0,
        }
    } else {
        HealthcareCost::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ChangePolicy, MedicareConfig, Owner, PreMedicarePolicy};
    use approx::assert_relative_eq;

    fn plan() -> HealthcarePlan {
        HealthcarePlan {
            owner: Owner::Primary,
            pre_medicare: Some(PreMedicarePolicy {
                monthly_premium: 800.0,
                annual_out_of_pocket: 2_400.0,
                change_over_time: ChangePolicy::Fixed,
                change_rate: None,
            }),
            medicare_start_date: None,
            medicare: Some(MedicareConfig {
                part_b: 185.0,
                supplement: 150.0,
                part_d: 40.0,
                annual_out_of_pocket: 1_200.0,
                irmaa_lookback_years: 2,
                change_over_time: ChangePolicy::Fixed,
                change_rate: None,
            }),
        }
    }

    #[test]
    fn test_pre_medicare_phase() {
        let tables = TaxTables::new(0.03);
        let cost = monthly_cost(
            &plan(),
            &tables,
            FilingStatus::Single,
            YearMonth::new(2025, 6),
            60 * 12,
            YearMonth::new(2025, 1),
            0.03,
            |_| None,
        );
        assert_relative_eq!(cost.premiums, 800.0);
        assert_relative_eq!(cost.out_of_pocket, 200.0);
        assert_eq!(cost.irmaa, 0.0);
    }

    #[test]
    fn test_medicare_phase_at_65() {
        let tables = TaxTables::new(0.03);
        let cost = monthly_cost(
            &plan(),
            &tables,
            FilingStatus::Single,
            YearMonth::new(2025, 6),
            65 * 12,
            YearMonth::new(2025, 1),
            0.03,
            |_| None,
        );
        assert_relative_eq!(cost.premiums, 375.0);
        assert_relative_eq!(cost.out_of_pocket, 100.0);
    }

    #[test]
    fn test_irmaa_surcharge_from_lookback() {
        let tables = TaxTables::new(0.03);
        let cost = monthly_cost(
            &plan(),
            &tables,
            FilingStatus::Single,
            YearMonth::new(2025, 6),
            66 * 12,
            YearMonth::new(2025, 1),
            0.03,
            |years_back| {
                assert_eq!(years_back, 2);
                Some(150_000.0)
            },
        );
        // 150,000 MAGI falls in the second 2025 single tier
        assert_relative_eq!(cost.irmaa, 185.00 + 35.30);
    }

    #[test]
    fn test_explicit_medicare_start() {
        let tables = TaxTables::new(0.03);
        let mut p = plan();
        p.medicare_start_date = Some(YearMonth::new(2025, 3));
        let cost = monthly_cost(
            &p,
            &tables,
            FilingStatus::Single,
            YearMonth::new(2025, 4),
            63 * 12,
            YearMonth::new(2025, 1),
            0.03,
            |_| None,
        );
        assert_relative_eq!(cost.premiums, 375.0);
    }
}
