//! Social Security benefit computation
//!
//! Converts a Primary Insurance Amount at Full Retirement Age into the
//! benefit paid at the planned claiming age, applies the annual COLA, and
//! determines the taxable portion under the combined-income rule.

use crate::plan::{FilingStatus, Person, SocialSecurityConfig, YearMonth};

/// Claiming-age adjustment factor relative to FRA
///
/// Early claiming reduces the benefit by 5/9 of 1% per month for the first
/// 36 months and 5/12 of 1% per month beyond that. Delayed claiming earns
/// 2/3 of 1% per month, up to age 70.
pub fn claiming_adjustment(fra_months: u32, claim_months: u32) -> f64 {
    if claim_months < fra_months {
        let early = (fra_months - claim_months) as f64;
        let first = early.min(36.0);
        let rest = (early - 36.0).max(0.0);
        1.0 - first * (5.0 / 900.0) - rest * (5.0 / 1200.0)
    } else {
        let delayed = (claim_months.min(70 * 12) - fra_months) as f64;
        1.0 + delayed * (2.0 / 300.0)
    }
}

/// Monthly benefit at claim time, before COLA
///
/// The spousal top-up applies when the claimant's own adjusted benefit is
/// below half the spouse's adjusted PIA: the claimant then receives the
/// larger of their own benefit and half the spouse's PIA scaled by the
/// claimant's own early/late factor.
pub fn base_monthly_benefit(
    own: &SocialSecurityConfig,
    spouse: Option<&SocialSecurityConfig>,
) -> f64 {
    let own_factor = claiming_adjustment(
        own.full_retirement_age.total_months(),
        own.claim_age.total_months(),
    );
    let own_benefit = own.monthly_pia * own_factor;

    if let Some(sp) = spouse {
        let sp_factor = claiming_adjustment(
            sp.full_retirement_age.total_months(),
            sp.claim_age.total_months(),
        );
        let sp_adjusted = sp.monthly_pia * sp_factor;
        if own_benefit < 0.5 * sp_adjusted {
            return own_benefit.max(0.5 * sp.monthly_pia * own_factor);
        }
    }
    own_benefit
}

/// The calendar month benefits begin for a person under this config
pub fn claim_month(person: &Person, config: &SocialSecurityConfig) -> YearMonth {
    person
        .birth_date
        .plus_months(config.claim_age.total_months() as i64)
}

/// Benefit paid in a given month: zero before claiming, otherwise the base
/// benefit grown by COLA for each whole year since claiming.
pub fn benefit_for_month(
    person: &Person,
    own: &SocialSecurityConfig,
    spouse: Option<&SocialSecurityConfig>,
    current: YearMonth,
) -> f64 {
    let start = claim_month(person, own);
    if current < start {
        return 0.0;
    }
    let base = base_monthly_benefit(own, spouse);
    let years = current.whole_years_since(start);
    base * (1.0 + own.cola_assumption).powi(years as i32)
}

/// Taxable portion of annual Social Security benefits
///
/// `other_income` is AGI excluding benefits; combined income adds half the
/// benefits and tax-exempt interest, then the two-threshold rule includes
/// 0%, up to 50%, or up to 85% of benefits in ordinary income.
pub fn taxable_benefits(
    annual_benefits: f64,
    other_income: f64,
    tax_exempt_interest: f64,
    status: FilingStatus,
) -> f64 {
    if annual_benefits <= 0.0 {
        return 0.0;
    }
    let (base, upper) = match status {
        FilingStatus::Mfj | FilingStatus::Qss => (32_000.0, 44_000.0),
        FilingStatus::Mfs => (0.0, 0.0),
        _ => (25_000.0, 34_000.0),
    };
    let combined = other_income + 0.5 * annual_benefits + tax_exempt_interest;

    if combined <= base {
        0.0
    } else if combined <= upper {
        (0.5 * (combined - base)).min(0.5 * annual_benefits)
    } else {
        let fifty_tier = (0.5 * (upper - base)).min(0.5 * annual_benefits);
        (0.85 * (combined - upper) + fifty_tier).min(0.85 * annual_benefits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::AgeSpec;
    use approx::assert_relative_eq;

    fn config(pia: f64, claim_years: u32, claim_months: u32) -> SocialSecurityConfig {
        SocialSecurityConfig {
            owner: crate::plan::Owner::Primary,
            monthly_pia: pia,
            full_retirement_age: AgeSpec { years: 67, months: 0 },
            claim_age: AgeSpec {
                years: claim_years,
                months: claim_months,
            },
            cola_assumption: 0.02,
        }
    }

    #[test]
    fn test_claim_at_fra_is_unadjusted() {
        assert_relative_eq!(claiming_adjustment(67 * 12, 67 * 12), 1.0);
    }

    #[test]
    fn test_early_claiming_at_62() {
        // 60 months early: 36 * 5/9% + 24 * 5/12% = 20% + 10% = 30% reduction
        let factor = claiming_adjustment(67 * 12, 62 * 12);
        assert_relative_eq!(factor, 0.70, epsilon = 1e-9);
    }

    #[test]
    fn test_delayed_claiming_at_70() {
        // 36 months delayed: 36 * 2/3% = 24% increase
        let factor = claiming_adjustment(67 * 12, 70 * 12);
        assert_relative_eq!(factor, 1.24, epsilon = 1e-9);
        // Claiming past 70 earns nothing further
        assert_relative_eq!(claiming_adjustment(67 * 12, 71 * 12), 1.24, epsilon = 1e-9);
    }

    #[test]
    fn test_spousal_top_up() {
        let low = config(400.0, 67, 0);
        let high = config(2_400.0, 67, 0);
        // Own benefit 400 < half of spouse's 2,400; bumped to 1,200
        let benefit = base_monthly_benefit(&low, Some(&high));
        assert_relative_eq!(benefit, 1_200.0);
        // The higher earner keeps their own benefit
        let other = base_monthly_benefit(&high, Some(&low));
        assert_relative_eq!(other, 2_400.0);
    }

    #[test]
    fn test_spousal_top_up_scaled_by_own_factor() {
        let low = config(400.0, 62, 0); // 0.70 factor
        let high = config(2_400.0, 67, 0);
        let benefit = base_monthly_benefit(&low, Some(&high));
        assert_relative_eq!(benefit, 0.5 * 2_400.0 * 0.70, epsilon = 1e-9);
    }

    #[test]
    fn test_taxability_tiers() {
        // Below the base threshold: nothing taxable
        assert_eq!(
            taxable_benefits(20_000.0, 10_000.0, 0.0, FilingStatus::Single),
            0.0
        );
        // High income: capped at 85%
        let t = taxable_benefits(30_000.0, 200_000.0, 0.0, FilingStatus::Single);
        assert_relative_eq!(t, 0.85 * 30_000.0);
        // Middle band: 50% of excess over base
        let mid = taxable_benefits(10_000.0, 22_000.0, 0.0, FilingStatus::Single);
        // Combined = 27,000; excess 2,000; half = 1,000
        assert_relative_eq!(mid, 1_000.0);
    }

    #[test]
    fn test_cola_growth() {
        let person = Person {
            name: "p".into(),
            birth_date: YearMonth::new(1958, 1),
        };
        let cfg = config(2_000.0, 67, 0);
        let start = claim_month(&person, &cfg);
        assert_eq!(start, YearMonth::new(2025, 1));
        let first = benefit_for_month(&person, &cfg, None, start);
        assert_relative_eq!(first, 2_000.0);
        let later = benefit_for_month(&person, &cfg, None, start.plus_months(24));
        assert_relative_eq!(later, 2_000.0 * 1.02f64.powi(2), epsilon = 1e-9);
        // Nothing before claiming
        assert_eq!(
            benefit_for_month(&person, &cfg, None, start.plus_months(-1)),
            0.0
        );
    }
}
