//! Monthly payroll taxes with year-to-date wage-base tracking
//!
//! Social Security tax stops at the annual wage base per person; the
//! Additional Medicare surtax starts at the household filing-status
//! threshold. Both need running YTD totals, which the caller supplies.

use crate::plan::FilingStatus;
use crate::tax::tables::{
    TaxTables, ADDITIONAL_MEDICARE_RATE, MEDICARE_RATE, SE_NET_EARNINGS_FACTOR, SS_RATE,
};

/// Payroll tax withheld on one month of wages or self-employment income
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayrollTax {
    pub social_security: f64,
    pub medicare: f64,
    pub additional_medicare: f64,
}

impl PayrollTax {
    pub fn total(&self) -> f64 {
        self.social_security + self.medicare + self.additional_medicare
    }
}

/// Employee FICA on one month of W-2 wages
///
/// `ytd_person_wages` is the owner's wages before this payment (for the
/// wage base); `ytd_household_wages` covers both spouses (for the surtax).
pub fn wage_fica(
    tables: &TaxTables,
    year: i32,
    status: FilingStatus,
    wages: f64,
    ytd_person_wages: f64,
    ytd_household_wages: f64,
) -> PayrollTax {
    if wages <= 0.0 {
        return PayrollTax::default();
    }
    let wage_base = tables.ss_wage_base(year);
    let ss_taxable = wages.min((wage_base - ytd_person_wages).max(0.0));

    PayrollTax {
        social_security: SS_RATE * ss_taxable,
        medicare: MEDICARE_RATE * wages,
        additional_medicare: ADDITIONAL_MEDICARE_RATE
            * surtax_portion(tables, status, wages, ytd_household_wages),
    }
}

/// Self-employment tax on one month of net business income
///
/// Both halves of Social Security and Medicare apply, on the standard
/// net-earnings fraction of the gross amount.
pub fn self_employment_tax(
    tables: &TaxTables,
    year: i32,
    status: FilingStatus,
    income: f64,
    ytd_person_wages: f64,
    ytd_household_wages: f64,
) -> PayrollTax {
    if income <= 0.0 {
        return PayrollTax::default();
    }
    let net_earnings = income * SE_NET_EARNINGS_FACTOR;
    let wage_base = tables.ss_wage_base(year);
    let ss_taxable = net_earnings.min((wage_base - ytd_person_wages).max(0.0));

    PayrollTax {
        social_security: 2.0 * SS_RATE * ss_taxable,
        medicare: 2.0 * MEDICARE_RATE * net_earnings,
        additional_medicare: ADDITIONAL_MEDICARE_RATE
            * surtax_portion(tables, status, net_earnings, ytd_household_wages),
    }
}

/// Portion of this month's earnings above the Additional Medicare threshold
fn surtax_portion(
    tables: &TaxTables,
    status: FilingStatus,
    earnings: f64,
    ytd_household: f64,
) -> f64 {
    let threshold = tables.additional_medicare_threshold(status);
    (ytd_household + earnings - threshold.max(ytd_household)).max(0.0)
}
