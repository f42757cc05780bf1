//! Roth conversion amounts
//!
//! Fixed schedules convert a twelfth of the annual amount each month.
//! Bracket-fill schedules act only in December and top ordinary income up
//! to the boundary of the named marginal bracket.

use crate::plan::{FilingStatus, RothConversion, RothStrategy, YearMonth};
use crate::tax::TaxTables;

/// Amount to convert this month under a schedule, capped by the source
/// account balance. `ytd_ordinary_income` must include everything that will
/// count as ordinary income this year before the conversion itself.
pub fn conversion_amount(
    conversion: &RothConversion,
    tables: &TaxTables,
    status: FilingStatus,
    current: YearMonth,
    ytd_ordinary_income: f64,
    source_balance: f64,
) -> f64 {
    if current < conversion.start_date || current > conversion.end_date {
        return 0.0;
    }
    let amount = match &conversion.strategy {
        RothStrategy::Fixed { annual_amount } => annual_amount / 12.0,
        RothStrategy::FillBracket { bracket } => {
            if !current.is_december() {
                return 0.0;
            }
            match tables.bracket_top_for_rate(current.year, status, bracket) {
                Some(top) => (top - ytd_ordinary_income).max(0.0),
                None => 0.0,
            }
        }
    };
    amount.min(source_balance).max(0.0)
}
