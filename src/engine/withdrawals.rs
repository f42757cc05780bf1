//! Prioritized withdrawal strategy for covering cash shortfalls
//!
//! Given a shortfall, drains accounts in the configured order until covered
//! or every eligible account is empty. Each draw is split into its tax
//! categories and tagged with any early-withdrawal penalty; the caller
//! applies those amounts to the year-to-date accumulators.

use crate::engine::results::WithdrawalRecord;
use crate::engine::state::PlanState;
use crate::plan::AccountKind;

/// Age threshold for the early-withdrawal penalty: 59 years 6 months
const PENALTY_FREE_AGE_MONTHS: u32 = 59 * 12 + 6;

/// Outcome of a shortfall-coverage pass
#[derive(Debug, Clone, Default)]
pub struct WithdrawalOutcome {
    pub draws: Vec<WithdrawalRecord>,
    /// Shortfall that could not be covered
    pub uncovered: f64,
}

impl WithdrawalOutcome {
    pub fn total_drawn(&self) -> f64 {
        self.draws.iter().map(|d| d.amount).sum()
    }
}

/// Drain accounts in `order` to cover `shortfall`, crediting the primary
/// cash account with everything drawn.
pub fn cover_shortfall(state: &mut PlanState, order: &[String], shortfall: f64) -> WithdrawalOutcome {
    let mut outcome = WithdrawalOutcome::default();
    let mut remaining = shortfall;

    for name in order {
        if remaining <= 1e-9 {
            break;
        }
        let Some(account) = state.accounts.get_mut(name) else {
            continue;
        };
        if !account.allow_withdrawals || account.balance <= 0.0 {
            continue;
        }
        let draw = remaining.min(account.balance);
        let balance_before = account.balance;
        account.balance -= draw;
        // Negative balances are exhaustion; clamp
        if account.balance < 0.0 {
            account.balance = 0.0;
        }
        let kind = account.kind;
        let owner = account.owner;
        let under_penalty_age = state.age_months(owner) < PENALTY_FREE_AGE_MONTHS;

        let mut record = WithdrawalRecord {
            account: name.clone(),
            amount: draw,
            ordinary_income: 0.0,
            taxable_gain: 0.0,
            penalized: 0.0,
        };

        match kind {
            AccountKind::Traditional401k | AccountKind::TraditionalIra => {
                record.ordinary_income = draw;
                if under_penalty_age {
                    record.penalized = draw;
                }
            }
            AccountKind::TaxableBrokerage => {
                if let Some(basis) = state.basis.get_mut(name) {
                    record.taxable_gain = basis.withdraw(draw, balance_before).realized_gain;
                }
            }
            AccountKind::RothIra => {
                // Earnings approximation: anything beyond cumulative
                // tracked contributions
                let contributions = state.roth_contributions.entry(name.clone()).or_insert(0.0);
                let from_contributions = draw.min(*contributions);
                *contributions -= from_contributions;
                let earnings = draw - from_contributions;
                if under_penalty_age {
                    record.penalized = earnings;
                }
            }
            // HSA and 529 withdrawals are treated as qualified; cash and
            // other accounts carry no tax consequence
            AccountKind::Hsa
            | AccountKind::CollegeSavings
            | AccountKind::Cash
            | AccountKind::Other => {}
        }

        remaining -= draw;
        state.credit_cash(draw);
        outcome.draws.push(record);
    }

    outcome.uncovered = remaining.max(0.0);
    outcome
}
