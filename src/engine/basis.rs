//! Average-cost basis tracking for taxable accounts
//!
//! Contributions and reinvested dividends add to basis dollar for dollar.
//! A withdrawal consumes basis in proportion to the account balance; the
//! complement is the realized gain. Tax-advantaged accounts are not tracked
//! here (their withdrawals are fully ordinary or fully tax-free by kind).

/// Basis consumed and gain realized by one withdrawal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalSplit {
    pub basis_consumed: f64,
    pub realized_gain: f64,
}

/// Running average-cost basis for one account
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBasis {
    pub total: f64,
}

impl CostBasis {
    pub fn new(total: f64) -> Self {
        Self { total }
    }

    /// Record invested dollars (contribution or reinvested dividend)
    pub fn add(&mut self, amount: f64) {
        self.total += amount;
    }

    /// Consume basis for a withdrawal of `amount` from an account whose
    /// balance was `balance_before`. A zero balance yields zero gain.
    pub fn withdraw(&mut self, amount: f64, balance_before: f64) -> WithdrawalSplit {
        if amount <= 0.0 || balance_before <= 0.0 {
            return WithdrawalSplit {
                basis_consumed: 0.0,
                realized_gain: 0.0,
            };
        }
        let ratio = (self.total / balance_before).clamp(0.0, 1.0);
        let basis_consumed = (amount * ratio).min(self.total);
        self.total -= basis_consumed;
        WithdrawalSplit {
            basis_consumed,
            realized_gain: (amount - basis_consumed).max(0.0),
        }
    }

    /// Keep basis within the balance after market moves shrink the account
    pub fn clamp_to(&mut self, balance: f64) {
        if self.total > balance {
            self.total = balance.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_proportional_attribution() {
        // 60% basis: a 10,000 withdrawal consumes 6,000 basis, gains 4,000
        let mut basis = CostBasis::new(60_000.0);
        let split = basis.withdraw(10_000.0, 100_000.0);
        assert_relative_eq!(split.basis_consumed, 6_000.0);
        assert_relative_eq!(split.realized_gain, 4_000.0);
        assert_relative_eq!(basis.total, 54_000.0);
    }

    #[test]
    fn test_full_drain_zeroes_basis() {
        let mut basis = CostBasis::new(60_000.0);
        let split = basis.withdraw(100_000.0, 100_000.0);
        assert_relative_eq!(split.basis_consumed, 60_000.0);
        assert_relative_eq!(split.realized_gain, 40_000.0);
        assert_relative_eq!(basis.total, 0.0);
    }

    #[test]
    fn test_zero_balance_guard() {
        let mut basis = CostBasis::new(10.0);
        let split = basis.withdraw(100.0, 0.0);
        assert_eq!(split.realized_gain, 0.0);
        assert_eq!(split.basis_consumed, 0.0);
    }

    #[test]
    fn test_clamp_after_losses() {
        let mut basis = CostBasis::new(100_000.0);
        basis.clamp_to(80_000.0);
        assert_relative_eq!(basis.total, 80_000.0);
    }
}
