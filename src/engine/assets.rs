//! Real-asset state: appreciation, mortgage amortization, and sales
//!
//! Mortgages amortize with the standard annuity split; the record detaches
//! as soon as the balance reaches zero, whether by schedule or early. Sales
//! apply the primary-residence exclusion by filing status.

use crate::plan::{ChangePolicy, FilingStatus, MaintenanceItem, Mortgage, RealAsset, YearMonth};

/// Mutable mortgage state during a run
#[derive(Debug, Clone)]
pub struct MortgageState {
    pub monthly_payment: f64,
    pub remaining_balance: f64,
    pub annual_rate: f64,
    pub end_date: YearMonth,
}

/// One month's amortization split
#[derive(Debug, Clone, Copy, Default)]
pub struct MortgagePayment {
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub paid_off: bool,
}

impl MortgageState {
    fn from_input(m: &Mortgage) -> Self {
        Self {
            monthly_payment: m.monthly_payment,
            remaining_balance: m.remaining_balance,
            annual_rate: m.interest_rate,
            end_date: m.end_date,
        }
    }

    /// Standard annuity split: interest on the outstanding balance at the
    /// monthly rate, remainder of the payment to principal. The final
    /// payment shrinks so the balance never goes negative.
    pub fn amortize(&mut self, current: YearMonth) -> MortgagePayment {
        if self.remaining_balance <= 0.0 || current > self.end_date {
            return MortgagePayment {
                paid_off: true,
                ..Default::default()
            };
        }
        let interest = self.remaining_balance * self.annual_rate / 12.0;
        let principal = (self.monthly_payment - interest).min(self.remaining_balance);
        let principal = principal.max(0.0);
        self.remaining_balance -= principal;
        MortgagePayment {
            payment: interest + principal,
            interest,
            principal,
            paid_off: self.remaining_balance <= 1e-9,
        }
    }
}

/// Mutable real-asset state during a run
#[derive(Debug, Clone)]
pub struct RealAssetState {
    pub name: String,
    pub value: f64,
    pub purchase_price: Option<f64>,
    pub primary_residence: bool,
    pub change_policy: ChangePolicy,
    pub change_rate: Option<f64>,
    pub property_tax_rate: f64,
    pub mortgage: Option<MortgageState>,
    pub maintenance: Vec<MaintenanceItem>,
    /// Month the asset entered the plan, for maintenance-item growth
    pub acquired: YearMonth,
}

impl RealAssetState {
    pub fn from_input(asset: &RealAsset, plan_start: YearMonth) -> Self {
        Self {
            name: asset.name.clone(),
            value: asset.value,
            purchase_price: asset.purchase_price,
            primary_residence: asset.primary_residence,
            change_policy: asset.change_policy,
            change_rate: asset.change_rate,
            property_tax_rate: asset.property_tax_rate,
            mortgage: asset.mortgage.as_ref().map(MortgageState::from_input),
            maintenance: asset.maintenance.clone(),
            acquired: plan_start,
        }
    }

    /// A new asset created by a buy_asset transaction
    pub fn purchased(name: &str, amount: f64, date: YearMonth) -> Self {
        Self {
            name: name.to_string(),
            value: amount,
            purchase_price: Some(amount),
            primary_residence: false,
            change_policy: ChangePolicy::MatchInflation,
            change_rate: None,
            property_tax_rate: 0.0,
            mortgage: None,
            maintenance: Vec::new(),
            acquired: date,
        }
    }

    /// Apply one month of appreciation under the change policy
    pub fn appreciate_monthly(&mut self, inflation: f64) {
        let annual = self
            .change_policy
            .annual_rate(inflation, self.change_rate.unwrap_or(0.0));
        self.value *= (1.0 + annual).powf(1.0 / 12.0);
    }

    /// Property tax accrued this month
    pub fn monthly_property_tax(&self) -> f64 {
        self.property_tax_rate * self.value / 12.0
    }

    /// Net equity (value minus mortgage balance)
    pub fn equity(&self) -> f64 {
        let owed = self
            .mortgage
            .as_ref()
            .map(|m| m.remaining_balance)
            .unwrap_or(0.0);
        self.value - owed
    }
}

/// Primary-residence capital-gain exclusion by filing status
pub fn residence_exclusion(status: FilingStatus) -> f64 {
    match status {
        FilingStatus::Mfj | FilingStatus::Qss => 500_000.0,
        _ => 250_000.0,
    }
}

/// Taxable gain on a sale: amount over purchase price, less the exclusion
/// for a primary residence, floored at zero.
pub fn sale_gain(asset: &RealAssetState, sale_amount: f64, status: FilingStatus) -> f64 {
    let purchase = asset.purchase_price.unwrap_or(asset.value);
    let gain = sale_amount - purchase;
    let excluded = if asset.primary_residence {
        residence_exclusion(status)
    } else {
        0.0
    };
    (gain - excluded).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mortgage(balance: f64, rate: f64, payment: f64) -> MortgageState {
        MortgageState {
            monthly_payment: payment,
            remaining_balance: balance,
            annual_rate: rate,
            end_date: YearMonth::new(2055, 12),
        }
    }

    #[test]
    fn test_amortization_split() {
        let mut m = mortgage(300_000.0, 0.06, 2_000.0);
        let paid = m.amortize(YearMonth::new(2025, 1));
        assert_relative_eq!(paid.interest, 1_500.0);
        assert_relative_eq!(paid.principal, 500.0);
        assert_relative_eq!(m.remaining_balance, 299_500.0);
    }

    #[test]
    fn test_final_payment_never_overshoots() {
        let mut m = mortgage(800.0, 0.06, 2_000.0);
        let paid = m.amortize(YearMonth::new(2025, 1));
        assert_relative_eq!(paid.interest, 4.0);
        assert_relative_eq!(paid.principal, 800.0);
        assert!(paid.paid_off);
        assert_relative_eq!(m.remaining_balance, 0.0);
    }

    #[test]
    fn test_principal_sums_to_initial_balance() {
        let mut m = mortgage(10_000.0, 0.05, 500.0);
        let mut total_principal = 0.0;
        let mut month = YearMonth::new(2025, 1);
        for _ in 0..60 {
            let paid = m.amortize(month);
            total_principal += paid.principal;
            month = month.plus_months(1);
            if paid.paid_off {
                break;
            }
        }
        assert_relative_eq!(total_principal, 10_000.0, epsilon = 0.01);
        assert!(m.remaining_balance <= 0.01);
    }

    #[test]
    fn test_primary_residence_exclusion() {
        let asset = RealAssetState {
            name: "home".into(),
            value: 1_000_000.0,
            purchase_price: Some(320_000.0),
            primary_residence: true,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            property_tax_rate: 0.0,
            mortgage: None,
            maintenance: Vec::new(),
            acquired: YearMonth::new(2020, 1),
        };
        // MFJ: 1,000,000 - 320,000 - 500,000 = 180,000
        assert_relative_eq!(sale_gain(&asset, 1_000_000.0, FilingStatus::Mfj), 180_000.0);
        // Single exclusion is 250,000
        assert_relative_eq!(
            sale_gain(&asset, 1_000_000.0, FilingStatus::Single),
            430_000.0
        );
    }

    #[test]
    fn test_exclusion_floors_at_zero() {
        let asset = RealAssetState {
            name: "home".into(),
            value: 400_000.0,
            purchase_price: Some(300_000.0),
            primary_residence: true,
            change_policy: ChangePolicy::Fixed,
            change_rate: None,
            property_tax_rate: 0.0,
            mortgage: None,
            maintenance: Vec::new(),
            acquired: YearMonth::new(2020, 1),
        };
        assert_eq!(sale_gain(&asset, 400_000.0, FilingStatus::Single), 0.0);
    }
}
