//! Federal tax tables keyed by (year, filing status)
//!
//! Bundled data covers 2024 and 2025. Years beyond the last bundled year
//! extrapolate every threshold by `(1 + inflation)^(year - last_bundled)`;
//! years before the first bundled year use the first year's tables.

use crate::plan::FilingStatus;

/// Last calendar year with bundled threshold data
pub const LAST_BUNDLED_YEAR: i32 = 2025;
const FIRST_BUNDLED_YEAR: i32 = 2024;

/// Social Security (OASDI) employee rate
pub const SS_RATE: f64 = 0.062;
/// Medicare employee rate on all wages
pub const MEDICARE_RATE: f64 = 0.0145;
/// Additional Medicare surtax above the filing-status threshold
pub const ADDITIONAL_MEDICARE_RATE: f64 = 0.009;
/// Net-earnings factor for self-employment tax
pub const SE_NET_EARNINGS_FACTOR: f64 = 0.9235;
/// NIIT rate on net investment income
pub const NIIT_RATE: f64 = 0.038;
/// Penalty rate on early retirement-account withdrawals
pub const EARLY_WITHDRAWAL_PENALTY_RATE: f64 = 0.10;

/// One marginal bracket: `rate` applies up to `upper` (cumulative income)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub rate: f64,
    pub upper: f64,
}

/// Sum piecewise tax over a bracket schedule
pub fn tax_from_brackets(taxable: f64, brackets: &[Bracket]) -> f64 {
    let mut tax = 0.0;
    let mut lower = 0.0;
    for b in brackets {
        if taxable <= lower {
            break;
        }
        tax += (taxable.min(b.upper) - lower) * b.rate;
        lower = b.upper;
    }
    tax
}

/// AMT parameters for one (year, status)
#[derive(Debug, Clone, Copy)]
pub struct AmtParams {
    pub exemption: f64,
    /// AMTI above this phases the exemption out at 25 cents per dollar
    pub phaseout_start: f64,
    /// 26% applies up to this base amount, 28% above
    pub rate_breakpoint: f64,
}

/// One IRMAA tier: MAGI above `magi_over` pays the monthly surcharges
#[derive(Debug, Clone, Copy)]
pub struct IrmaaTier {
    pub magi_over: f64,
    pub part_b_surcharge: f64,
    pub part_d_surcharge: f64,
}

const ORDINARY_RATES: [f64; 7] = [0.10, 0.12, 0.22, 0.24, 0.32, 0.35, 0.37];

// Bracket tops per status, bundled years. The final 37% bracket is unbounded.
const SINGLE_TOPS_2024: [f64; 6] = [11_600.0, 47_150.0, 100_525.0, 191_950.0, 243_725.0, 609_350.0];
const MFJ_TOPS_2024: [f64; 6] = [23_200.0, 94_300.0, 201_050.0, 383_900.0, 487_450.0, 731_200.0];
const MFS_TOPS_2024: [f64; 6] = [11_600.0, 47_150.0, 100_525.0, 191_950.0, 243_725.0, 365_600.0];
const HOH_TOPS_2024: [f64; 6] = [16_550.0, 63_100.0, 100_500.0, 191_950.0, 243_700.0, 609_350.0];

const SINGLE_TOPS_2025: [f64; 6] = [11_925.0, 48_475.0, 103_350.0, 197_300.0, 250_525.0, 626_350.0];
const MFJ_TOPS_2025: [f64; 6] = [23_850.0, 96_950.0, 206_700.0, 394_600.0, 501_050.0, 751_600.0];
const MFS_TOPS_2025: [f64; 6] = [11_925.0, 48_475.0, 103_350.0, 197_300.0, 250_525.0, 375_800.0];
const HOH_TOPS_2025: [f64; 6] = [17_000.0, 64_850.0, 103_350.0, 197_300.0, 250_500.0, 626_350.0];

/// Federal tax tables with inflation extrapolation past the bundled years
#[derive(Debug, Clone)]
pub struct TaxTables {
    inflation_rate: f64,
}

impl TaxTables {
    pub fn new(inflation_rate: f64) -> Self {
        Self { inflation_rate }
    }

    /// Extrapolation factor for a given year (1.0 within the bundled range)
    pub fn factor(&self, year: i32) -> f64 {
        if year > LAST_BUNDLED_YEAR {
            (1.0 + self.inflation_rate).powi(year - LAST_BUNDLED_YEAR)
        } else {
            1.0
        }
    }

    fn bundled_year(year: i32) -> i32 {
        year.clamp(FIRST_BUNDLED_YEAR, LAST_BUNDLED_YEAR)
    }

    fn ordinary_tops(year: i32, status: FilingStatus) -> &'static [f64; 6] {
        match (Self::bundled_year(year), status) {
            (2024, FilingStatus::Single) => &SINGLE_TOPS_2024,
            (2024, FilingStatus::Mfj | FilingStatus::Qss) => &MFJ_TOPS_2024,
            (2024, FilingStatus::Mfs) => &MFS_TOPS_2024,
            (2024, FilingStatus::Hoh) => &HOH_TOPS_2024,
            (_, FilingStatus::Single) => &SINGLE_TOPS_2025,
            (_, FilingStatus::Mfj | FilingStatus::Qss) => &MFJ_TOPS_2025,
            (_, FilingStatus::Mfs) => &MFS_TOPS_2025,
            (_, FilingStatus::Hoh) => &HOH_TOPS_2025,
        }
    }

    /// Ordinary income bracket schedule for (year, status)
    pub fn ordinary_brackets(&self, year: i32, status: FilingStatus) -> Vec<Bracket> {
        let f = self.factor(year);
        let tops = Self::ordinary_tops(year, status);
        let mut brackets: Vec<Bracket> = tops
            .iter()
            .zip(ORDINARY_RATES.iter())
            .map(|(&upper, &rate)| Bracket { rate, upper: upper * f })
            .collect();
        brackets.push(Bracket {
            rate: ORDINARY_RATES[6],
            upper: f64::INFINITY,
        });
        brackets
    }

    /// Top of the bracket whose marginal rate matches `rate_name` (e.g. "22%")
    pub fn bracket_top_for_rate(
        &self,
        year: i32,
        status: FilingStatus,
        rate_name: &str,
    ) -> Option<f64> {
        let pct: f64 = rate_name.trim().trim_end_matches('%').parse().ok()?;
        let rate = pct / 100.0;
        self.ordinary_brackets(year, status)
            .iter()
            .find(|b| (b.rate - rate).abs() < 1e-9)
            .map(|b| b.upper)
            .filter(|u| u.is_finite())
    }

    pub fn standard_deduction(&self, year: i32, status: FilingStatus) -> f64 {
        let base = match (Self::bundled_year(year), status) {
            (2024, FilingStatus::Single | FilingStatus::Mfs) => 14_600.0,
            (2024, FilingStatus::Mfj | FilingStatus::Qss) => 29_200.0,
            (2024, FilingStatus::Hoh) => 21_900.0,
            (_, FilingStatus::Single | FilingStatus::Mfs) => 15_000.0,
            (_, FilingStatus::Mfj | FilingStatus::Qss) => 30_000.0,
            (_, FilingStatus::Hoh) => 22_500.0,
        };
        base * self.factor(year)
    }

    /// Tops of the 0% and 15% long-term capital-gains brackets
    pub fn ltcg_thresholds(&self, year: i32, status: FilingStatus) -> (f64, f64) {
        let (zero, fifteen) = match (Self::bundled_year(year), status) {
            (2024, FilingStatus::Single) => (47_025.0, 518_900.0),
            (2024, FilingStatus::Mfj | FilingStatus::Qss) => (94_050.0, 583_750.0),
            (2024, FilingStatus::Mfs) => (47_025.0, 291_850.0),
            (2024, FilingStatus::Hoh) => (63_000.0, 551_350.0),
            (_, FilingStatus::Single) => (48_350.0, 533_400.0),
            (_, FilingStatus::Mfj | FilingStatus::Qss) => (96_700.0, 600_050.0),
            (_, FilingStatus::Mfs) => (48_350.0, 300_000.0),
            (_, FilingStatus::Hoh) => (64_750.0, 566_700.0),
        };
        let f = self.factor(year);
        (zero * f, fifteen * f)
    }

    /// MAGI threshold for the Net Investment Income Tax (fixed in statute)
    pub fn niit_threshold(&self, status: FilingStatus) -> f64 {
        match status {
            FilingStatus::Single | FilingStatus::Hoh => 200_000.0,
            FilingStatus::Mfj | FilingStatus::Qss => 250_000.0,
            FilingStatus::Mfs => 125_000.0,
        }
    }

    pub fn amt_params(&self, year: i32, status: FilingStatus) -> AmtParams {
        let (exemption, phaseout_start, rate_breakpoint) = match (Self::bundled_year(year), status)
        {
            (2024, FilingStatus::Mfj | FilingStatus::Qss) => (133_300.0, 1_218_700.0, 232_600.0),
            (2024, FilingStatus::Mfs) => (66_650.0, 609_350.0, 116_300.0),
            (2024, _) => (85_700.0, 609_350.0, 232_600.0),
            (_, FilingStatus::Mfj | FilingStatus::Qss) => (137_000.0, 1_252_700.0, 239_100.0),
            (_, FilingStatus::Mfs) => (68_500.0, 626_350.0, 119_550.0),
            (_, _) => (88_100.0, 626_350.0, 239_100.0),
        };
        let f = self.factor(year);
        AmtParams {
            exemption: exemption * f,
            phaseout_start: phaseout_start * f,
            rate_breakpoint: rate_breakpoint * f,
        }
    }

    /// Annual Social Security wage base
    pub fn ss_wage_base(&self, year: i32) -> f64 {
        let base = match Self::bundled_year(year) {
            2024 => 168_600.0,
            _ => 176_100.0,
        };
        base * self.factor(year)
    }

    /// Wage threshold for the Additional Medicare surtax (fixed in statute)
    pub fn additional_medicare_threshold(&self, status: FilingStatus) -> f64 {
        match status {
            FilingStatus::Mfj | FilingStatus::Qss => 250_000.0,
            FilingStatus::Mfs => 125_000.0,
            _ => 200_000.0,
        }
    }

    /// SALT itemized-deduction cap
    pub fn salt_cap(&self, status: FilingStatus) -> f64 {
        match status {
            FilingStatus::Mfs => 5_000.0,
            _ => 10_000.0,
        }
    }

    /// IRMAA surcharge tiers for the year, lowest MAGI threshold first
    pub fn irmaa_tiers(&self, year: i32, status: FilingStatus) -> Vec<IrmaaTier> {
        // (single-threshold, part B surcharge, part D surcharge); the top
        // joint tier does not double
        let rows: [(f64, f64, f64); 5] = match Self::bundled_year(year) {
            2024 => [
                (103_000.0, 69.90, 12.90),
                (129_000.0, 174.70, 33.30),
                (161_000.0, 279.50, 53.80),
                (193_000.0, 384.30, 74.20),
                (500_000.0, 419.30, 81.00),
            ],
            _ => [
                (106_000.0, 74.00, 13.70),
                (133_000.0, 185.00, 35.30),
                (167_000.0, 295.90, 57.00),
                (200_000.0, 406.90, 78.60),
                (500_000.0, 443.90, 85.80),
            ],
        };
        let f = self.factor(year);
        let joint = status.uses_joint_schedule();
        rows.iter()
            .enumerate()
            .map(|(i, &(threshold, b, d))| {
                let scale = if joint {
                    if i == rows.len() - 1 { 1.5 } else { 2.0 }
                } else {
                    1.0
                };
                IrmaaTier {
                    magi_over: threshold * scale * f,
                    part_b_surcharge: b,
                    part_d_surcharge: d,
                }
            })
            .collect()
    }

    /// Monthly IRMAA surcharge (Part B + Part D) for a lookback MAGI
    pub fn irmaa_monthly_surcharge(&self, year: i32, status: FilingStatus, magi: f64) -> f64 {
        let mut surcharge = 0.0;
        for tier in self.irmaa_tiers(year, status) {
            if magi > tier.magi_over {
                surcharge = tier.part_b_surcharge + tier.part_d_surcharge;
            }
        }
        surcharge
    }
}
