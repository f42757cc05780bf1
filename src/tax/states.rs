//! State income tax schedules for the 50 states and DC
//!
//! Flat-rate and no-income-tax states are represented uniformly as bracket
//! schedules (a single unbounded bracket, or none). Thresholds are bundled
//! 2024 values; callers scale them by the same inflation factor used for
//! federal tables.

use crate::plan::FilingStatus;
use crate::tax::tables::{tax_from_brackets, Bracket};

/// Bracket schedules for one state
#[derive(Debug, Clone, Copy)]
pub struct StateSchedule {
    pub single: &'static [Bracket],
    pub joint: &'static [Bracket],
}

const fn b(rate: f64, upper: f64) -> Bracket {
    Bracket { rate, upper }
}

const INF: f64 = f64::INFINITY;

// No income tax
const NONE: &[Bracket] = &[];

// Flat-rate states
const AZ: &[Bracket] = &[b(0.025, INF)];
const CO: &[Bracket] = &[b(0.044, INF)];
const GA: &[Bracket] = &[b(0.0539, INF)];
const ID: &[Bracket] = &[b(0.058, INF)];
const IL: &[Bracket] = &[b(0.0495, INF)];
const IN: &[Bracket] = &[b(0.0305, INF)];
const IA: &[Bracket] = &[b(0.038, INF)];
const KY: &[Bracket] = &[b(0.04, INF)];
const MA: &[Bracket] = &[b(0.05, INF)];
const MI: &[Bracket] = &[b(0.0425, INF)];
const MS: &[Bracket] = &[b(0.047, INF)];
const NC: &[Bracket] = &[b(0.045, INF)];
const PA: &[Bracket] = &[b(0.0307, INF)];
const UT: &[Bracket] = &[b(0.0465, INF)];

// Graduated states, single column
const AL_S: &[Bracket] = &[b(0.02, 500.0), b(0.04, 3_000.0), b(0.05, INF)];
const AL_J: &[Bracket] = &[b(0.02, 1_000.0), b(0.04, 6_000.0), b(0.05, INF)];
const AR_S: &[Bracket] = &[b(0.02, 4_400.0), b(0.04, 8_800.0), b(0.044, INF)];
const CA_S: &[Bracket] = &[
    b(0.01, 10_412.0),
    b(0.02, 24_684.0),
    b(0.04, 38_959.0),
    b(0.06, 54_081.0),
    b(0.08, 68_350.0),
    b(0.093, 349_137.0),
    b(0.103, 418_961.0),
    b(0.113, 698_271.0),
    b(0.123, INF),
];
const CA_J: &[Bracket] = &[
    b(0.01, 20_824.0),
    b(0.02, 49_368.0),
    b(0.04, 77_918.0),
    b(0.06, 108_162.0),
    b(0.08, 136_700.0),
    b(0.093, 698_274.0),
    b(0.103, 837_922.0),
    b(0.113, 1_396_542.0),
    b(0.123, INF),
];
const CT_S: &[Bracket] = &[
    b(0.02, 10_000.0),
    b(0.045, 50_000.0),
    b(0.055, 100_000.0),
    b(0.06, 200_000.0),
    b(0.065, 250_000.0),
    b(0.069, 500_000.0),
    b(0.0699, INF),
];
const CT_J: &[Bracket] = &[
    b(0.02, 20_000.0),
    b(0.045, 100_000.0),
    b(0.055, 200_000.0),
    b(0.06, 400_000.0),
    b(0.065, 500_000.0),
    b(0.069, 1_000_000.0),
    b(0.0699, INF),
];
const DE_S: &[Bracket] = &[
    b(0.022, 5_000.0),
    b(0.039, 10_000.0),
    b(0.048, 20_000.0),
    b(0.052, 25_000.0),
    b(0.0555, 60_000.0),
    b(0.066, INF),
];
const DC_S: &[Bracket] = &[
    b(0.04, 10_000.0),
    b(0.06, 40_000.0),
    b(0.065, 60_000.0),
    b(0.085, 250_000.0),
    b(0.0925, 500_000.0),
    b(0.0975, 1_000_000.0),
    b(0.1075, INF),
];
const HI_S: &[Bracket] = &[
    b(0.014, 2_400.0),
    b(0.055, 9_600.0),
    b(0.064, 14_400.0),
    b(0.068, 19_200.0),
    b(0.072, 24_000.0),
    b(0.076, 36_000.0),
    b(0.079, 48_000.0),
    b(0.0825, INF),
];
const HI_J: &[Bracket] = &[
    b(0.014, 4_800.0),
    b(0.055, 19_200.0),
    b(0.064, 28_800.0),
    b(0.068, 38_400.0),
    b(0.072, 48_000.0),
    b(0.076, 72_000.0),
    b(0.079, 96_000.0),
    b(0.0825, INF),
];
const KS_S: &[Bracket] = &[b(0.031, 15_000.0), b(0.0525, 30_000.0), b(0.057, INF)];
const KS_J: &[Bracket] = &[b(0.031, 30_000.0), b(0.0525, 60_000.0), b(0.057, INF)];
const LA_S: &[Bracket] = &[b(0.0185, 12_500.0), b(0.035, 50_000.0), b(0.0425, INF)];
const LA_J: &[Bracket] = &[b(0.0185, 25_000.0), b(0.035, 100_000.0), b(0.0425, INF)];
const ME_S: &[Bracket] = &[b(0.058, 26_050.0), b(0.0675, 61_600.0), b(0.0715, INF)];
const ME_J: &[Bracket] = &[b(0.058, 52_100.0), b(0.0675, 123_250.0), b(0.0715, INF)];
const MD_S: &[Bracket] = &[
    b(0.02, 1_000.0),
    b(0.03, 2_000.0),
    b(0.04, 3_000.0),
    b(0.0475, 100_000.0),
    b(0.05, 125_000.0),
    b(0.0525, 150_000.0),
    b(0.055, 250_000.0),
    b(0.0575, INF),
];
const MN_S: &[Bracket] = &[
    b(0.0535, 31_690.0),
    b(0.068, 104_090.0),
    b(0.0785, 193_240.0),
    b(0.0985, INF),
];
const MN_J: &[Bracket] = &[
    b(0.0535, 46_330.0),
    b(0.068, 184_040.0),
    b(0.0785, 321_450.0),
    b(0.0985, INF),
];
const MO_S: &[Bracket] = &[
    b(0.02, 1_273.0),
    b(0.025, 2_546.0),
    b(0.03, 3_819.0),
    b(0.035, 5_092.0),
    b(0.04, 6_365.0),
    b(0.045, 7_638.0),
    b(0.048, INF),
];
const MT_S: &[Bracket] = &[b(0.047, 20_500.0), b(0.059, INF)];
const MT_J: &[Bracket] = &[b(0.047, 41_000.0), b(0.059, INF)];
const NE_S: &[Bracket] = &[
    b(0.0246, 3_700.0),
    b(0.0351, 22_170.0),
    b(0.0501, 35_730.0),
    b(0.0584, INF),
];
const NE_J: &[Bracket] = &[
    b(0.0246, 7_390.0),
    b(0.0351, 44_350.0),
    b(0.0501, 71_460.0),
    b(0.0584, INF),
];
const NJ_S: &[Bracket] = &[
    b(0.014, 20_000.0),
    b(0.0175, 35_000.0),
    b(0.035, 40_000.0),
    b(0.05525, 75_000.0),
    b(0.0637, 500_000.0),
    b(0.0897, 1_000_000.0),
    b(0.1075, INF),
];
const NJ_J: &[Bracket] = &[
    b(0.014, 20_000.0),
    b(0.0175, 50_000.0),
    b(0.0245, 70_000.0),
    b(0.035, 80_000.0),
    b(0.05525, 150_000.0),
    b(0.0637, 500_000.0),
    b(0.0897, 1_000_000.0),
    b(0.1075, INF),
];
const NM_S: &[Bracket] = &[
    b(0.017, 5_500.0),
    b(0.032, 11_000.0),
    b(0.047, 16_000.0),
    b(0.049, 210_000.0),
    b(0.059, INF),
];
const NM_J: &[Bracket] = &[
    b(0.017, 8_000.0),
    b(0.032, 16_000.0),
    b(0.047, 24_000.0),
    b(0.049, 315_000.0),
    b(0.059, INF),
];
const NY_S: &[Bracket] = &[
    b(0.04, 8_500.0),
    b(0.045, 11_700.0),
    b(0.0525, 13_900.0),
    b(0.055, 80_650.0),
    b(0.06, 215_400.0),
    b(0.0685, 1_077_550.0),
    b(0.0965, 5_000_000.0),
    b(0.103, 25_000_000.0),
    b(0.109, INF),
];
const NY_J: &[Bracket] = &[
    b(0.04, 17_150.0),
    b(0.045, 23_600.0),
    b(0.0525, 27_900.0),
    b(0.055, 161_550.0),
    b(0.06, 323_200.0),
    b(0.0685, 2_155_350.0),
    b(0.0965, 5_000_000.0),
    b(0.103, 25_000_000.0),
    b(0.109, INF),
];
const ND_S: &[Bracket] = &[b(0.0, 44_725.0), b(0.0195, 225_975.0), b(0.025, INF)];
const ND_J: &[Bracket] = &[b(0.0, 74_750.0), b(0.0195, 275_100.0), b(0.025, INF)];
const OH_S: &[Bracket] = &[b(0.0, 26_050.0), b(0.0275, 100_000.0), b(0.035, INF)];
const OK_S: &[Bracket] = &[
    b(0.0025, 1_000.0),
    b(0.0075, 2_500.0),
    b(0.0175, 3_750.0),
    b(0.0275, 4_900.0),
    b(0.0375, 7_200.0),
    b(0.0475, INF),
];
const OK_J: &[Bracket] = &[
    b(0.0025, 2_000.0),
    b(0.0075, 5_000.0),
    b(0.0175, 7_500.0),
    b(0.0275, 9_800.0),
    b(0.0375, 12_200.0),
    b(0.0475, INF),
];
const OR_S: &[Bracket] = &[
    b(0.0475, 4_300.0),
    b(0.0675, 10_750.0),
    b(0.0875, 125_000.0),
    b(0.099, INF),
];
const OR_J: &[Bracket] = &[
    b(0.0475, 8_600.0),
    b(0.0675, 21_500.0),
    b(0.0875, 250_000.0),
    b(0.099, INF),
];
const RI_S: &[Bracket] = &[b(0.0375, 77_450.0), b(0.0475, 176_050.0), b(0.0599, INF)];
const SC_S: &[Bracket] = &[b(0.0, 3_460.0), b(0.03, 17_330.0), b(0.064, INF)];
const VT_S: &[Bracket] = &[
    b(0.0335, 45_400.0),
    b(0.066, 110_050.0),
    b(0.076, 229_550.0),
    b(0.0875, INF),
];
const VT_J: &[Bracket] = &[
    b(0.0335, 75_850.0),
    b(0.066, 183_400.0),
    b(0.076, 279_450.0),
    b(0.0875, INF),
];
const VA_S: &[Bracket] = &[
    b(0.02, 3_000.0),
    b(0.03, 5_000.0),
    b(0.05, 17_000.0),
    b(0.0575, INF),
];
const WV_S: &[Bracket] = &[
    b(0.0236, 10_000.0),
    b(0.0315, 25_000.0),
    b(0.0354, 40_000.0),
    b(0.0472, 60_000.0),
    b(0.0512, INF),
];
const WI_S: &[Bracket] = &[
    b(0.035, 14_320.0),
    b(0.044, 28_640.0),
    b(0.053, 315_310.0),
    b(0.0765, INF),
];
const WI_J: &[Bracket] = &[
    b(0.035, 19_090.0),
    b(0.044, 38_190.0),
    b(0.053, 420_420.0),
    b(0.0765, INF),
];

/// Look up a state's bracket schedules by two-letter code
pub fn schedule(code: &str) -> Option<StateSchedule> {
    let sched = |single, joint| StateSchedule { single, joint };
    let same = |s| StateSchedule { single: s, joint: s };
    Some(match code.to_ascii_uppercase().as_str() {
        "AK" | "FL" | "NV" | "NH" | "SD" | "TN" | "TX" | "WA" | "WY" => same(NONE),
        "AZ" => same(AZ),
        "CO" => same(CO),
        "GA" => same(GA),
        "ID" => same(ID),
        "IL" => same(IL),
        "IN" => same(IN),
        "IA" => same(IA),
        "KY" => same(KY),
        "MA" => same(MA),
        "MI" => same(MI),
        "MS" => same(MS),
        "NC" => same(NC),
        "PA" => same(PA),
        "UT" => same(UT),
        "AL" => sched(AL_S, AL_J),
        "AR" => same(AR_S),
        "CA" => sched(CA_S, CA_J),
        "CT" => sched(CT_S, CT_J),
        "DE" => same(DE_S),
        "DC" => same(DC_S),
        "HI" => sched(HI_S, HI_J),
        "KS" => sched(KS_S, KS_J),
        "LA" => sched(LA_S, LA_J),
        "ME" => sched(ME_S, ME_J),
        "MD" => same(MD_S),
        "MN" => sched(MN_S, MN_J),
        "MO" => same(MO_S),
        "MT" => sched(MT_S, MT_J),
        "NE" => sched(NE_S, NE_J),
        "NJ" => sched(NJ_S, NJ_J),
        "NM" => sched(NM_S, NM_J),
        "NY" => sched(NY_S, NY_J),
        "ND" => sched(ND_S, ND_J),
        "OH" => same(OH_S),
        "OK" => sched(OK_S, OK_J),
        "OR" => sched(OR_S, OR_J),
        "RI" => same(RI_S),
        "SC" => same(SC_S),
        "VT" => sched(VT_S, VT_J),
        "VA" => same(VA_S),
        "WV" => same(WV_S),
        "WI" => sched(WI_S, WI_J),
        _ => return None,
    })
}

pub fn is_known_state(code: &str) -> bool {
    schedule(code).is_some()
}

/// State tax on `taxable` income, with thresholds scaled by `factor`
pub fn state_tax(code: &str, status: FilingStatus, taxable: f64, factor: f64) -> f64 {
    let Some(sched) = schedule(code) else {
        return 0.0;
    };
    let brackets = if status.uses_joint_schedule() {
        sched.joint
    } else {
        sched.single
    };
    if brackets.is_empty() || taxable <= 0.0 {
        return 0.0;
    }
    let scaled: Vec<Bracket> = brackets
        .iter()
        .map(|b| Bracket {
            rate: b.rate,
            upper: b.upper * factor,
        })
        .collect();
    tax_from_brackets(taxable, &scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_all_codes_resolve() {
        let codes = [
            "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL",
            "IN", "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE",
            "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD",
            "TN", "TX", "UT", "VT", "VA", "WA", "WV", "WI", "WY",
        ];
        assert_eq!(codes.len(), 51);
        for code in codes {
            assert!(is_known_state(code), "missing schedule for {code}");
        }
        assert!(!is_known_state("ZZ"));
    }

    #[test]
    fn test_no_tax_state() {
        assert_eq!(state_tax("TX", FilingStatus::Single, 100_000.0, 1.0), 0.0);
    }

    #[test]
    fn test_flat_state() {
        let tax = state_tax("IL", FilingStatus::Mfj, 100_000.0, 1.0);
        assert_relative_eq!(tax, 4_950.0, epsilon = 0.01);
    }

    #[test]
    fn test_graduated_state_uses_joint_column() {
        let single = state_tax("CA", FilingStatus::Single, 100_000.0, 1.0);
        let joint = state_tax("CA", FilingStatus::Mfj, 100_000.0, 1.0);
        assert!(joint < single, "joint thresholds are wider: {joint} vs {single}");
    }

    #[test]
    fn test_threshold_scaling() {
        // Scaling thresholds up lowers tax on the same income
        let base = state_tax("NY", FilingStatus::Single, 200_000.0, 1.0);
        let scaled = state_tax("NY", FilingStatus::Single, 200_000.0, 1.2);
        assert!(scaled < base);
    }
}
