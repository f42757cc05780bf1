//! Required Minimum Distribution divisors and amounts
//!
//! IRS Uniform Lifetime Table divisors by attained age. The yearly required
//! amount is the prior year-end aggregate balance divided by the divisor at
//! the owner's age in the distribution year.

/// Uniform Lifetime Table: (age, divisor), ages 72 through 120
const UNIFORM_LIFETIME: &[(u32, f64)] = &[
    (72, 27.4),
    (73, 26.5),
    (74, 25.5),
    (75, 24.6),
    (76, 23.7),
    (77, 22.9),
    (78, 22.0),
    (79, 21.1),
    (80, 20.2),
    (81, 19.4),
    (82, 18.5),
    (83, 17.7),
    (84, 16.8),
    (85, 16.0),
    (86, 15.2),
    (87, 14.4),
    (88, 13.7),
    (89, 12.9),
    (90, 12.2),
    (91, 11.5),
    (92, 10.8),
    (93, 10.1),
    (94, 9.5),
    (95, 8.9),
    (96, 8.4),
    (97, 7.8),
    (98, 7.3),
    (99, 6.8),
    (100, 6.4),
    (101, 6.0),
    (102, 5.6),
    (103, 5.2),
    (104, 4.9),
    (105, 4.6),
    (106, 4.3),
    (107, 4.1),
    (108, 3.9),
    (109, 3.7),
    (110, 3.5),
    (111, 3.4),
    (112, 3.3),
    (113, 3.1),
    (114, 3.0),
    (115, 2.9),
    (116, 2.8),
    (117, 2.7),
    (118, 2.5),
    (119, 2.3),
    (120, 2.0),
];

/// Divisor for an attained age. Ages past the table end use the final
/// divisor; ages below 72 have no divisor.
pub fn divisor_for_age(age: u32) -> Option<f64> {
    if age < UNIFORM_LIFETIME[0].0 {
        return None;
    }
    UNIFORM_LIFETIME
        .iter()
        .find(|(a, _)| *a == age)
        .map(|(_, d)| *d)
        .or(Some(UNIFORM_LIFETIME[UNIFORM_LIFETIME.len() - 1].1))
}

/// Required distribution for the year, given the prior year-end aggregate
/// balance across the RMD accounts
pub fn required_amount(prior_year_end_balance: f64, age: u32) -> f64 {
    match divisor_for_age(age) {
        Some(divisor) if prior_year_end_balance > 0.0 => prior_year_end_balance / divisor,
        _ => 0.0,
    }
}
