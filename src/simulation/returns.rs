//! Per-year return streams for the three projection modes
//!
//! Deterministic mode yields no market draw (accounts use their fixed
//! rates). Monte-Carlo mode draws correlated stock/bond returns each
//! simulated year. Historical mode replays the bundled annual series,
//! either as a rolling window or as independent draws with replacement.

use crate::engine::AnnualMarket;
use crate::error::PlanError;
use crate::plan::MonteCarloParams;
use crate::simulation::historical;
use crate::simulation::rng::SeededRng;

/// A stream of one market draw per simulated calendar year
#[derive(Debug, Clone)]
pub enum ReturnStream {
    /// Fixed per-account rates; no market draw
    Deterministic,
    /// Correlated normal draws per year
    MonteCarlo {
        params: MonteCarloParams,
        rng: SeededRng,
    },
    /// Pre-sampled sequence from the bundled series
    Historical {
        sequence: Vec<AnnualMarket>,
        cursor: usize,
    },
}

impl ReturnStream {
    pub fn deterministic() -> Self {
        ReturnStream::Deterministic
    }

    pub fn monte_carlo(params: MonteCarloParams, rng: SeededRng) -> Self {
        ReturnStream::MonteCarlo { params, rng }
    }

    /// Sample a historical sequence covering `horizon_years`.
    ///
    /// Rolling mode picks a uniform start year and wraps past the end of
    /// the series; independent mode draws each year with replacement.
    pub fn historical(
        horizon_years: usize,
        use_rolling_periods: bool,
        mut rng: SeededRng,
    ) -> Result<Self, PlanError> {
        let data = historical::annual_returns();
        if data.is_empty() {
            return Err(PlanError::mode_param("historical", "no bundled return data"));
        }
        if use_rolling_periods && horizon_years > data.len() {
            let (first, last) = historical::year_range();
            return Err(PlanError::mode_param(
                "historical",
                format!(
                    "horizon of {horizon_years} years exceeds the bundled {first}-{last} series"
                ),
            ));
        }

        let sequence = if use_rolling_periods {
            let start = rng.next_below(data.len());
            (0..horizon_years)
                .map(|offset| {
                    let y = &data[(start + offset) % data.len()];
                    AnnualMarket {
                        stock: y.stock,
                        bond: y.bond,
                    }
                })
                .collect()
        } else {
            (0..horizon_years)
                .map(|_| {
                    let y = &data[rng.next_below(data.len())];
                    AnnualMarket {
                        stock: y.stock,
                        bond: y.bond,
                    }
                })
                .collect()
        };

        Ok(ReturnStream::Historical {
            sequence,
            cursor: 0,
        })
    }

    /// The market draw for the next simulated year
    pub fn next_year(&mut self) -> Option<AnnualMarket> {
        match self {
            ReturnStream::Deterministic => None,
            ReturnStream::MonteCarlo { params, rng } => {
                let z1 = rng.next_normal();
                let z2 = rng.next_normal();
                let stock = params.stock_mean + params.stock_std * z1;
                let correlated = params.correlation * z1
                    + (1.0 - params.correlation * params.correlation).sqrt() * z2;
                let bond = params.bond_mean + params.bond_std * correlated;
                Some(AnnualMarket { stock, bond })
            }
            ReturnStream::Historical { sequence, cursor } => {
                // Past the sampled window, hold the final year
                let market = sequence
                    .get(*cursor)
                    .or_else(|| sequence.last())
                    .copied();
                *cursor += 1;
                market
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc_params(correlation: f64) -> MonteCarloParams {
        MonteCarloParams {
            stock_mean: 0.10,
            stock_std: 0.16,
            bond_mean: 0.04,
            bond_std: 0.05,
            correlation,
        }
    }

    #[test]
    fn test_deterministic_yields_nothing() {
        let mut stream = ReturnStream::deterministic();
        assert_eq!(stream.next_year(), None);
    }

    #[test]
    fn test_monte_carlo_reproducible() {
        let mut a = ReturnStream::monte_carlo(mc_params(-0.1), SeededRng::new(5));
        let mut b = ReturnStream::monte_carlo(mc_params(-0.1), SeededRng::new(5));
        for _ in 0..50 {
            assert_eq!(a.next_year(), b.next_year());
        }
    }

    #[test]
    fn test_monte_carlo_correlation_sign() {
        // With perfect correlation, standardized draws move together
        let mut stream = ReturnStream::monte_carlo(mc_params(1.0), SeededRng::new(11));
        for _ in 0..100 {
            let m = stream.next_year().unwrap();
            let zs = (m.stock - 0.10) / 0.16;
            let zb = (m.bond - 0.04) / 0.05;
            assert!((zs - zb).abs() < 1e-9);
        }
    }

    #[test]
    fn test_monte_carlo_sample_stats() {
        let mut stream = ReturnStream::monte_carlo(mc_params(-0.1), SeededRng::new(77));
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            sum += stream.next_year().unwrap().stock;
        }
        let mean = sum / n as f64;
        assert!((mean - 0.10).abs() < 0.005, "stock mean {mean}");
    }

    #[test]
    fn test_historical_rolling_window() {
        let mut stream =
            ReturnStream::historical(30, true, SeededRng::new(3)).expect("valid window");
        let data = historical::annual_returns();
        let first = stream.next_year().unwrap();
        // The draw comes from the bundled series
        assert!(data
            .iter()
            .any(|y| (y.stock - first.stock).abs() < 1e-12 && (y.bond - first.bond).abs() < 1e-12));
    }

    #[test]
    fn test_historical_window_too_long() {
        let result = ReturnStream::historical(500, true, SeededRng::new(3));
        assert!(matches!(result, Err(PlanError::ModeParam { .. })));
    }

    #[test]
    fn test_historical_reproducible() {
        let mut a = ReturnStream::historical(40, false, SeededRng::new(9)).unwrap();
        let mut b = ReturnStream::historical(40, false, SeededRng::new(9)).unwrap();
        for _ in 0..40 {
            assert_eq!(a.next_year(), b.next_year());
        }
    }
}
