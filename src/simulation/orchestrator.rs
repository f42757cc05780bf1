//! Simulation orchestrator
//!
//! Builds the initial state, iterates months over the plan horizon, and
//! runs the deterministic, Monte-Carlo, or historical-replay mode. Ensemble
//! runs execute in parallel; each owns an independent `PlanState` and a
//! return stream sub-seeded from the master seed and run index, so
//! completion order cannot affect the aggregates.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::engine::{
    AnnualResult, Bands, MonthlyEngine, PercentileBands, PlanState, RunSummary,
    SimulationMetadata, SimulationResult,
};
use crate::error::PlanError;
use crate::plan::{self, Plan, SimulationMode};
use crate::simulation::returns::ReturnStream;
use crate::simulation::rng::SeededRng;

/// Run a validated plan to completion
pub fn run_simulation(plan: &Plan, seed: u64) -> Result<SimulationResult, PlanError> {
    run_simulation_with_cancel(plan, seed, None)
}

/// As `run_simulation`, checking `cancel` between runs and between years.
/// Cancellation discards partial results.
pub fn run_simulation_with_cancel(
    plan: &Plan,
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> Result<SimulationResult, PlanError> {
    // The engine refuses to run without a validated plan
    let warnings = plan::validate(plan)?;

    let engine = MonthlyEngine::new(plan);
    match plan.simulation.mode {
        SimulationMode::Deterministic => {
            let annual = run_single(plan, &engine, ReturnStream::deterministic(), cancel)?;
            let first_insolvent_year = first_insolvent_year(&annual);
            Ok(SimulationResult {
                metadata: SimulationMetadata {
                    mode: SimulationMode::Deterministic,
                    runs: 1,
                    seed,
                    insolvent_runs: usize::from(first_insolvent_year.is_some()),
                    first_insolvent_year,
                    warnings,
                },
                annual,
                runs: Vec::new(),
                percentiles: None,
                success_rate: None,
            })
        }
        SimulationMode::MonteCarlo | SimulationMode::Historical => {
            run_ensemble(plan, &engine, seed, warnings, cancel)
        }
    }
}

/// Compact per-run series kept during the first ensemble pass
struct RunStats {
    index: usize,
    final_net_worth: f64,
    insolvent: bool,
    net_worth: Vec<f64>,
    income: Vec<f64>,
    expenses: Vec<f64>,
    taxes: Vec<f64>,
}

fn build_stream(plan: &Plan, seed: u64, run_index: usize) -> Result<ReturnStream, PlanError> {
    let rng = SeededRng::for_run(seed, run_index);
    match plan.simulation.mode {
        SimulationMode::Deterministic => Ok(ReturnStream::deterministic()),
        SimulationMode::MonteCarlo => Ok(ReturnStream::monte_carlo(
            plan.simulation.monte_carlo.clone(),
            rng,
        )),
        SimulationMode::Historical => ReturnStream::historical(
            plan.horizon_years() as usize,
            plan.simulation.historical.use_rolling_periods,
            rng,
        ),
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// One forward pass over the plan horizon
fn run_single(
    plan: &Plan,
    engine: &MonthlyEngine,
    mut stream: ReturnStream,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<AnnualResult>, PlanError> {
    let mut state = PlanState::from_plan(plan);
    let mut annual = Vec::with_capacity(plan.horizon_years() as usize);
    let mut months = Vec::with_capacity(12);
    let mut market = None;
    let mut first_month = true;
    let plan_end = plan.settings.plan_end;

    for _ in 0..plan.horizon_months() {
        let current = state.current;
        // One market draw per simulated calendar year
        if first_month || current.month == 1 {
            if is_cancelled(cancel) {
                return Err(PlanError::Cancelled);
            }
            market = stream.next_year();
            first_month = false;
        }

        let outcome = engine.advance_month(&mut state, market);
        let close_year = current.is_december() || current == plan_end;
        months.push(outcome.result);

        if close_year {
            let end_balances: BTreeMap<String, f64> = state
                .accounts
                .iter()
                .map(|(name, a)| (name.clone(), a.balance))
                .collect();
            annual.push(AnnualResult {
                year: current.year,
                months: std::mem::take(&mut months),
                tax: outcome.tax.unwrap_or_default(),
                magi: state.magi_by_year.get(&current.year).copied().unwrap_or(0.0),
                end_balances,
                net_worth: state.net_worth(),
            });
        }
    }
    Ok(annual)
}

fn run_ensemble(
    plan: &Plan,
    engine: &MonthlyEngine,
    seed: u64,
    warnings: usize,
    cancel: Option<&AtomicBool>,
) -> Result<SimulationResult, PlanError> {
    let runs = plan.simulation.runs;

    // Surface mode-parameter problems before spawning the whole ensemble
    build_stream(plan, seed, 0)?;

    // Phase 1: all runs, keeping compact per-year series
    let stats: Vec<RunStats> = (0..runs)
        .into_par_iter()
        .map(|index| -> Result<RunStats, PlanError> {
            if is_cancelled(cancel) {
                return Err(PlanError::Cancelled);
            }
            let stream = build_stream(plan, seed, index)?;
            let annual = run_single(plan, engine, stream, cancel)?;
            Ok(compact_stats(index, &annual))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Phase 2: re-run the median run for the full representative trajectory
    let median_index = {
        let mut order: Vec<usize> = (0..runs).collect();
        order.sort_by(|&a, &b| {
            stats[a]
                .final_net_worth
                .partial_cmp(&stats[b].final_net_worth)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order[runs / 2]
    };
    let median_annual = run_single(plan, engine, build_stream(plan, seed, median_index)?, cancel)?;

    let insolvent_runs = stats.iter().filter(|s| s.insolvent).count();
    let success_count = stats.iter().filter(|s| s.final_net_worth > 0.0).count();

    let percentiles = aggregate_percentiles(plan, &stats);
    let run_summaries = stats
        .iter()
        .map(|s| RunSummary {
            run_index: s.index,
            final_net_worth: s.final_net_worth,
            insolvent: s.insolvent,
        })
        .collect();

    Ok(SimulationResult {
        metadata: SimulationMetadata {
            mode: plan.simulation.mode,
            runs,
            seed,
            insolvent_runs,
            first_insolvent_year: first_insolvent_year(&median_annual),
            warnings,
        },
        annual: median_annual,
        runs: run_summaries,
        percentiles: Some(percentiles),
        success_rate: Some(success_count as f64 / runs as f64),
    })
}

fn compact_stats(index: usize, annual: &[AnnualResult]) -> RunStats {
    RunStats {
        index,
        final_net_worth: annual.last().map(|a| a.net_worth).unwrap_or(0.0),
        insolvent: annual.iter().any(AnnualResult::any_insolvent),
        net_worth: annual.iter().map(|a| a.net_worth).collect(),
        income: annual.iter().map(AnnualResult::total_income).collect(),
        expenses: annual.iter().map(AnnualResult::total_expenses).collect(),
        taxes: annual.iter().map(|a| a.tax.total).collect(),
    }
}

fn first_insolvent_year(annual: &[AnnualResult]) -> Option<i32> {
    annual
        .iter()
        .find(|a| a.any_insolvent())
        .map(|a| a.year)
}

/// Linear-interpolation percentile of a sorted slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

fn bands_for<F>(stats: &[RunStats], years: usize, series: F) -> Bands
where
    F: Fn(&RunStats) -> &[f64],
{
    let mut bands = Bands::default();
    for year_idx in 0..years {
        let mut values: Vec<f64> = stats
            .iter()
            .filter_map(|s| series(s).get(year_idx).copied())
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        bands.p10.push(percentile(&values, 0.10));
        bands.p25.push(percentile(&values, 0.25));
        bands.p50.push(percentile(&values, 0.50));
        bands.p75.push(percentile(&values, 0.75));
        bands.p90.push(percentile(&values, 0.90));
    }
    bands
}

fn aggregate_percentiles(plan: &Plan, stats: &[RunStats]) -> PercentileBands {
    let years: Vec<i32> =
        (plan.settings.plan_start.year..=plan.settings.plan_end.year).collect();
    let n = years.len();
    PercentileBands {
        years,
        net_worth: bands_for(stats, n, |s| &s.net_worth),
        income: bands_for(stats, n, |s| &s.income),
        expenses: bands_for(stats, n, |s| &s.expenses),
        taxes: bands_for(stats, n, |s| &s.taxes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::test_fixtures::minimal_plan;
    use approx::assert_relative_eq;

    #[test]
    fn test_deterministic_run_shape() {
        let plan = minimal_plan();
        let result = run_simulation(&plan, 1).expect("runs");
        // 2025..=2030
        assert_eq!(result.annual.len(), 6);
        assert_eq!(result.annual[0].months.len(), 12);
        assert!(result.percentiles.is_none());
        assert!(result.success_rate.is_none());
        assert_eq!(result.metadata.runs, 1);
    }

    #[test]
    fn test_partial_final_year() {
        let mut plan = minimal_plan();
        plan.settings.plan_end = crate::plan::YearMonth::new(2026, 6);
        let result = run_simulation(&plan, 1).expect("runs");
        assert_eq!(result.annual.len(), 2);
        assert_eq!(result.annual[1].months.len(), 6);
    }

    #[test]
    fn test_determinism_byte_identical() {
        let mut plan = minimal_plan();
        plan.simulation.mode = SimulationMode::MonteCarlo;
        plan.simulation.runs = 8;
        let a = run_simulation(&plan, 42).expect("runs");
        let b = run_simulation(&plan, 42).expect("runs");
        let ja = serde_json::to_string(&a).unwrap();
        let jb = serde_json::to_string(&b).unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut plan = minimal_plan();
        plan.simulation.mode = SimulationMode::MonteCarlo;
        plan.simulation.runs = 4;
        let a = run_simulation(&plan, 1).expect("runs");
        let b = run_simulation(&plan, 2).expect("runs");
        assert_ne!(
            serde_json::to_string(&a.percentiles).unwrap(),
            serde_json::to_string(&b.percentiles).unwrap()
        );
    }

    #[test]
    fn test_percentile_monotonicity() {
        let mut plan = minimal_plan();
        plan.simulation.mode = SimulationMode::MonteCarlo;
        plan.simulation.runs = 32;
        let result = run_simulation(&plan, 7).expect("runs");
        let bands = &result.percentiles.unwrap().net_worth;
        for i in 0..bands.p10.len() {
            assert!(bands.p10[i] <= bands.p25[i]);
            assert!(bands.p25[i] <= bands.p50[i]);
            assert!(bands.p50[i] <= bands.p75[i]);
            assert!(bands.p75[i] <= bands.p90[i]);
        }
    }

    #[test]
    fn test_historical_mode_runs() {
        let mut plan = minimal_plan();
        plan.simulation.mode = SimulationMode::Historical;
        plan.simulation.runs = 8;
        let result = run_simulation(&plan, 3).expect("runs");
        assert_eq!(result.runs.len(), 8);
        assert!(result.success_rate.is_some());
    }

    #[test]
    fn test_cancel_before_start() {
        let plan = minimal_plan();
        let flag = AtomicBool::new(true);
        let result = run_simulation_with_cancel(&plan, 1, Some(&flag));
        assert!(matches!(result, Err(PlanError::Cancelled)));
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&sorted, 0.50), 3.0);
        assert_relative_eq!(percentile(&sorted, 0.0), 1.0);
        assert_relative_eq!(percentile(&sorted, 1.0), 5.0);
        assert_relative_eq!(percentile(&sorted, 0.25), 2.0);
    }
}
