//! Household planner CLI
//!
//! Reads a plan file, validates it, runs the configured projection, and
//! writes or prints the results.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::info;

use plansim::plan::{self, Plan, SimulationMode};
use plansim::simulation::run_simulation;
use plansim::SimulationResult;

#[derive(Debug, Parser)]
#[command(name = "plansim", version, about = "Household financial-planning simulator")]
struct Cli {
    /// Plan file (JSON)
    plan: PathBuf,

    /// Write the full simulation result as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the plan's projection mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Override the number of ensemble runs
    #[arg(long)]
    runs: Option<usize>,

    /// Seed for reproducible return generation (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Validate the plan and exit
    #[arg(long)]
    validate: bool,

    /// Print a per-year summary table
    #[arg(long)]
    summary: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Mode {
    Deterministic,
    MonteCarlo,
    Historical,
}

impl From<Mode> for SimulationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Deterministic => SimulationMode::Deterministic,
            Mode::MonteCarlo => SimulationMode::MonteCarlo,
            Mode::Historical => SimulationMode::Historical,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let json = fs::read_to_string(&cli.plan)
        .with_context(|| format!("reading plan file {}", cli.plan.display()))?;
    let mut plan: Plan = Plan::from_json_str(&json)
        .with_context(|| format!("parsing plan file {}", cli.plan.display()))?;

    if let Some(mode) = cli.mode {
        plan.simulation.mode = mode.into();
    }
    if let Some(runs) = cli.runs {
        plan.simulation.runs = runs;
    }

    if cli.validate {
        let warnings = plan::validate(&plan)?;
        println!("plan ok ({warnings} warnings)");
        return Ok(());
    }

    // The seed fully determines all draws; log it so runs can be replayed
    let seed = cli.seed.unwrap_or_else(entropy_seed);
    info!("running {:?} mode with seed {seed}", plan.simulation.mode);

    let result = run_simulation(&plan, seed)?;

    if let Some(path) = &cli.output {
        let rendered = serde_json::to_string_pretty(&result)?;
        fs::write(path, rendered)
            .with_context(|| format!("writing output to {}", path.display()))?;
        println!("results written to {}", path.display());
    }

    if cli.summary || cli.output.is_none() {
        print_summary(&plan, &result);
    }

    Ok(())
}

/// A one-off seed when none is supplied; printed so the run is replayable
fn entropy_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seed = nanos ^ ((std::process::id() as u64) << 32);
    info!("no seed given, chose {seed}");
    seed
}

fn print_summary(plan: &Plan, result: &SimulationResult) {
    println!(
        "plansim {} ({} mode, seed {})",
        Local::now().format("%Y-%m-%d %H:%M"),
        match result.metadata.mode {
            SimulationMode::Deterministic => "deterministic",
            SimulationMode::MonteCarlo => "monte carlo",
            SimulationMode::Historical => "historical",
        },
        result.metadata.seed,
    );
    println!(
        "horizon {} - {}, {} runs",
        plan.settings.plan_start, plan.settings.plan_end, result.metadata.runs
    );
    println!();

    println!(
        "{:>6} {:>5} {:>14} {:>14} {:>14} {:>16}",
        "Year", "Age", "Income", "Expenses", "Taxes", "Net Worth"
    );
    println!("{}", "-".repeat(74));
    for annual in &result.annual {
        let age = annual
            .months
            .last()
            .map(|m| m.primary_age_months / 12)
            .unwrap_or(0);
        println!(
            "{:>6} {:>5} {:>14.0} {:>14.0} {:>14.0} {:>16.0}",
            annual.year,
            age,
            annual.total_income(),
            annual.total_expenses(),
            annual.tax.total,
            annual.net_worth,
        );
    }

    if let Some(rate) = result.success_rate {
        println!();
        println!(
            "success rate: {:.1}% ({} of {} runs insolvent)",
            rate * 100.0,
            result.metadata.insolvent_runs,
            result.metadata.runs
        );
    }
    if let Some(year) = result.metadata.first_insolvent_year {
        println!("first insolvent year: {year}");
    }
}
