#![deny(warnings)]

//! Headless CLI: load a scenario and a purchase plan, run the simulation and
//! report the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use sim_core::{PurchasePlan, SimConfig, UnknownResourcePolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file (text format, or JSON with a .json extension)
    input: PathBuf,

    /// Purchase plan (`turn id id ...` lines, or .yaml/.json)
    #[arg(short, long)]
    plan: Option<PathBuf>,

    /// Override the scenario's initial budget
    #[arg(long)]
    budget: Option<i64>,

    /// Simulation config (.yaml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip unknown resource ids instead of failing the batch
    #[arg(long)]
    ignore_unknown: bool,

    /// Print one line per turn
    #[arg(long)]
    trace: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(input = %args.input.display(), plan = ?args.plan, "starting CLI");

    let scenario = scenario_io::load_scenario(&args.input)
        .with_context(|| format!("loading scenario {}", args.input.display()))?;
    let plan = match &args.plan {
        Some(path) => scenario_io::load_plan(path)
            .with_context(|| format!("loading plan {}", path.display()))?,
        None => PurchasePlan::new(),
    };
    let mut config: SimConfig = match &args.config {
        Some(path) => scenario_io::load_structured(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if args.ignore_unknown {
        config.unknown_resources = UnknownResourcePolicy::Ignore;
    }
    config.record_trace |= args.trace || args.json;

    let budget = args.budget.unwrap_or(scenario.initial_budget);
    let outcome = sim_runtime::evaluate_with(
        budget,
        &scenario.catalog,
        &scenario.schedule,
        &plan,
        &config,
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "Scenario OK | resources: {} | turns: {} | budget: {}",
            scenario.catalog.len(),
            scenario.schedule.len(),
            budget
        );
        if args.trace {
            for r in &outcome.trace {
                println!(
                    "turn {:>3} | bought: {:?} | min/max/rate: {}/{}/{} | \
                     powered: {} (raw {}, +{} stored, -{} drawn) | \
                     upkeep: {} | profit: {} | budget: {}",
                    r.turn,
                    r.purchased.iter().map(|id| id.0).collect::<Vec<_>>(),
                    r.adjusted.min_buildings,
                    r.adjusted.max_buildings,
                    r.adjusted.profit_per_building,
                    r.powered,
                    r.raw_powered,
                    r.deposited,
                    r.drawn,
                    r.maintenance_cost,
                    r.profit,
                    r.budget
                );
            }
        }
        let status = match &outcome.failure {
            None => "ok".to_string(),
            Some(e) => format!("aborted: {e}"),
        };
        println!(
            "KPI | turns: {}/{} | total profit: {} | final budget: {} | status: {}",
            outcome.turns_completed,
            scenario.schedule.len(),
            outcome.total_profit,
            outcome.final_budget,
            status
        );
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
