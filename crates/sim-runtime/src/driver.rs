//! Whole-plan simulation runs.

use crate::processor::{Simulator, TurnReport};
use crate::SimError;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use sim_core::{Catalog, PurchasePlan, Schedule, SimConfig};
use tracing::{info, info_span, warn};

/// Result of running a purchase plan over the whole schedule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimOutcome {
    /// Profit collected; partial when the run aborted.
    pub total_profit: i64,
    pub final_budget: i64,
    pub turns_completed: usize,
    /// Why the run stopped early, if it did.
    #[serde(serialize_with = "failure_message")]
    pub failure: Option<SimError>,
    /// Per-turn reports, when enabled in the config.
    pub trace: Vec<TurnReport>,
}

impl SimOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

fn failure_message<S: Serializer>(failure: &Option<SimError>, s: S) -> Result<S::Ok, S::Error> {
    match failure {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

impl<'a> Simulator<'a> {
    /// Reset, then run every scheduled turn in order with the plan's purchases.
    /// Stops at the first failing turn.
    pub fn run(&mut self, plan: &PurchasePlan) -> SimOutcome {
        self.reset();
        let turns = self.schedule.len();
        let ignored = plan.entries.iter().filter(|e| e.turn >= turns).count();
        if ignored > 0 {
            warn!(ignored, turns, "plan entries beyond the schedule are ignored");
        }

        let mut trace = Vec::new();
        let mut failure = None;
        let mut turns_completed = 0;
        for turn in 0..turns {
            match self.simulate_turn(turn, plan.for_turn(turn)) {
                Ok(report) => {
                    turns_completed += 1;
                    if self.config.record_trace {
                        trace.push(report);
                    }
                }
                Err(e) => {
                    warn!(turn, error = %e, "simulation aborted");
                    failure = Some(e);
                    break;
                }
            }
        }

        info!(
            turns_completed,
            total_profit = self.total_profit(),
            budget = self.budget(),
            ok = failure.is_none(),
            "simulation finished"
        );
        SimOutcome {
            total_profit: self.total_profit(),
            final_budget: self.budget(),
            turns_completed,
            failure,
            trace,
        }
    }
}

/// Evaluate one plan with the default configuration.
pub fn evaluate(
    initial_budget: i64,
    catalog: &Catalog,
    schedule: &Schedule,
    plan: &PurchasePlan,
) -> SimOutcome {
    evaluate_with(initial_budget, catalog, schedule, plan, &SimConfig::default())
}

/// Evaluate one plan from a fresh state.
pub fn evaluate_with(
    initial_budget: i64,
    catalog: &Catalog,
    schedule: &Schedule,
    plan: &PurchasePlan,
    config: &SimConfig,
) -> SimOutcome {
    Simulator::new(initial_budget, catalog, schedule, config.clone()).run(plan)
}

/// Evaluate independent plans in parallel. Each run owns its own state.
pub fn evaluate_many(
    initial_budget: i64,
    catalog: &Catalog,
    schedule: &Schedule,
    plans: &[PurchasePlan],
    config: &SimConfig,
) -> Vec<SimOutcome> {
    let _span = info_span!("evaluate_many", plans = plans.len()).entered();
    plans
        .par_iter()
        .map(|plan| evaluate_with(initial_budget, catalog, schedule, plan, config))
        .collect()
}
