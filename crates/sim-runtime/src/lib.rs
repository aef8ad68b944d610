#![deny(warnings)]

//! Turn-simulation engine.
//!
//! A [`Simulator`] owns the portfolio of purchased resource instances and the
//! running budget and profit. Each turn runs a fixed pipeline:
//!
//! 1. **Purchase** -- buy the planned batch atomically, rescaling lifespans
//!    by active maintenance plans
//! 2. **Aging** -- advance every older instance and evict obsolete ones,
//!    handing stored energy to a surviving accumulator
//! 3. **Effects** -- aggregate meter, distribution and renewable effects
//! 4. **Power** -- sum meter-adjusted output of active generators
//! 5. **Storage** -- bank surplus or draw down accumulators on deficit
//! 6. **Accounting** -- pay upkeep, collect profit
//!
//! [`evaluate`] runs a whole purchase plan and is the oracle a plan search
//! calls; [`evaluate_many`] does so for many plans in parallel.

use sim_core::ResourceId;
use sim_effects::EffectError;
use thiserror::Error;

mod driver;
pub mod instance;
mod processor;

pub use driver::{evaluate, evaluate_many, evaluate_with, SimOutcome};
pub use instance::{Lifecycle, Phase, ResourceInstance};
pub use processor::{Simulator, TurnReport};

/// Errors that stop a simulation run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimError {
    /// Purchase batch costs more than the current budget.
    #[error("turn {turn}: purchase costs {cost} but budget is {budget}")]
    InsufficientBudget { turn: usize, cost: i64, budget: i64 },
    /// No schedule entry for the requested turn.
    #[error("turn {turn} is out of range (schedule has {turns} turns)")]
    TurnOutOfRange { turn: usize, turns: usize },
    /// Purchase references an id missing from the catalog.
    #[error("turn {turn}: unknown resource {id}")]
    UnknownResource { turn: usize, id: ResourceId },
    /// Effect arithmetic overflowed.
    #[error(transparent)]
    Effect(#[from] EffectError),
}
