//! Per-turn orchestration: purchase, aging, effects, power, storage, accounting.

use crate::instance::{Lifecycle, ResourceInstance};
use crate::SimError;
use serde::Serialize;
use sim_core::{Catalog, ResourceId, ResourceSpec, Schedule, SimConfig, UnknownResourcePolicy};
use sim_effects::{
    apply_maintenance_plans, checked_sum, reconcile, AdjustedTurn, EffectError, EffectTotals,
};
use tracing::{debug, trace, warn};

/// Diagnostic record of one processed turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub turn: usize,
    /// Catalog ids bought at the start of the turn.
    pub purchased: Vec<ResourceId>,
    /// Instances that became obsolete this turn.
    pub evicted: usize,
    /// Thresholds and rate after distribution and renewable effects.
    pub adjusted: AdjustedTurn,
    /// Output of active generators after the meter effect.
    pub raw_powered: i64,
    /// Buildings powered after storage reconciliation.
    pub powered: i64,
    pub deposited: i64,
    pub drawn: i64,
    pub maintenance_cost: i64,
    pub profit: i64,
    pub budget: i64,
    pub total_profit: i64,
}

/// Turn processor: owns the portfolio and the running budget and profit.
///
/// Catalog and schedule are borrowed, so independent simulators over the
/// same inputs can run side by side.
#[derive(Clone, Debug)]
pub struct Simulator<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) schedule: &'a Schedule,
    pub(crate) config: SimConfig,
    pub(crate) initial_budget: i64,
    budget: i64,
    total_profit: i64,
    portfolio: Vec<ResourceInstance>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        initial_budget: i64,
        catalog: &'a Catalog,
        schedule: &'a Schedule,
        config: SimConfig,
    ) -> Self {
        Self {
            catalog,
            schedule,
            config,
            initial_budget,
            budget: initial_budget,
            total_profit: 0,
            portfolio: Vec::new(),
        }
    }

    /// Back to the initial budget with an empty portfolio.
    pub fn reset(&mut self) {
        self.budget = self.initial_budget;
        self.total_profit = 0;
        self.portfolio.clear();
    }

    pub fn budget(&self) -> i64 {
        self.budget
    }

    /// Sum of turn profits; upkeep is charged to the budget only.
    pub fn total_profit(&self) -> i64 {
        self.total_profit
    }

    /// Live instances in purchase order.
    pub fn portfolio(&self) -> &[ResourceInstance] {
        &self.portfolio
    }

    /// Process one turn, buying `purchases` first.
    ///
    /// A rejected batch leaves budget and portfolio untouched and the turn is
    /// not processed.
    pub fn simulate_turn(
        &mut self,
        turn: usize,
        purchases: Option<&[ResourceId]>,
    ) -> Result<TurnReport, SimError> {
        let constraint = *self.schedule.get(turn).ok_or(SimError::TurnOutOfRange {
            turn,
            turns: self.schedule.len(),
        })?;

        let purchased = match purchases {
            Some(ids) if !ids.is_empty() => self.purchase(turn, ids)?,
            _ => Vec::new(),
        };
        let aged = self.portfolio.len() - purchased.len();
        let evicted = self.age_portfolio(turn, aged);

        let totals = EffectTotals::collect(self.active().map(ResourceInstance::spec))?;
        let adjusted = totals.adjust_turn(&constraint)?;

        let mut raw_powered = 0;
        for inst in self.active() {
            let output = totals.generator_output(inst.spec())?;
            raw_powered = checked_sum(raw_powered, output, "raw power")?;
        }

        let mut accumulators: Vec<&mut ResourceInstance> = self
            .portfolio
            .iter_mut()
            .filter(|i| i.is_active() && i.spec().is_accumulator())
            .collect();
        let mut stored: Vec<i64> = accumulators.iter().map(|i| i.stored_energy()).collect();
        let storage = reconcile(raw_powered, &adjusted, &mut stored)?;
        for (inst, energy) in accumulators.iter_mut().zip(stored) {
            inst.set_stored_energy(energy);
        }

        let maintenance_cost = self.portfolio.iter().try_fold(0, |acc, i| {
            checked_sum(acc, i.spec().periodic_cost, "maintenance cost")
        })?;
        let profit = adjusted.profit(storage.powered)?;
        let budget = checked_sum(self.budget, profit, "budget")?
            .checked_sub(maintenance_cost)
            .ok_or(EffectError::TotalOverflow { what: "budget" })?;
        self.total_profit = checked_sum(self.total_profit, profit, "total profit")?;
        self.budget = budget;

        debug!(
            turn,
            min = adjusted.min_buildings,
            max = adjusted.max_buildings,
            rate = adjusted.profit_per_building,
            powered = storage.powered,
            maintenance_cost,
            profit,
            budget = self.budget,
            total_profit = self.total_profit,
            "turn processed"
        );

        Ok(TurnReport {
            turn,
            purchased,
            evicted,
            adjusted,
            raw_powered,
            powered: storage.powered,
            deposited: storage.deposited,
            drawn: storage.drawn,
            maintenance_cost,
            profit,
            budget: self.budget,
            total_profit: self.total_profit,
        })
    }

    fn active(&self) -> impl Iterator<Item = &ResourceInstance> {
        self.portfolio.iter().filter(|i| i.is_active())
    }

    /// Buy a batch atomically. Returns the ids actually bought.
    fn purchase(&mut self, turn: usize, ids: &[ResourceId]) -> Result<Vec<ResourceId>, SimError> {
        let catalog = self.catalog;
        let mut specs: Vec<&ResourceSpec> = Vec::with_capacity(ids.len());
        for &id in ids {
            match (catalog.get(id), self.config.unknown_resources) {
                (Some(spec), _) => specs.push(spec),
                (None, UnknownResourcePolicy::Ignore) => {
                    trace!(turn, %id, "skipping unknown resource");
                }
                (None, UnknownResourcePolicy::Reject) => {
                    warn!(turn, %id, "purchase references unknown resource");
                    return Err(SimError::UnknownResource { turn, id });
                }
            }
        }

        let cost = specs
            .iter()
            .fold(0i64, |acc, s| acc.saturating_add(s.activation_cost));
        if cost > self.budget {
            warn!(turn, cost, budget = self.budget, "purchase batch rejected");
            return Err(SimError::InsufficientBudget {
                turn,
                cost,
                budget: self.budget,
            });
        }

        // Plans bought earlier in the same batch already count for later ones.
        let mut bought: Vec<ResourceInstance> = Vec::with_capacity(specs.len());
        for spec in specs {
            let plans = self
                .portfolio
                .iter()
                .chain(bought.iter())
                .filter(|i| i.is_active())
                .map(ResourceInstance::spec);
            let modified = apply_maintenance_plans(spec, plans)?;
            bought.push(ResourceInstance::new(modified, turn));
        }

        self.budget -= cost;
        let ids = bought.iter().map(|i| i.spec().id).collect();
        self.portfolio.extend(bought);
        Ok(ids)
    }

    /// Age the first `aged` instances and evict the obsolete ones, handing any
    /// stored energy to the first surviving active accumulator.
    fn age_portfolio(&mut self, turn: usize, aged: usize) -> usize {
        let mut evicted = Vec::new();
        let mut kept = Vec::with_capacity(self.portfolio.len());
        for (i, mut inst) in std::mem::take(&mut self.portfolio).into_iter().enumerate() {
            if i < aged && inst.update(turn) == Lifecycle::Obsolete {
                evicted.push(inst);
            } else {
                kept.push(inst);
            }
        }
        self.portfolio = kept;

        for inst in &mut evicted {
            let energy = inst.take_stored_energy();
            if energy == 0 {
                continue;
            }
            let target = self
                .portfolio
                .iter_mut()
                .find(|i| i.is_active() && i.spec().is_accumulator());
            match target {
                Some(target) => {
                    let total = target.stored_energy().saturating_add(energy);
                    target.set_stored_energy(total);
                    trace!(
                        turn,
                        from = %inst.spec().id,
                        to = %target.spec().id,
                        energy,
                        "stored energy transferred"
                    );
                }
                None => trace!(turn, from = %inst.spec().id, energy, "stored energy lost"),
            }
        }
        evicted.len()
    }
}
