//! Lifecycle of one purchased unit.

use serde::Serialize;
use sim_core::ResourceSpec;
use tracing::trace;

/// Operating phase of a live instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    Active,
    Maintenance,
}

/// Outcome of aging an instance by one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Alive,
    /// Reached its lifespan; must be evicted and never revived.
    Obsolete,
}

/// A purchased resource with its own lifecycle state.
///
/// The instance owns its spec by value: maintenance plans active at purchase
/// time may have rescaled its lifespan, which must not leak into other
/// instances of the same catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceInstance {
    spec: ResourceSpec,
    purchase_turn: usize,
    age: u32,
    phase: Phase,
    remaining: u32,
    stored: i64,
}

impl ResourceInstance {
    /// New instance, active for `spec.active_turns` turns.
    pub fn new(spec: ResourceSpec, purchase_turn: usize) -> Self {
        let remaining = spec.active_turns;
        Self {
            spec,
            purchase_turn,
            age: 0,
            phase: Phase::Active,
            remaining,
            stored: 0,
        }
    }

    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    pub fn purchase_turn(&self) -> usize {
        self.purchase_turn
    }

    /// Turns survived so far.
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Turns left in the current phase.
    pub fn remaining_in_phase(&self) -> u32 {
        self.remaining
    }

    /// Buildings' worth of energy held (accumulators only).
    pub fn stored_energy(&self) -> i64 {
        self.stored
    }

    pub(crate) fn set_stored_energy(&mut self, energy: i64) {
        self.stored = energy;
    }

    pub(crate) fn take_stored_energy(&mut self) -> i64 {
        std::mem::take(&mut self.stored)
    }

    /// Advance one turn. Call at most once per turn, never on the purchase turn.
    pub fn update(&mut self, turn: usize) -> Lifecycle {
        self.age += 1;
        if self.age >= self.spec.life_turns {
            trace!(turn, id = %self.spec.id, age = self.age, "instance obsolete");
            return Lifecycle::Obsolete;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            let (phase, remaining) = match self.phase {
                Phase::Active => (Phase::Maintenance, self.spec.maintenance_turns),
                Phase::Maintenance => (Phase::Active, self.spec.active_turns),
            };
            self.phase = phase;
            self.remaining = remaining;
        }
        Lifecycle::Alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::ResourceId;

    fn spec(active: u32, maintenance: u32, life: u32) -> ResourceSpec {
        ResourceSpec {
            id: ResourceId(1),
            activation_cost: 10,
            periodic_cost: 1,
            active_turns: active,
            maintenance_turns: maintenance,
            life_turns: life,
            power: 10,
            effect: None,
            effect_pct: 0,
        }
    }

    #[test]
    fn starts_active_with_full_countdown() {
        let inst = ResourceInstance::new(spec(3, 2, 100), 4);
        assert!(inst.is_active());
        assert_eq!(inst.remaining_in_phase(), 3);
        assert_eq!(inst.age(), 0);
        assert_eq!(inst.purchase_turn(), 4);
    }

    #[test]
    fn cycles_active_and_maintenance() {
        let mut inst = ResourceInstance::new(spec(3, 2, 100), 0);
        // Phase observed on each turn, the purchase turn included.
        let mut phases = vec![inst.phase()];
        for turn in 1..12 {
            assert_eq!(inst.update(turn), Lifecycle::Alive);
            phases.push(inst.phase());
        }
        use Phase::{Active as A, Maintenance as M};
        assert_eq!(phases, vec![A, A, A, M, M, A, A, A, M, M, A, A]);
    }

    #[test]
    fn zero_maintenance_still_idles_one_turn() {
        let mut inst = ResourceInstance::new(spec(1, 0, 100), 0);
        inst.update(1);
        assert_eq!(inst.phase(), Phase::Maintenance);
        inst.update(2);
        assert_eq!(inst.phase(), Phase::Active);
    }

    #[test]
    fn obsolete_exactly_at_life() {
        let mut inst = ResourceInstance::new(spec(2, 1, 3), 0);
        assert_eq!(inst.update(1), Lifecycle::Alive);
        assert_eq!(inst.update(2), Lifecycle::Alive);
        assert_eq!(inst.age(), 2);
        assert_eq!(inst.update(3), Lifecycle::Obsolete);
        assert_eq!(inst.age(), 3);
    }

    #[test]
    fn life_of_one_obsoletes_on_first_update() {
        let mut inst = ResourceInstance::new(spec(5, 1, 1), 0);
        assert_eq!(inst.update(1), Lifecycle::Obsolete);
    }

    proptest! {
        #[test]
        fn age_increases_by_one(active in 0u32..10, maintenance in 0u32..10, life in 1u32..50) {
            let mut inst = ResourceInstance::new(spec(active, maintenance, life), 0);
            for turn in 1..=life as usize {
                let before = inst.age();
                let state = inst.update(turn);
                prop_assert_eq!(inst.age(), before + 1);
                prop_assert_eq!(state == Lifecycle::Obsolete, inst.age() >= life);
                if state == Lifecycle::Obsolete {
                    break;
                }
            }
        }
    }
}
