#![deny(warnings)]

//! Effect models: how active special effects bend a turn.
//!
//! This crate provides the pure arithmetic behind the simulator's effects:
//! - Percentage scaling with exact decimal math, floored and clamped
//! - Lifespan rescaling for maintenance plans (C)
//! - Per-turn aggregation of meter (A), distribution (B) and renewable (D)
//! - Threshold/rate adjustment of a turn constraint
//! - Storage reconciliation for accumulators (E)

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{EffectKind, ResourceSpec, TurnConstraint};
use thiserror::Error;
use tracing::trace;

/// Errors produced by effect helpers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EffectError {
    /// Scaled value does not fit the integer range.
    #[error("scaling {value} by {pct}% overflows")]
    Overflow { value: i64, pct: i64 },
    /// A per-turn sum or product does not fit the integer range.
    #[error("{what} overflows")]
    TotalOverflow { what: &'static str },
}

/// `a + b`, or [`EffectError::TotalOverflow`] naming `what`.
pub fn checked_sum(a: i64, b: i64, what: &'static str) -> Result<i64, EffectError> {
    a.checked_add(b).ok_or(EffectError::TotalOverflow { what })
}

/// `floor(value * (1 + pct/100))`, computed exactly.
///
/// Example:
/// assert_eq!(scale_pct(100, 15).unwrap(), 115);
/// assert_eq!(scale_pct(7, -50).unwrap(), 3);
pub fn scale_pct(value: i64, pct: i64) -> Result<i64, EffectError> {
    let overflow = || EffectError::Overflow { value, pct };
    let factor = Decimal::ONE_HUNDRED
        .checked_add(Decimal::from(pct))
        .ok_or_else(overflow)?;
    let scaled = Decimal::from(value)
        .checked_mul(factor)
        .ok_or_else(overflow)?
        / Decimal::ONE_HUNDRED;
    scaled.floor().to_i64().ok_or_else(overflow)
}

/// Scale and clamp at zero; used for power, thresholds and profit rate.
pub fn scale_non_negative(value: i64, pct: i64) -> Result<i64, EffectError> {
    Ok(scale_pct(value, pct)?.max(0))
}

/// Lifespan after a maintenance plan of `pct` percent. Never below one turn.
pub fn scale_lifespan(life_turns: u32, pct: i64) -> Result<u32, EffectError> {
    let scaled = scale_pct(i64::from(life_turns), pct)?.max(1);
    u32::try_from(scaled).map_err(|_| EffectError::Overflow {
        value: i64::from(life_turns),
        pct,
    })
}

/// Apply every active maintenance plan, in order, to a resource about to be
/// bought. Returns a modified copy; `spec` itself is never changed.
pub fn apply_maintenance_plans<'a, I>(
    spec: &ResourceSpec,
    plans: I,
) -> Result<ResourceSpec, EffectError>
where
    I: IntoIterator<Item = &'a ResourceSpec>,
{
    let mut life = spec.life_turns;
    for plan in plans {
        if plan.has_effect(EffectKind::MaintenancePlan) {
            life = scale_lifespan(life, plan.effect_pct)?;
        }
    }
    if life != spec.life_turns {
        trace!(id = %spec.id, from = spec.life_turns, to = life, "lifespan rescaled");
    }
    Ok(spec.with_life_turns(life))
}

/// Summed scalar effects of all active resources in a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EffectTotals {
    /// Net meter percentage (A).
    pub meter_pct: i64,
    /// Net distribution percentage (B), applied to min and max alike.
    pub distribution_pct: i64,
    /// Net renewable percentage (D).
    pub renewable_pct: i64,
}

impl EffectTotals {
    /// Add one active resource's contribution. Non-scalar effects are ignored.
    pub fn add(&mut self, spec: &ResourceSpec) -> Result<(), EffectError> {
        let (total, what) = match spec.effect {
            Some(EffectKind::Meter) => (&mut self.meter_pct, "meter percentage"),
            Some(EffectKind::Distribution) => {
                (&mut self.distribution_pct, "distribution percentage")
            }
            Some(EffectKind::Renewable) => (&mut self.renewable_pct, "renewable percentage"),
            Some(EffectKind::MaintenancePlan) | Some(EffectKind::Accumulator) | None => {
                return Ok(());
            }
        };
        *total = checked_sum(*total, spec.effect_pct, what)?;
        Ok(())
    }

    /// Aggregate over the active resources of a turn.
    pub fn collect<'a, I>(active: I) -> Result<Self, EffectError>
    where
        I: IntoIterator<Item = &'a ResourceSpec>,
    {
        let mut totals = Self::default();
        for spec in active {
            totals.add(spec)?;
        }
        Ok(totals)
    }

    /// Power contribution of one generator after the meter effect.
    /// Accumulators never contribute power directly.
    pub fn generator_output(&self, spec: &ResourceSpec) -> Result<i64, EffectError> {
        if spec.is_accumulator() {
            return Ok(0);
        }
        scale_non_negative(spec.power, self.meter_pct)
    }

    /// Turn thresholds and rate after distribution and renewable effects.
    pub fn adjust_turn(&self, turn: &TurnConstraint) -> Result<AdjustedTurn, EffectError> {
        Ok(AdjustedTurn {
            min_buildings: scale_non_negative(turn.min_buildings, self.distribution_pct)?,
            max_buildings: scale_non_negative(turn.max_buildings, self.distribution_pct)?,
            profit_per_building: scale_non_negative(turn.profit_per_building, self.renewable_pct)?,
        })
    }
}

/// A turn constraint with effects applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AdjustedTurn {
    pub min_buildings: i64,
    pub max_buildings: i64,
    pub profit_per_building: i64,
}

impl AdjustedTurn {
    /// Payout for `powered` buildings: zero below the minimum, capped at the maximum.
    pub fn profit(&self, powered: i64) -> Result<i64, EffectError> {
        if powered < self.min_buildings {
            return Ok(0);
        }
        powered
            .min(self.max_buildings)
            .checked_mul(self.profit_per_building)
            .ok_or(EffectError::TotalOverflow { what: "turn profit" })
    }
}

/// Result of matching supply against adjusted thresholds through storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Buildings powered after storage.
    pub powered: i64,
    /// Surplus moved into storage.
    pub deposited: i64,
    /// Stored energy released to cover a deficit.
    pub drawn: i64,
}

/// Reconcile raw output with the turn's thresholds using accumulator storage.
///
/// `stored` holds the energy of each active accumulator in portfolio order.
/// Surplus over the maximum goes entirely into the first accumulator and the
/// output is capped at the maximum (surplus is lost without accumulators).
/// A deficit under the minimum drains accumulators in order until covered or
/// exhausted.
pub fn reconcile(
    powered: i64,
    turn: &AdjustedTurn,
    stored: &mut [i64],
) -> Result<Reconciliation, EffectError> {
    if powered > turn.max_buildings {
        let surplus = powered - turn.max_buildings;
        let deposited = match stored.first_mut() {
            Some(first) => {
                *first = checked_sum(*first, surplus, "stored energy")?;
                surplus
            }
            None => 0,
        };
        return Ok(Reconciliation {
            powered: turn.max_buildings,
            deposited,
            drawn: 0,
        });
    }

    let mut result = Reconciliation {
        powered,
        ..Reconciliation::default()
    };
    if powered < turn.min_buildings {
        let mut deficit = turn.min_buildings - powered;
        for energy in stored.iter_mut() {
            if deficit == 0 {
                break;
            }
            let take = (*energy).min(deficit).max(0);
            *energy -= take;
            deficit -= take;
            result.drawn += take;
        }
        result.powered += result.drawn;
    }
    Ok(result)
}
