#![deny(warnings)]

//! Core domain models and invariants for the power grid simulator.
//!
//! This crate defines the immutable, serializable inputs of a simulation run:
//! the resource catalog, the per-turn demand schedule and the purchase plan,
//! with validation helpers to guarantee basic invariants.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Caller-chosen identifier of a catalog entry. Unique within a catalog,
/// not necessarily contiguous.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Special effect a resource applies while it is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// A: scales the power output of every other active generator.
    Meter,
    /// B: scales the turn's minimum and maximum building thresholds.
    Distribution,
    /// C: rescales the lifespan of resources bought while it is active.
    MaintenancePlan,
    /// D: scales the turn's profit per building.
    Renewable,
    /// E: stores surplus output and releases it on deficit turns.
    Accumulator,
}

impl EffectKind {
    /// Parse the single-letter effect code. `X` (or `-`) means no effect.
    pub fn from_code(code: &str) -> Result<Option<EffectKind>, ValidationError> {
        match code {
            "A" => Ok(Some(EffectKind::Meter)),
            "B" => Ok(Some(EffectKind::Distribution)),
            "C" => Ok(Some(EffectKind::MaintenancePlan)),
            "D" => Ok(Some(EffectKind::Renewable)),
            "E" => Ok(Some(EffectKind::Accumulator)),
            "X" | "-" => Ok(None),
            other => Err(ValidationError::UnknownEffect(other.to_string())),
        }
    }

    /// Single-letter code used by the input format.
    pub fn code(self) -> char {
        match self {
            EffectKind::Meter => 'A',
            EffectKind::Distribution => 'B',
            EffectKind::MaintenancePlan => 'C',
            EffectKind::Renewable => 'D',
            EffectKind::Accumulator => 'E',
        }
    }
}

/// A purchasable resource type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Catalog identifier.
    pub id: ResourceId,
    /// One-time cost paid on purchase (>= 0).
    pub activation_cost: i64,
    /// Cost paid every turn the instance is alive (>= 0).
    pub periodic_cost: i64,
    /// Turns spent powering before maintenance.
    pub active_turns: u32,
    /// Turns spent idle after an active period.
    pub maintenance_turns: u32,
    /// Total turns before permanent obsolescence (>= 1).
    pub life_turns: u32,
    /// Buildings powered while active (>= 0).
    pub power: i64,
    /// Special effect, if any.
    #[serde(default)]
    pub effect: Option<EffectKind>,
    /// Signed effect magnitude in percent; meaning depends on `effect`.
    #[serde(default)]
    pub effect_pct: i64,
}

impl ResourceSpec {
    /// Whether this entry carries the given effect.
    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effect == Some(kind)
    }

    pub fn is_accumulator(&self) -> bool {
        self.has_effect(EffectKind::Accumulator)
    }

    /// Copy of this entry with a different lifespan. `self` is left as is.
    pub fn with_life_turns(&self, life_turns: u32) -> ResourceSpec {
        ResourceSpec {
            life_turns,
            ..self.clone()
        }
    }
}

/// Demand constraint for a single turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnConstraint {
    /// Minimum buildings powered for any payout.
    pub min_buildings: i64,
    /// Maximum buildings eligible for payout.
    pub max_buildings: i64,
    /// Profit per building powered within range.
    pub profit_per_building: i64,
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Costs must be non-negative.
    #[error("resource {0}: negative cost")]
    NegativeCost(ResourceId),
    /// Power output must be non-negative.
    #[error("resource {0}: negative power output")]
    NegativePower(ResourceId),
    /// A resource must live for at least one turn.
    #[error("resource {0}: life must be >= 1 turn")]
    ZeroLife(ResourceId),
    /// Resource identifiers must be unique within a catalog.
    #[error("duplicate resource id {0}")]
    DuplicateResource(ResourceId),
    /// Unrecognized effect code.
    #[error("unknown effect code {0:?}")]
    UnknownEffect(String),
    /// Thresholds and profit rates must be non-negative.
    #[error("turn {0}: negative threshold or profit")]
    NegativeTurnValue(usize),
}

/// Validate a catalog entry.
pub fn validate_resource(r: &ResourceSpec) -> Result<(), ValidationError> {
    if r.activation_cost < 0 || r.periodic_cost < 0 {
        return Err(ValidationError::NegativeCost(r.id));
    }
    if r.power < 0 {
        return Err(ValidationError::NegativePower(r.id));
    }
    if r.life_turns == 0 {
        return Err(ValidationError::ZeroLife(r.id));
    }
    Ok(())
}

/// Validate a turn constraint at the given schedule position.
pub fn validate_turn(index: usize, t: &TurnConstraint) -> Result<(), ValidationError> {
    if t.min_buildings < 0 || t.max_buildings < 0 || t.profit_per_building < 0 {
        return Err(ValidationError::NegativeTurnValue(index));
    }
    Ok(())
}

/// Ordered resource catalog with lookup by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ResourceSpec>", into = "Vec<ResourceSpec>")]
pub struct Catalog {
    entries: Vec<ResourceSpec>,
    index: HashMap<ResourceId, usize>,
}

impl Catalog {
    /// Build a catalog, validating every entry and rejecting duplicate ids.
    pub fn new(entries: Vec<ResourceSpec>) -> Result<Self, ValidationError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, r) in entries.iter().enumerate() {
            validate_resource(r)?;
            if index.insert(r.id, i).is_some() {
                return Err(ValidationError::DuplicateResource(r.id));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceSpec> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<ResourceSpec>> for Catalog {
    type Error = ValidationError;

    fn try_from(entries: Vec<ResourceSpec>) -> Result<Self, Self::Error> {
        Catalog::new(entries)
    }
}

impl From<Catalog> for Vec<ResourceSpec> {
    fn from(c: Catalog) -> Self {
        c.entries
    }
}

/// Per-turn demand constraints, 0-indexed by turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TurnConstraint>", into = "Vec<TurnConstraint>")]
pub struct Schedule {
    turns: Vec<TurnConstraint>,
}

impl Schedule {
    pub fn new(turns: Vec<TurnConstraint>) -> Result<Self, ValidationError> {
        for (i, t) in turns.iter().enumerate() {
            validate_turn(i, t)?;
        }
        Ok(Self { turns })
    }

    pub fn get(&self, turn: usize) -> Option<&TurnConstraint> {
        self.turns.get(turn)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl TryFrom<Vec<TurnConstraint>> for Schedule {
    type Error = ValidationError;

    fn try_from(turns: Vec<TurnConstraint>) -> Result<Self, Self::Error> {
        Schedule::new(turns)
    }
}

impl From<Schedule> for Vec<TurnConstraint> {
    fn from(s: Schedule) -> Self {
        s.turns
    }
}

/// Resources to buy at the start of one turn. Ids may repeat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub turn: usize,
    pub resources: Vec<ResourceId>,
}

/// Ordered purchase plan produced by a search procedure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchasePlan {
    pub entries: Vec<PlanEntry>,
}

impl PurchasePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; builder style.
    pub fn buy(mut self, turn: usize, resources: &[u32]) -> Self {
        self.entries.push(PlanEntry {
            turn,
            resources: resources.iter().copied().map(ResourceId).collect(),
        });
        self
    }

    /// Purchases for `turn`. The first matching entry wins.
    pub fn for_turn(&self, turn: usize) -> Option<&[ResourceId]> {
        self.entries
            .iter()
            .find(|e| e.turn == turn)
            .map(|e| e.resources.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PlanEntry> for PurchasePlan {
    fn from_iter<I: IntoIterator<Item = PlanEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// How a purchase referencing an id missing from the catalog is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownResourcePolicy {
    /// Fail the whole batch.
    #[default]
    Reject,
    /// Skip the id: it costs nothing and buys nothing.
    Ignore,
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Handling of unknown ids in purchase batches.
    pub unknown_resources: UnknownResourcePolicy,
    /// Record a per-turn report in the outcome.
    pub record_trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            unknown_resources: UnknownResourcePolicy::Reject,
            record_trace: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spec(id: u32) -> ResourceSpec {
        ResourceSpec {
            id: ResourceId(id),
            activation_cost: 100,
            periodic_cost: 5,
            active_turns: 3,
            maintenance_turns: 1,
            life_turns: 10,
            power: 20,
            effect: None,
            effect_pct: 0,
        }
    }

    #[test]
    fn effect_codes() {
        assert_eq!(EffectKind::from_code("A").unwrap(), Some(EffectKind::Meter));
        assert_eq!(
            EffectKind::from_code("E").unwrap(),
            Some(EffectKind::Accumulator)
        );
        assert_eq!(EffectKind::from_code("X").unwrap(), None);
        assert!(EffectKind::from_code("Z").is_err());
        assert_eq!(EffectKind::MaintenancePlan.code(), 'C');
    }

    #[test]
    fn catalog_lookup_and_duplicates() {
        let cat = Catalog::new(vec![spec(5), spec(2)]).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.get(ResourceId(2)).unwrap().id, ResourceId(2));
        assert!(cat.get(ResourceId(3)).is_none());
        let ids: Vec<_> = cat.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![5, 2]);

        let err = Catalog::new(vec![spec(1), spec(1)]).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateResource(ResourceId(1)));
    }

    #[test]
    fn invalid_resources_rejected() {
        let mut r = spec(1);
        r.life_turns = 0;
        assert_eq!(validate_resource(&r), Err(ValidationError::ZeroLife(ResourceId(1))));
        let mut r = spec(1);
        r.periodic_cost = -1;
        assert!(validate_resource(&r).is_err());
        let t = TurnConstraint {
            min_buildings: -1,
            max_buildings: 10,
            profit_per_building: 1,
        };
        assert_eq!(
            Schedule::new(vec![t]).unwrap_err(),
            ValidationError::NegativeTurnValue(0)
        );
    }

    #[test]
    fn with_life_turns_leaves_source_entry() {
        let r = spec(1);
        let longer = r.with_life_turns(15);
        assert_eq!(r.life_turns, 10);
        assert_eq!(longer.life_turns, 15);
        assert_eq!(longer.power, r.power);
    }

    #[test]
    fn plan_first_match_wins() {
        let plan = PurchasePlan::new().buy(0, &[5]).buy(4, &[2, 2]).buy(4, &[9]);
        assert_eq!(plan.for_turn(0), Some(&[ResourceId(5)][..]));
        assert_eq!(plan.for_turn(4), Some(&[ResourceId(2), ResourceId(2)][..]));
        assert_eq!(plan.for_turn(1), None);
    }

    #[test]
    fn catalog_serde_roundtrip_validates() {
        let cat = Catalog::new(vec![spec(1), spec(2)]).unwrap();
        let s = serde_json::to_string(&cat).unwrap();
        let back: Catalog = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cat);
        let one = serde_json::to_string(&spec(1)).unwrap();
        let dup = format!("[{one},{one}]");
        assert!(serde_json::from_str::<Catalog>(&dup).is_err());
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: SimConfig = serde_json::from_str(r#"{"unknown_resources":"ignore"}"#).unwrap();
        assert_eq!(cfg.unknown_resources, UnknownResourcePolicy::Ignore);
        assert!(cfg.record_trace);
    }

    proptest! {
        #[test]
        fn non_negative_resources_validate(cost in 0i64..1_000_000,
                                           upkeep in 0i64..10_000,
                                           life in 1u32..1_000,
                                           power in 0i64..10_000) {
            let r = ResourceSpec {
                activation_cost: cost,
                periodic_cost: upkeep,
                life_turns: life,
                power,
                ..spec(7)
            };
            prop_assert!(validate_resource(&r).is_ok());
        }
    }
}
