#![deny(warnings)]

//! Scenario and purchase plan loading.
//!
//! The scenario text format is line oriented and whitespace separated:
//!
//! ```text
//! D R T                          initial budget, resource count, turn count
//! RI RA RP RW RM RL RU RT [RE]   one line per resource
//! TM TX TR                       one line per turn
//! ```
//!
//! `RT` is an effect letter `A`-`E`, or `X` for none. `RE` is the effect
//! percentage and may be omitted. Scenarios may also be given as JSON.
//!
//! Plans use one `turn id id ...` line per turn, or YAML/JSON lists of
//! `{ turn, resources }`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sim_core::{
    Catalog, EffectKind, PlanEntry, PurchasePlan, ResourceId, ResourceSpec, Schedule,
    TurnConstraint, ValidationError,
};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Everything a simulation run needs besides the plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub initial_budget: i64,
    pub catalog: Catalog,
    pub schedule: Schedule,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("expected {expected} {what}, found {found}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid scenario: {0}")]
    Invalid(#[from] ValidationError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Non-blank lines with their 1-based line numbers, split into tokens.
fn records(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, tokens)| !tokens.is_empty())
}

fn field<T: FromStr>(tokens: &[&str], idx: usize, line: usize, name: &str) -> Result<T, LoadError> {
    let raw = tokens.get(idx).ok_or_else(|| LoadError::Malformed {
        line,
        reason: format!("missing {name}"),
    })?;
    raw.parse().map_err(|_| LoadError::Malformed {
        line,
        reason: format!("bad {name} {raw:?}"),
    })
}

fn expect_len(
    tokens: &[&str],
    range: std::ops::RangeInclusive<usize>,
    line: usize,
) -> Result<(), LoadError> {
    if range.contains(&tokens.len()) {
        Ok(())
    } else {
        Err(LoadError::Malformed {
            line,
            reason: format!("expected {range:?} fields, found {}", tokens.len()),
        })
    }
}

fn parse_resource(tokens: &[&str], line: usize) -> Result<ResourceSpec, LoadError> {
    expect_len(tokens, 8..=9, line)?;
    Ok(ResourceSpec {
        id: ResourceId(field(tokens, 0, line, "id")?),
        activation_cost: field(tokens, 1, line, "activation cost")?,
        periodic_cost: field(tokens, 2, line, "periodic cost")?,
        active_turns: field(tokens, 3, line, "active turns")?,
        maintenance_turns: field(tokens, 4, line, "maintenance turns")?,
        life_turns: field(tokens, 5, line, "life")?,
        power: field(tokens, 6, line, "power")?,
        effect: EffectKind::from_code(tokens[7])?,
        effect_pct: if tokens.len() == 9 {
            field(tokens, 8, line, "effect")?
        } else {
            0
        },
    })
}

fn parse_turn(tokens: &[&str], line: usize) -> Result<TurnConstraint, LoadError> {
    expect_len(tokens, 3..=3, line)?;
    Ok(TurnConstraint {
        min_buildings: field(tokens, 0, line, "min buildings")?,
        max_buildings: field(tokens, 1, line, "max buildings")?,
        profit_per_building: field(tokens, 2, line, "profit")?,
    })
}

/// Parse a scenario in the text format.
pub fn parse_scenario(text: &str) -> Result<Scenario, LoadError> {
    let mut lines = records(text);
    let (line, header) = lines.next().ok_or(LoadError::Malformed {
        line: 1,
        reason: "empty input".into(),
    })?;
    expect_len(&header, 3..=3, line)?;
    let initial_budget: i64 = field(&header, 0, line, "budget")?;
    let n_resources: usize = field(&header, 1, line, "resource count")?;
    let n_turns: usize = field(&header, 2, line, "turn count")?;

    let mut resources = Vec::with_capacity(n_resources);
    let mut turns = Vec::with_capacity(n_turns);
    for (line, tokens) in lines {
        if resources.len() < n_resources {
            resources.push(parse_resource(&tokens, line)?);
        } else if turns.len() < n_turns {
            turns.push(parse_turn(&tokens, line)?);
        } else {
            return Err(LoadError::CountMismatch {
                what: "turns",
                expected: n_turns,
                found: n_turns + 1,
            });
        }
    }
    if resources.len() < n_resources {
        return Err(LoadError::CountMismatch {
            what: "resources",
            expected: n_resources,
            found: resources.len(),
        });
    }
    if turns.len() < n_turns {
        return Err(LoadError::CountMismatch {
            what: "turns",
            expected: n_turns,
            found: turns.len(),
        });
    }

    Ok(Scenario {
        initial_budget,
        catalog: Catalog::new(resources)?,
        schedule: Schedule::new(turns)?,
    })
}

/// Parse a plan in the `turn id id ...` text format.
pub fn parse_plan(text: &str) -> Result<PurchasePlan, LoadError> {
    records(text)
        .map(|(line, tokens)| -> Result<PlanEntry, LoadError> {
            let turn = field(&tokens, 0, line, "turn")?;
            let resources = (1..tokens.len())
                .map(|i| field(&tokens, i, line, "resource id").map(ResourceId))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PlanEntry { turn, resources })
        })
        .collect()
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Load a scenario; `.json` files are read as JSON, anything else as text.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario, LoadError> {
    let path = path.as_ref();
    let text = read(path)?;
    let scenario: Scenario = match extension(path).as_deref() {
        Some("json") => serde_json::from_str(&text)?,
        _ => parse_scenario(&text)?,
    };
    info!(
        path = %path.display(),
        budget = scenario.initial_budget,
        resources = scenario.catalog.len(),
        turns = scenario.schedule.len(),
        "scenario loaded"
    );
    Ok(scenario)
}

/// Load a plan; `.yaml`/`.yml` and `.json` are structured, anything else is text.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<PurchasePlan, LoadError> {
    let path = path.as_ref();
    let text = read(path)?;
    let plan: PurchasePlan = match extension(path).as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
        Some("json") => serde_json::from_str(&text)?,
        _ => parse_plan(&text)?,
    };
    info!(path = %path.display(), entries = plan.entries.len(), "plan loaded");
    Ok(plan)
}

/// Load a value from YAML or JSON depending on the file extension.
pub fn load_structured<T, P>(path: P) -> Result<T, LoadError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = read(path)?;
    match extension(path).as_deref() {
        Some("json") => Ok(serde_json::from_str(&text)?),
        _ => Ok(serde_yaml::from_str(&text)?),
    }
}
