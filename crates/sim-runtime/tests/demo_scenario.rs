//! Golden regression over the bundled demo scenario.

use scenario_io::{load_plan, load_scenario, Scenario};
use sim_core::{PurchasePlan, ResourceId, SimConfig};
use sim_runtime::{evaluate, evaluate_with, SimError};
use std::path::PathBuf;

fn assets() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets")
}

fn demo() -> Scenario {
    load_scenario(assets().join("demo.txt")).unwrap()
}

#[test]
fn demo_plan_total_profit() {
    let s = demo();
    let plan = load_plan(assets().join("demo_plan.txt")).unwrap();
    let out = evaluate(s.initial_budget, &s.catalog, &s.schedule, &plan);
    assert!(out.is_success(), "{:?}", out.failure);
    assert_eq!(out.turns_completed, 8);
    assert_eq!(out.total_profit, 615);
    assert_eq!(out.final_budget, 560);

    let profits: Vec<i64> = out.trace.iter().map(|r| r.profit).collect();
    assert_eq!(profits, vec![60, 90, 60, 40, 135, 80, 60, 90]);
    let budgets: Vec<i64> = out.trace.iter().map(|r| r.budget).collect();
    assert_eq!(budgets, vec![77, 159, 206, 241, 359, 422, 475, 560]);
}

#[test]
fn demo_meter_plan_total_profit() {
    let s = demo();
    let plan = PurchasePlan::new()
        .buy(0, &[5])
        .buy(1, &[2])
        .buy(2, &[2])
        .buy(4, &[2, 2])
        .buy(5, &[2]);
    let out = evaluate(s.initial_budget, &s.catalog, &s.schedule, &plan);
    assert!(out.is_success(), "{:?}", out.failure);
    assert_eq!(out.turns_completed, 8);
    assert_eq!(out.total_profit, 593);
    assert_eq!(out.final_budget, 558);

    let profits: Vec<i64> = out.trace.iter().map(|r| r.profit).collect();
    assert_eq!(profits, vec![60, 90, 60, 78, 135, 80, 0, 90]);
    let budgets: Vec<i64> = out.trace.iter().map(|r| r.budget).collect();
    assert_eq!(budgets, vec![83, 165, 216, 290, 409, 478, 473, 558]);
    // No accumulator to cover turn 6: 9 powered against a minimum of 30.
    assert_eq!(out.trace[6].powered, 9);
    assert_eq!(out.trace[6].drawn, 0);
}

#[test]
fn demo_trace_details() {
    let s = demo();
    let plan = load_plan(assets().join("demo_plan.yaml")).unwrap();
    let out = evaluate(s.initial_budget, &s.catalog, &s.schedule, &plan);
    let t = &out.trace;

    // Renewable plant lifts the rate from 3 to 3.75, floored.
    assert_eq!(t[0].adjusted.profit_per_building, 3);
    // Two meters at +50% each on turn 4: 20*2.5 + 3*(6*2.5).
    assert_eq!(t[4].raw_powered, 95);
    assert_eq!(t[4].deposited, 50);
    assert_eq!(t[4].purchased, vec![ResourceId(2), ResourceId(2)]);
    // First meter reaches its 4-turn life.
    assert_eq!(t[5].evicted, 1);
    // Deficit covered from storage.
    assert_eq!(t[6].raw_powered, 10);
    assert_eq!(t[6].drawn, 20);
    assert_eq!(t[6].powered, 30);
    // Maintenance plan reaches its 5-turn life.
    assert_eq!(t[7].evicted, 1);
    assert_eq!(t[7].maintenance_cost, 5);

    let mut running = 0;
    for r in t {
        running += r.profit;
        assert_eq!(r.total_profit, running);
    }
}

#[test]
fn demo_plan_over_budget_aborts() {
    let s = demo();
    let plan = PurchasePlan::new().buy(0, &[5]).buy(1, &[1, 1, 1, 1, 1, 1, 1, 1, 1]);
    let out = evaluate(s.initial_budget, &s.catalog, &s.schedule, &plan);
    assert_eq!(out.turns_completed, 1);
    assert_eq!(out.total_profit, 60);
    assert!(matches!(
        out.failure,
        Some(SimError::InsufficientBudget { turn: 1, cost: 90, .. })
    ));
}

#[test]
fn demo_unknown_id_policy() {
    let s = demo();
    let plan = PurchasePlan::new().buy(0, &[5, 99]);
    let strict = evaluate(s.initial_budget, &s.catalog, &s.schedule, &plan);
    assert_eq!(
        strict.failure,
        Some(SimError::UnknownResource {
            turn: 0,
            id: ResourceId(99)
        })
    );

    let cfg =
        scenario_io::load_structured::<SimConfig, _>(assets().join("sim_config.yaml")).unwrap();
    let lenient_cfg = SimConfig {
        unknown_resources: sim_core::UnknownResourcePolicy::Ignore,
        ..cfg
    };
    let lenient = evaluate_with(
        s.initial_budget,
        &s.catalog,
        &s.schedule,
        &plan,
        &lenient_cfg,
    );
    assert!(lenient.is_success());
}
