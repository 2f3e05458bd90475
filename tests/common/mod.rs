//! Common test utilities for integration tests
//!
//! Provides shared fixtures, fake adapters, and helpers used across
//! multiple integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use budgetfolio::domain::models::{
    BudgetLadder, ComponentFamily, Outcome, PlannerConfig, RunResult, RunTermination, Task,
};
use budgetfolio::domain::ports::{ExecutionHarness, HarnessError};
use budgetfolio::services::{ActionModel, MixtureModel, TrainedPortfolio, WorldModel};
use budgetfolio::Action;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Two solvers, "a" and "b", on a ladder of 10-second rungs.
pub fn two_solver_world(rungs: usize) -> WorldModel {
    WorldModel::new(
        vec!["a".to_string(), "b".to_string()],
        BudgetLadder::uniform(10.0, rungs).expect("valid ladder"),
    )
    .expect("valid world")
}

/// Single-component categorical mixture: every rung of "a" succeeds with
/// probability 0.9, every rung of "b" with 0.1.
pub fn confident_portfolio(rungs: usize) -> Arc<TrainedPortfolio> {
    confident_portfolio_with(rungs, PlannerConfig::default())
}

/// [`confident_portfolio`] with explicit planner settings.
pub fn confident_portfolio_with(rungs: usize, planner: PlannerConfig) -> Arc<TrainedPortfolio> {
    let world = two_solver_world(rungs);
    let mut component = Vec::new();
    for _ in 0..rungs {
        component.extend([0.1, 0.85, 0.05]);
    }
    for _ in 0..rungs {
        component.extend([0.9, 0.05, 0.05]);
    }
    let mixture = MixtureModel::from_parts(
        ComponentFamily::Multinomial,
        world.nactions(),
        world.noutcomes(),
        vec![1.0],
        vec![component],
    )
    .expect("valid mixture");
    Arc::new(
        TrainedPortfolio::new(world, ActionModel::mixture(mixture), planner)
            .expect("valid portfolio"),
    )
}

/// Harness answering from a fixed table of outcomes per solver.
///
/// Each run is charged its full ceiling; solvers missing from the table
/// come back unsolved.
pub struct ScriptedHarness {
    outcomes: HashMap<String, Outcome>,
    calls: AtomicUsize,
}

impl ScriptedHarness {
    pub fn new(outcomes: impl IntoIterator<Item = (&'static str, Outcome)>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|(solver, outcome)| (solver.to_string(), outcome))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionHarness for ScriptedHarness {
    fn harness_id(&self) -> &str {
        "scripted"
    }

    async fn run(&self, action: &Action, _task: &Task) -> Result<RunResult, HarnessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .get(action.solver())
            .cloned()
            .unwrap_or_else(Outcome::unsolved);
        Ok(RunResult {
            cost: action.cost(),
            outcome,
            termination: RunTermination::Exited { code: 0 },
        })
    }
}
