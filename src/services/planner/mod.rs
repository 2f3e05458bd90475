//! Budget-allocation planners.
//!
//! Both planners read per-action success rates and return an ordered plan
//! whose ceilings sum to at most the remaining budget. An empty plan means
//! no action is affordable or worthwhile.

pub mod bellman;
pub mod knapsack;

pub use bellman::BellmanPlanner;
pub use knapsack::{KnapsackPlanner, KnapsackSolution};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Action, PlannerConfig, PlannerKind};
use crate::services::world_model::WorldModel;

/// One plan step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    /// Action on the ladder; its cost is the least budget the step needs
    pub action: Action,
    /// World index the outcome is recorded under
    pub index: usize,
    /// Raise the ceiling to whatever budget remains when the step is selected
    pub runs_to_remaining: bool,
}

impl PlannedAction {
    /// Step running ladder action `index` at its own ceiling.
    pub fn on_ladder(world: &WorldModel, index: usize) -> Self {
        Self {
            action: world.action(index),
            index,
            runs_to_remaining: false,
        }
    }

}

/// Planner selected by configuration.
#[derive(Debug, Clone, Copy)]
pub enum Planner {
    /// Re-plannable knapsack over the remaining budget
    Knapsack(KnapsackPlanner),
    /// Fixed-horizon discounted plan, built once
    Bellman(BellmanPlanner),
}

impl Planner {
    /// Planner named by `config.kind`.
    pub const fn from_config(config: &PlannerConfig) -> Self {
        match config.kind {
            PlannerKind::Knapsack => Self::Knapsack(KnapsackPlanner::new()),
            PlannerKind::Bellman => {
                Self::Bellman(BellmanPlanner::new(config.discount, config.horizon))
            }
        }
    }

    /// Plan against per-action success `rates` within `remaining` seconds.
    pub fn plan(
        &self,
        world: &WorldModel,
        rates: &[f64],
        remaining: f64,
    ) -> DomainResult<Vec<PlannedAction>> {
        match self {
            Self::Knapsack(planner) => planner.plan(world, rates, remaining),
            Self::Bellman(planner) => planner.plan(world, rates, remaining),
        }
    }

    /// Whether plans may be discarded and rebuilt after each outcome.
    pub const fn supports_replanning(&self) -> bool {
        matches!(self, Self::Knapsack(_))
    }
}

