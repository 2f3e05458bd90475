//! Sequential discounted plan.
//!
//! Maximizes expected discounted utility over a fixed number of actions,
//! with utility from a run of cost `c` scaled by `(1 - discount)^c`. The
//! model is static: rates do not change as failures are observed.

use crate::domain::errors::DomainResult;
use crate::services::world_model::WorldModel;
use super::knapsack::check_inputs;
use super::PlannedAction;

/// Discounted planner over at most `horizon` actions.
#[derive(Debug, Clone, Copy)]
pub struct BellmanPlanner {
    discount: f64,
    horizon: usize,
}

impl BellmanPlanner {
    /// `discount` in [0, 1) scales a run of cost `c` by `(1 - discount)^c`.
    pub const fn new(discount: f64, horizon: usize) -> Self {
        Self { discount, horizon }
    }

    /// Build the plan. The final step runs to whatever budget remains when
    /// it is selected, so its ceiling may lie off the ladder.
    pub fn plan(
        &self,
        world: &WorldModel,
        rates: &[f64],
        remaining: f64,
    ) -> DomainResult<Vec<PlannedAction>> {
        let indices = self.plan_indices(world, rates, remaining)?;
        let mut plan: Vec<PlannedAction> = indices
            .iter()
            .map(|&index| PlannedAction::on_ladder(world, index))
            .collect();
        if let Some(last) = plan.last_mut() {
            last.runs_to_remaining = true;
        }
        Ok(plan)
    }

    /// Action indices of the optimal plan, before extension.
    pub fn plan_indices(
        &self,
        world: &WorldModel,
        rates: &[f64],
        remaining: f64,
    ) -> DomainResult<Vec<usize>> {
        check_inputs(world, rates, remaining)?;

        let slots = world.ladder().slots_within(remaining);
        let keep = 1.0 - self.discount;

        // value[h][b]: best expected discounted utility with h actions left
        // and b slots of budget.
        let mut value = vec![vec![0.0; slots + 1]; self.horizon + 1];
        let mut choice = vec![vec![None; slots + 1]; self.horizon + 1];

        for h in 1..=self.horizon {
            for b in 1..=slots {
                let mut best = 0.0;
                let mut best_action = None;
                for solver in 0..world.nsolvers() {
                    for rung in 0..world.nbudgets().min(b) {
                        let action = world.index(solver, rung);
                        let rate = rates[action];
                        let cost = world.ladder().budget(rung);
                        let candidate =
                            keep.powf(cost) * (rate + (1.0 - rate) * value[h - 1][b - rung - 1]);
                        if candidate > best {
                            best = candidate;
                            best_action = Some(action);
                        }
                    }
                }
                value[h][b] = best;
                choice[h][b] = best_action;
            }
        }

        let mut plan = Vec::new();
        let (mut h, mut b) = (self.horizon, slots);
        while h > 0 && b > 0 {
            let Some(action) = choice[h][b] else { break };
            plan.push(action);
            let (_, rung) = world.split_index(action);
            b -= rung + 1;
            h -= 1;
        }
        Ok(plan)
    }
}
