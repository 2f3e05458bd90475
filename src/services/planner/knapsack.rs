//! Static knapsack plan.
//!
//! Minimizes the probability that every planned action fails, treating
//! actions as independent with fixed success rates, then orders the chosen
//! actions by success rate per second.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Action;
use crate::services::world_model::WorldModel;
use super::PlannedAction;

/// Dynamic-programming tables for one knapsack solve.
#[derive(Debug, Clone)]
pub struct KnapsackSolution {
    /// `value[b]`: smallest achievable all-fail probability within `b` slots
    pub value: Vec<f64>,
    /// `policy[b]`: action index chosen last at `b`, if any
    pub policy: Vec<Option<usize>>,
    /// Chosen action indices, in execution order
    pub plan: Vec<usize>,
}

/// Budget-constrained planner minimizing the probability that every
/// planned action fails. Budgets are discretized into ladder-step slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnapsackPlanner;

impl KnapsackPlanner {
    pub const fn new() -> Self {
        Self
    }

    /// Build a plan that fits within `remaining` seconds.
    pub fn plan(
        &self,
        world: &WorldModel,
        rates: &[f64],
        remaining: f64,
    ) -> DomainResult<Vec<PlannedAction>> {
        let solution = self.solve(world, rates, remaining)?;
        Ok(solution
            .plan
            .iter()
            .map(|&index| PlannedAction::on_ladder(world, index))
            .collect())
    }

    /// Run the DP and reconstruct the plan.
    pub fn solve(
        &self,
        world: &WorldModel,
        rates: &[f64],
        remaining: f64,
    ) -> DomainResult<KnapsackSolution> {
        check_inputs(world, rates, remaining)?;

        let slots = world.ladder().slots_within(remaining);
        let nbudgets = world.nbudgets();

        let mut value = vec![f64::INFINITY; slots + 1];
        let mut policy = vec![None; slots + 1];
        value[0] = 1.0;

        for b in 1..=slots {
            for solver in 0..world.nsolvers() {
                for rung in 0..nbudgets.min(b) {
                    let action = world.index(solver, rung);
                    let candidate = (1.0 - rates[action]) * value[b - rung - 1];
                    if candidate < value[b] {
                        value[b] = candidate;
                        policy[b] = Some(action);
                    }
                }
            }
        }

        let mut plan = Vec::new();
        let mut b = slots;
        while b > 0 {
            let Some(action) = policy[b] else { break };
            plan.push(action);
            let (_, rung) = world.split_index(action);
            b -= rung + 1;
        }

        // Most promising per second first; stable so ties keep DP order.
        plan.sort_by(|&x, &y| {
            let x_density = rates[x] / world.action(x).cost();
            let y_density = rates[y] / world.action(y).cost();
            y_density.total_cmp(&x_density)
        });

        Ok(KnapsackSolution {
            value,
            policy,
            plan,
        })
    }
}

pub(super) fn check_inputs(world: &WorldModel, rates: &[f64], remaining: f64) -> DomainResult<()> {
    if remaining.is_nan() || remaining < 0.0 {
        return Err(DomainError::NegativeBudget(remaining));
    }
    if rates.len() != world.nactions() {
        return Err(DomainError::ShapeMismatch {
            expected_actions: world.nactions(),
            expected_outcomes: 1,
            actual_actions: rates.len(),
            actual_outcomes: 1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::BudgetLadder;

    fn world(solvers: &[&str], step: f64, len: usize) -> WorldModel {
        WorldModel::new(
            solvers.iter().map(ToString::to_string).collect(),
            BudgetLadder::uniform(step, len).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_prefers_strong_solver() {
        let world = world(&["a", "b"], 10.0, 3);
        // a@10, a@20, a@30, b@10, b@20, b@30
        let rates = vec![0.9, 0.9, 0.9, 0.1, 0.1, 0.1];
        let plan = KnapsackPlanner::new().plan(&world, &rates, 20.0).unwrap();
        assert_eq!(plan[0].action, Action::new("a", 10.0));
        let total: f64 = plan.iter().map(|p| p.action.cost()).sum();
        assert!(total <= 20.0);
    }

    #[test]
    fn test_value_is_non_increasing() {
        let world = world(&["a", "b"], 1.0, 4);
        let rates = vec![0.1, 0.3, 0.35, 0.5, 0.05, 0.2, 0.6, 0.61];
        let solution = KnapsackPlanner::new().solve(&world, &rates, 12.0).unwrap();
        assert_eq!(solution.value[0], 1.0);
        for pair in solution.value.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_never_rounds_budget_up() {
        let world = world(&["a"], 10.0, 3);
        let rates = vec![0.5, 0.8, 0.9];
        let plan = KnapsackPlanner::new().plan(&world, &rates, 29.9).unwrap();
        let total: f64 = plan.iter().map(|p| p.action.cost()).sum();
        assert!(total <= 29.9);
    }

    #[test]
    fn test_no_feasible_action_is_empty_plan() {
        let world = world(&["a"], 10.0, 3);
        let plan = KnapsackPlanner::new().plan(&world, &[0.5, 0.6, 0.7], 5.0).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_rejects_negative_budget() {
        let world = world(&["a"], 10.0, 1);
        assert!(matches!(
            KnapsackPlanner::new().plan(&world, &[0.5], -1.0),
            Err(DomainError::NegativeBudget(_))
        ));
    }

    #[test]
    fn test_greedy_reorders_by_density() {
        let world = world(&["long", "short"], 10.0, 2);
        // long@20 is the only useful long action, short@10 is cheap but weaker.
        let rates = vec![0.0, 0.9, 0.5, 0.5];
        let solution = KnapsackPlanner::new().solve(&world, &rates, 30.0).unwrap();
        let plan: Vec<Action> = solution.plan.iter().map(|&a| world.action(a)).collect();
        assert_eq!(plan[0], Action::new("short", 10.0));
        assert!(plan.contains(&Action::new("long", 20.0)));
    }
}
