//! Action/outcome vocabulary shared by every other component.
//!
//! Actions are ordered solver-major: action `i` is solver `i / nbudgets` at
//! ladder rung `i % nbudgets`. This ordering is stable for the lifetime of a
//! trained portfolio and is what count arrays, prediction tables and plans
//! index by.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Action, BudgetLadder, CountArray, OutcomeKind, RecordedRun};

/// Slack allowed when comparing recorded costs against ladder budgets.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Fixed vocabulary of actions (solvers x budgets) and outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldModel {
    solvers: Vec<String>,
    ladder: BudgetLadder,
}

impl WorldModel {
    /// Create a world over `solvers` and `ladder`.
    ///
    /// Solver names must be nonempty and unique.
    pub fn new(solvers: Vec<String>, ladder: BudgetLadder) -> DomainResult<Self> {
        let world = Self { solvers, ladder };
        world.validate()?;
        Ok(world)
    }

    /// Check solver names and ladder, for worlds that arrived through
    /// deserialization.
    pub fn validate(&self) -> DomainResult<()> {
        if self.solvers.is_empty() {
            return Err(DomainError::InvalidModel(
                "world needs at least one solver".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for solver in &self.solvers {
            if !seen.insert(solver.as_str()) {
                return Err(DomainError::InvalidModel(format!(
                    "duplicate solver in world: {solver}"
                )));
            }
        }
        self.ladder.validate()
    }

    pub fn solvers(&self) -> &[String] {
        &self.solvers
    }

    pub const fn ladder(&self) -> &BudgetLadder {
        &self.ladder
    }

    pub fn nsolvers(&self) -> usize {
        self.solvers.len()
    }

    pub const fn nbudgets(&self) -> usize {
        self.ladder.len()
    }

    pub fn nactions(&self) -> usize {
        self.solvers.len() * self.ladder.len()
    }

    pub const fn noutcomes(&self) -> usize {
        OutcomeKind::COUNT
    }

    /// Flat index of (solver, rung).
    pub const fn index(&self, solver: usize, rung: usize) -> usize {
        solver * self.ladder.len() + rung
    }

    /// Inverse of [`Self::index`].
    pub const fn split_index(&self, action: usize) -> (usize, usize) {
        (action / self.ladder.len(), action % self.ladder.len())
    }

    pub fn solver_index(&self, solver: &str) -> Option<usize> {
        self.solvers.iter().position(|s| s == solver)
    }

    /// Action at flat index `index`.
    pub fn action(&self, index: usize) -> Action {
        let (solver, rung) = self.split_index(index);
        Action::new(self.solvers[solver].clone(), self.ladder.budget(rung))
    }

    /// Every action in index order.
    pub fn actions(&self) -> Vec<Action> {
        (0..self.nactions()).map(|i| self.action(i)).collect()
    }

    /// Flat index of `action`, or `None` when its solver or budget is not in
    /// the vocabulary.
    pub fn action_index(&self, action: &Action) -> Option<usize> {
        let solver = self.solver_index(action.solver())?;
        let rung = self.ladder.index_of(action.cost())?;
        Some(self.index(solver, rung))
    }

    /// Indices of actions whose cost fits in `remaining`.
    pub fn actions_within(&self, remaining: f64) -> Vec<usize> {
        let slots = self.ladder.slots_within(remaining).min(self.nbudgets());
        (0..self.nsolvers())
            .flat_map(|s| (0..slots).map(move |r| (s, r)))
            .map(|(s, r)| self.index(s, r))
            .collect()
    }

    /// Count (action, outcome) events.
    ///
    /// Deterministic and idempotent: the same events always produce the same
    /// array. Fails on an action outside the vocabulary.
    pub fn counts_from_events(&self, events: &[(Action, OutcomeKind)]) -> DomainResult<CountArray> {
        let mut counts = CountArray::zeros(self.nactions(), self.noutcomes());
        for (action, outcome) in events {
            let index = self
                .action_index(action)
                .ok_or_else(|| DomainError::UnknownAction(action.to_string()))?;
            counts.increment(index, outcome.index());
        }
        Ok(counts)
    }

    /// Count recorded runs, expanding each one across the ladder.
    ///
    /// A run with budget `B` says something about every rung `b <= B`: it
    /// would have succeeded at `b` iff it solved the task and its cost was at
    /// most `b`. Rungs above `B` are censored and left untouched.
    pub fn counts_from_runs(&self, runs: &[RecordedRun]) -> DomainResult<CountArray> {
        let mut counts = CountArray::zeros(self.nactions(), self.noutcomes());
        for run in runs {
            let solver = self
                .solver_index(&run.solver)
                .ok_or_else(|| DomainError::UnknownSolver(run.solver.clone()))?;
            for rung in 0..self.nbudgets() {
                let budget = self.ladder.budget(rung);
                if budget > run.budget * (1.0 + BUDGET_TOLERANCE) {
                    break;
                }
                let kind = if run.outcome.is_solved() && run.cost <= budget * (1.0 + BUDGET_TOLERANCE)
                {
                    run.outcome.kind
                } else {
                    OutcomeKind::Unsolved
                };
                counts.increment(self.index(solver, rung), kind.index());
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Outcome;

    fn world() -> WorldModel {
        WorldModel::new(
            vec!["foo".to_string(), "bar".to_string()],
            BudgetLadder::uniform(10.0, 3).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_ordering() {
        let world = world();
        assert_eq!(world.nactions(), 6);
        assert_eq!(world.noutcomes(), 3);
        assert_eq!(world.action(0), Action::new("foo", 10.0));
        assert_eq!(world.action(2), Action::new("foo", 30.0));
        assert_eq!(world.action(3), Action::new("bar", 10.0));
        for (i, action) in world.actions().iter().enumerate() {
            assert_eq!(world.action_index(action), Some(i));
        }
    }

    #[test]
    fn test_rejects_duplicate_solvers() {
        let result = WorldModel::new(
            vec!["foo".to_string(), "foo".to_string()],
            BudgetLadder::uniform(1.0, 1).unwrap(),
        );
        assert!(matches!(result, Err(DomainError::InvalidModel(_))));
    }

    #[test]
    fn test_counts_from_events() {
        let world = world();
        let events = vec![
            (Action::new("foo", 10.0), OutcomeKind::Positive),
            (Action::new("foo", 10.0), OutcomeKind::Unsolved),
            (Action::new("bar", 30.0), OutcomeKind::Negative),
        ];
        let counts = world.counts_from_events(&events).unwrap();
        assert_eq!(counts.row(0), &[1, 1, 0]);
        assert_eq!(counts.row(5), &[0, 0, 1]);
        assert_eq!(counts, world.counts_from_events(&events).unwrap());
    }

    #[test]
    fn test_counts_from_events_rejects_unknown_action() {
        let world = world();
        let off_ladder = vec![(Action::new("foo", 15.0), OutcomeKind::Positive)];
        assert!(matches!(
            world.counts_from_events(&off_ladder),
            Err(DomainError::UnknownAction(_))
        ));
        let unknown_solver = vec![(Action::new("baz", 10.0), OutcomeKind::Positive)];
        assert!(world.counts_from_events(&unknown_solver).is_err());
    }

    #[test]
    fn test_counts_from_runs_expands_censored_runs() {
        let world = world();
        let runs = vec![RecordedRun {
            task_id: "t".to_string(),
            solver: "foo".to_string(),
            budget: 20.0,
            cost: 15.0,
            outcome: Outcome::positive(None),
        }];
        let counts = world.counts_from_runs(&runs).unwrap();
        // 10s: too short; 20s: solved; 30s: censored.
        assert_eq!(counts.row(0), &[1, 0, 0]);
        assert_eq!(counts.row(1), &[0, 1, 0]);
        assert_eq!(counts.total(2), 0);
    }

    #[test]
    fn test_actions_within_never_exceeds_remaining() {
        let world = world();
        assert!(world.actions_within(9.99).is_empty());
        assert_eq!(world.actions_within(20.0), vec![0, 1, 3, 4]);
        assert_eq!(world.actions_within(1e6).len(), 6);
    }
}
