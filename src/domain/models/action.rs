//! Actions and the budget ladder they are drawn from.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::{DomainError, DomainResult};

/// Relative tolerance used when checking ladder spacing and slot counts.
const LADDER_TOLERANCE: f64 = 1e-9;

/// One (solver, budget) pair the strategy may choose to execute.
///
/// Actions are immutable once constructed; the description is derived from
/// the solver name and cost ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    solver: String,
    cost: f64,
    description: String,
}

impl Action {
    /// Create an action running `solver` under a CPU ceiling of `cost` seconds.
    pub fn new(solver: impl Into<String>, cost: f64) -> Self {
        let solver = solver.into();
        let description = format!("{solver}@{cost}s");
        Self {
            solver,
            cost,
            description,
        }
    }

    /// Solver identifier.
    pub fn solver(&self) -> &str {
        &self.solver
    }

    /// CPU-time ceiling in seconds.
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Same solver, different ceiling.
    pub fn with_cost(&self, cost: f64) -> Self {
        Self::new(self.solver.clone(), cost)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Ascending, evenly spaced candidate CPU ceilings: `step, 2*step, ..., len*step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLadder {
    step: f64,
    len: usize,
}

impl BudgetLadder {
    /// Build a ladder from an explicit budget list.
    ///
    /// The list must be nonempty, ascending and evenly spaced starting one
    /// step above zero, i.e. `budgets[i] == (i + 1) * budgets[0]`.
    pub fn new(budgets: &[f64]) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidBudgetLadder(budgets.to_vec());

        let step = *budgets.first().ok_or_else(invalid)?;
        if !step.is_finite() || step <= 0.0 {
            return Err(invalid());
        }

        for (i, &budget) in budgets.iter().enumerate() {
            let expected = step * (i + 1) as f64;
            if !budget.is_finite() || (budget - expected).abs() > LADDER_TOLERANCE * expected {
                return Err(invalid());
            }
        }

        Ok(Self {
            step,
            len: budgets.len(),
        })
    }

    /// Build a ladder of `len` rungs spaced `step` seconds apart.
    pub fn uniform(step: f64, len: usize) -> DomainResult<Self> {
        if !step.is_finite() || step <= 0.0 || len == 0 {
            return Err(DomainError::InvalidBudgetLadder(vec![step]));
        }
        Ok(Self { step, len })
    }

    /// Check the invariants `uniform` enforces, for ladders that arrived
    /// through deserialization.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.step.is_finite() || self.step <= 0.0 || self.len == 0 {
            return Err(DomainError::InvalidBudgetLadder(vec![self.step]));
        }
        Ok(())
    }

    pub const fn step(&self) -> f64 {
        self.step
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Budget of rung `index` (zero-based).
    pub fn budget(&self, index: usize) -> f64 {
        self.step * (index + 1) as f64
    }

    pub fn budgets(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.budget(i)).collect()
    }

    /// Rung index whose budget equals `budget`, if any.
    pub fn index_of(&self, budget: f64) -> Option<usize> {
        let position = budget / self.step;
        let rounded = position.round();
        if rounded < 1.0 || (position - rounded).abs() > LADDER_TOLERANCE * position.max(1.0) {
            return None;
        }
        let index = rounded as usize - 1;
        (index < self.len).then_some(index)
    }

    /// Number of whole steps that fit in `remaining`; never rounds up.
    pub fn slots_within(&self, remaining: f64) -> usize {
        if !remaining.is_finite() || remaining <= 0.0 {
            return 0;
        }
        let slots = remaining / self.step;
        (slots + LADDER_TOLERANCE * slots.max(1.0)).floor() as usize
    }
}
