//! Recycling harness: replays recorded runs instead of spawning solvers.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::models::{Action, Outcome, RunResult, RunTermination, Task};
use crate::domain::ports::{ExecutionHarness, HarnessError, RunStore};

/// Answers each action from a [`RunStore`].
///
/// A recorded run with budget `B >= c` tells us what a run with ceiling `c`
/// would have done: if it finished within `c` the same answer at the same
/// cost, otherwise nothing at cost `c`.
pub struct RecycledHarness {
    store: Arc<dyn RunStore>,
}

impl RecycledHarness {
    /// Harness replaying runs from `store`.
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ExecutionHarness for RecycledHarness {
    fn harness_id(&self) -> &str {
        "recycled"
    }

    #[instrument(skip(self, action, task), fields(action = %action, task_id = %task.id()))]
    async fn run(&self, action: &Action, task: &Task) -> Result<RunResult, HarnessError> {
        let requested = action.cost();
        let recorded = self
            .store
            .lookup(task.id(), action.solver(), requested)
            .await?
            .ok_or_else(|| HarnessError::NoRecordedRun {
                task_id: task.id().to_string(),
                solver: action.solver().to_string(),
                budget: requested,
            })?;

        let result = if recorded.cost <= requested {
            RunResult {
                cost: recorded.cost,
                outcome: recorded.outcome,
                termination: RunTermination::Recycled,
            }
        } else {
            RunResult {
                cost: requested,
                outcome: Outcome::unsolved(),
                termination: RunTermination::Recycled,
            }
        };
        debug!(
            recorded_budget = recorded.budget,
            cost = result.cost,
            outcome = %result.outcome.kind,
            "Replayed recorded run"
        );
        Ok(result)
    }
}
