//! Cached-run store port (read side only).

use async_trait::async_trait;

use crate::domain::models::RecordedRun;
use super::errors::HarnessError;

/// Port trait for looking up previously recorded solver runs.
///
/// Writing runs belongs to the storage layer and is not part of this port.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// A recorded run of `solver` on `task_id` whose budget is at least
    /// `min_budget`, or `None` when no such run exists.
    async fn lookup(
        &self,
        task_id: &str,
        solver: &str,
        min_budget: f64,
    ) -> Result<Option<RecordedRun>, HarnessError>;

    /// Every recorded run for one task, used for training and oracles.
    async fn runs_for_task(&self, task_id: &str) -> Result<Vec<RecordedRun>, HarnessError>;

    /// Identifiers of every task with at least one recorded run, sorted.
    async fn task_ids(&self) -> Result<Vec<String>, HarnessError>;
}
