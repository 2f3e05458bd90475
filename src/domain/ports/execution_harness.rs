//! Execution harness port.
//!
//! A harness turns one action on one task into a [`RunResult`]. Two
//! implementations exist: a live harness that spawns the solver under an
//! OS-enforced CPU ceiling, and a recycling harness that replays a recorded
//! run without spawning anything.

use async_trait::async_trait;

use crate::domain::models::{Action, RunResult, Task};
use super::errors::HarnessError;

/// Port trait for running solver actions.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one harness may serve many
/// independent sessions.
#[async_trait]
pub trait ExecutionHarness: Send + Sync {
    /// Short identifier for logs ("live", "recycled").
    fn harness_id(&self) -> &str;

    /// Run `action` on `task`.
    ///
    /// # Returns
    /// * `Ok(RunResult)` - the run finished, possibly unsolved
    /// * `Err(HarnessError)` - the harness itself failed; any child process
    ///   has already been killed and reaped
    async fn run(&self, action: &Action, task: &Task) -> Result<RunResult, HarnessError>;
}
