//! Execution harnesses
//!
//! - `LiveHarness`: spawns solvers under an OS-enforced CPU ceiling
//! - `RecycledHarness`: replays recorded runs from a run store
//!
//! Plus CPU accounting and competition output parsers.

pub mod cpu;
pub mod live;
pub mod output;
pub mod recycled;

pub use live::LiveHarness;
pub use output::{outcome_for, parse_output, STANDARD_EXIT_CODES};
pub use recycled::RecycledHarness;

use std::sync::Arc;

use crate::domain::models::{Config, ExecutionMode};
use crate::domain::ports::{ExecutionHarness, RunStore, SolverRegistry};

/// Build the harness selected by `config.execution.mode`.
pub fn build_harness(
    config: &Config,
    registry: Arc<dyn SolverRegistry>,
    store: Arc<dyn RunStore>,
) -> Arc<dyn ExecutionHarness> {
    match config.execution.mode {
        ExecutionMode::Live => Arc::new(LiveHarness::new(
            registry,
            config.execution.clone(),
            config.budget.machine_speed,
        )),
        ExecutionMode::Recycled => Arc::new(RecycledHarness::new(store)),
    }
}
