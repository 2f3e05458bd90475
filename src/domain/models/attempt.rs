//! Run results, recorded runs, and per-session attempt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::Action;
use super::outcome::Outcome;

/// How a solver invocation ended, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RunTermination {
    /// Process exited on its own with this code
    Exited { code: i32 },
    /// Process was terminated by a signal it did not ask for
    Signaled { signal: i32 },
    /// CPU ceiling reached; the process group was killed
    CeilingExceeded,
    /// Replayed from the run store, no process spawned
    Recycled,
}

/// Result of executing one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// CPU seconds charged against the budget
    pub cost: f64,
    pub outcome: Outcome,
    pub termination: RunTermination,
}

impl RunResult {
    /// A run that hit its ceiling: unsolved, charged the full ceiling.
    pub const fn ceiling_exceeded(ceiling: f64) -> Self {
        Self {
            cost: ceiling,
            outcome: Outcome::unsolved(),
            termination: RunTermination::CeilingExceeded,
        }
    }
}

/// A historical run available for recycling and training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRun {
    pub task_id: String,
    pub solver: String,
    /// CPU ceiling the run was given
    pub budget: f64,
    /// CPU seconds the run actually used
    pub cost: f64,
    pub outcome: Outcome,
}

/// One invocation within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptEntry {
    pub action: Action,
    pub result: RunResult,
}

/// What happened in the preprocessing pass of a session, if one ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSummary {
    pub preprocessor: String,
    pub cost: f64,
    pub solved_directly: bool,
    /// Identifier of the preprocessed task, if a new one was produced
    pub output_task: Option<String>,
}

/// Finalized record of one solve session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub task_id: String,
    /// Budget the session was given
    pub budget: f64,
    /// Total CPU seconds charged, including features and overhead
    pub cost: f64,
    pub entries: Vec<AttemptEntry>,
    pub answer: Option<Outcome>,
    pub preprocessing: Option<PreprocessingSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn is_solved(&self) -> bool {
        self.answer.as_ref().is_some_and(Outcome::is_solved)
    }

    pub fn invocations(&self) -> usize {
        self.entries.len()
    }
}
