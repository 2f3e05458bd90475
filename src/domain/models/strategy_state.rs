use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a strategy within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyState {
    /// Waiting for the next `select`
    Ready,
    /// An action was emitted and its outcome has not been observed yet
    AwaitingOutcome,
    /// No feasible action remains; every further `select` yields nothing
    Exhausted,
}

impl StrategyState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::AwaitingOutcome => "awaiting_outcome",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
