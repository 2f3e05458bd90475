//! Domain errors for the portfolio decision engine.

use thiserror::Error;

use super::models::strategy_state::StrategyState;

/// Format a budget list as `[10, 20, 30]` for error messages.
fn format_budgets(budgets: &[f64]) -> String {
    let items = budgets
        .iter()
        .map(|b| format!("{b}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{items}]")
}

/// Domain-level errors. Every variant is a precondition violation or an
/// unrecoverable modelling failure; solver misbehaviour never shows up here.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Budget ladder must be ascending and evenly spaced from zero: {}", format_budgets(.0))]
    InvalidBudgetLadder(Vec<f64>),

    #[error("Budget must be nonnegative and finite, got {0}")]
    NegativeBudget(f64),

    #[error("Action not in world vocabulary: {0}")]
    UnknownAction(String),

    #[error("Solver not in world vocabulary: {0}")]
    UnknownSolver(String),

    #[error("Count array shape mismatch: expected {expected_actions}x{expected_outcomes}, got {actual_actions}x{actual_outcomes}")]
    ShapeMismatch {
        expected_actions: usize,
        expected_outcomes: usize,
        actual_actions: usize,
        actual_outcomes: usize,
    },

    #[error("Invalid strategy transition from {from} on {operation}")]
    InvalidStateTransition {
        from: StrategyState,
        operation: &'static str,
    },

    #[error("Observed action {observed} does not match pending action {pending}")]
    UnexpectedObservation { observed: String, pending: String },

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
