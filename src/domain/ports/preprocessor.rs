//! Preprocessor port.

use async_trait::async_trait;

use crate::domain::models::{Outcome, Task};
use super::errors::PreprocessError;

/// Result of one preprocessing pass.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// CPU seconds spent preprocessing
    pub cost: f64,
    /// Set when the preprocessor solved the instance outright
    pub answer: Option<Outcome>,
    /// Simplified instance, when one was produced
    pub output: Option<Task>,
}

/// Port trait for instance preprocessors (simplifiers).
#[async_trait]
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &str;

    /// Preprocess `task` within `budget` CPU seconds.
    async fn preprocess(&self, task: &Task, budget: f64) -> Result<Preprocessed, PreprocessError>;

    /// Map a positive answer on the preprocessed task back to the original.
    async fn extend(&self, preprocessed: &Task, answer: Outcome) -> Result<Outcome, PreprocessError>;
}
