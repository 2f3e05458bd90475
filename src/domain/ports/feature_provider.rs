//! Feature provider port.

use async_trait::async_trait;

use crate::domain::models::{FeatureVector, Task};
use super::errors::FeatureError;

/// Port trait for domain-specific task analyzers.
///
/// The first returned value is conventionally the CPU cost of the analysis,
/// which the driver charges against the solving budget.
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    async fn compute_features(&self, task: &Task) -> Result<FeatureVector, FeatureError>;
}
