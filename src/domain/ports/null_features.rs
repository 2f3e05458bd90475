//! Null feature provider.
//!
//! Used when the strategy needs no task features.

use async_trait::async_trait;

use crate::domain::models::{FeatureVector, Task};
use super::errors::FeatureError;
use super::FeatureProvider;

/// A feature provider that computes nothing and costs nothing.
#[derive(Debug, Clone, Default)]
pub struct NullFeatureProvider;

impl NullFeatureProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeatureProvider for NullFeatureProvider {
    async fn compute_features(&self, _task: &Task) -> Result<FeatureVector, FeatureError> {
        Ok(FeatureVector::empty())
    }
}
