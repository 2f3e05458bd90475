//! Feature providers backed by precomputed data.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::models::{FeatureVector, Task};
use crate::domain::ports::{FeatureError, FeatureProvider};

/// Serves feature vectors recorded earlier, keyed by task id.
#[derive(Debug, Clone, Default)]
pub struct RecordedFeatureProvider {
    features: HashMap<String, FeatureVector>,
}

impl RecordedFeatureProvider {
    /// Provider serving `features`, keyed by task id.
    pub fn new(features: HashMap<String, FeatureVector>) -> Self {
        Self { features }
    }

    /// Load a JSON object mapping task ids to `{names, values}`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read features {}", path.display()))?;
        let features = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse features {}", path.display()))?;
        Ok(Self::new(features))
    }
}

#[async_trait]
impl FeatureProvider for RecordedFeatureProvider {
    async fn compute_features(&self, task: &Task) -> Result<FeatureVector, FeatureError> {
        self.features
            .get(task.id())
            .cloned()
            .ok_or_else(|| FeatureError::Unavailable(task.id().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_recorded_features() {
        let mut features = HashMap::new();
        features.insert(
            "t1".to_string(),
            FeatureVector::new(vec!["cost".into(), "clauses".into()], vec![0.5, 1200.0]),
        );
        let provider = RecordedFeatureProvider::new(features);

        let vector = provider.compute_features(&Task::new("t1", "/x")).await.unwrap();
        assert_eq!(vector.get("clauses"), Some(1200.0));
        assert!(matches!(
            provider.compute_features(&Task::new("t2", "/y")).await,
            Err(FeatureError::Unavailable(_))
        ));
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(&path, r#"{"t1": {"names": ["cost"], "values": [0.25]}}"#).unwrap();
        let provider = RecordedFeatureProvider::load_json(&path).unwrap();
        assert_eq!(provider.features.len(), 1);
    }
}
