//! Task domain model.
//!
//! A task is a problem instance reference plus a lazily computed feature
//! vector. The first feature is conventionally the CPU cost of computing the
//! features themselves.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Named real-valued features of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        Self { names, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// CPU seconds spent computing these features (first value), or zero.
    pub fn cost(&self) -> f64 {
        self.values
            .first()
            .copied()
            .filter(|cost| cost.is_finite() && *cost > 0.0)
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i).copied())
    }
}

/// A problem instance to be solved.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    path: PathBuf,
    features: OnceCell<FeatureVector>,
}

impl Task {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            features: OnceCell::new(),
        }
    }

    /// Task identified by its own path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(path.display().to_string(), path)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Features if they have already been computed.
    pub fn features(&self) -> Option<&FeatureVector> {
        self.features.get()
    }

    /// Features, computing them with `init` on first access.
    ///
    /// Returns the vector and whether it was computed by this call, so the
    /// caller can charge the extraction cost exactly once.
    pub async fn features_or_init<F, Fut, E>(&self, init: F) -> Result<(&FeatureVector, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<FeatureVector, E>>,
    {
        if let Some(features) = self.features.get() {
            return Ok((features, false));
        }
        let mut computed = false;
        let features = self
            .features
            .get_or_try_init(|| {
                computed = true;
                init()
            })
            .await?;
        Ok((features, computed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_cost_is_first_value() {
        let features = FeatureVector::new(
            vec!["cost".into(), "ratio".into()],
            vec![1.5, 4.26],
        );
        assert!((features.cost() - 1.5).abs() < f64::EPSILON);
        assert_eq!(features.get("ratio"), Some(4.26));
        assert_eq!(features.get("missing"), None);
        assert!(FeatureVector::empty().cost().abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_feature_cost_is_ignored() {
        let features = FeatureVector::new(vec!["cost".into()], vec![-3.0]);
        assert!(features.cost().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_features_computed_once() {
        let task = Task::from_path("/tmp/instance.cnf");
        assert_eq!(task.id(), "/tmp/instance.cnf");
        assert!(task.features().is_none());

        let (first, computed) = task
            .features_or_init(|| async {
                Ok::<_, std::io::Error>(FeatureVector::new(vec!["cost".into()], vec![2.0]))
            })
            .await
            .unwrap();
        assert!(computed);
        assert!((first.cost() - 2.0).abs() < f64::EPSILON);

        let (_, computed) = task
            .features_or_init(|| async { Ok::<_, std::io::Error>(FeatureVector::empty()) })
            .await
            .unwrap();
        assert!(!computed);
        assert!((task.features().unwrap().cost() - 2.0).abs() < f64::EPSILON);
    }
}
