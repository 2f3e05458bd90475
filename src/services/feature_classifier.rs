//! Feature-conditioned action model.
//!
//! One L2-regularized logistic regression per action predicts the chance
//! that the action solves a task from the task's standardized features.
//! Solved mass is split between positive and negative answers in the pooled
//! proportions; tasks without features get the pooled prediction.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CountArray, EstimatorConfig, FeatureVector, OutcomeKind};
use super::action_model::{pooled_table, PredictionTable};

/// Clamp for probabilities fed through `logit`.
const PROBABILITY_FLOOR: f64 = 1e-6;

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR);
    (p / (1.0 - p)).ln()
}

/// Per-action logistic success models over a fixed, named feature set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureClassifier {
    names: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
    /// Per action: bias, then one weight per feature
    weights: Vec<Vec<f64>>,
    pooled: PredictionTable,
}

impl FeatureClassifier {
    /// Fit one logistic model per action.
    ///
    /// `features[i]` describes the task behind `counts[i]`. Each task
    /// contributes its observed success fraction on an action as a soft
    /// label; tasks that never ran an action do not inform it.
    pub fn fit(
        counts: &[CountArray],
        features: &[FeatureVector],
        config: &EstimatorConfig,
    ) -> DomainResult<Self> {
        if counts.is_empty() {
            return Err(DomainError::EmptyTrainingSet);
        }
        if features.len() != counts.len() {
            return Err(DomainError::InvalidModel(format!(
                "classifier needs features for every task: {} feature vectors for {} tasks",
                features.len(),
                counts.len()
            )));
        }
        let names = features[0].names.clone();
        for vector in features {
            if vector.names != names || vector.values.len() != names.len() {
                return Err(DomainError::InvalidModel(
                    "classifier training tasks disagree on feature names".to_string(),
                ));
            }
        }

        let pooled = pooled_table(counts, config.concentration)?;
        let (means, scales) = standardization(features, names.len());
        let rows: Vec<Vec<f64>> = features
            .iter()
            .map(|vector| standardize(&vector.values, &means, &scales))
            .collect();

        let weights = (0..pooled.nactions())
            .map(|action| {
                let samples: Vec<(&[f64], f64)> = counts
                    .iter()
                    .zip(&rows)
                    .filter(|(task, _)| task.total(action) > 0)
                    .map(|(task, row)| {
                        let total = f64::from(task.total(action));
                        let unsolved = f64::from(task.get(action, OutcomeKind::Unsolved.index()));
                        (row.as_slice(), (total - unsolved) / total)
                    })
                    .collect();
                fit_logistic(&samples, names.len(), pooled.success_rate(action), config)
            })
            .collect();

        let classifier = Self {
            names,
            means,
            scales,
            weights,
            pooled,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    pub const fn nactions(&self) -> usize {
        self.pooled.nactions()
    }

    pub const fn noutcomes(&self) -> usize {
        self.pooled.noutcomes()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Check that every parameter is finite and sized for the feature set.
    pub fn validate(&self) -> DomainResult<()> {
        self.pooled.validate()?;
        let nfeatures = self.names.len();
        let sized = self.means.len() == nfeatures
            && self.scales.len() == nfeatures
            && self.weights.len() == self.pooled.nactions()
            && self.weights.iter().all(|w| w.len() == nfeatures + 1);
        if !sized {
            return Err(DomainError::InvalidModel(format!(
                "classifier parameters do not match {nfeatures} features and {} actions",
                self.pooled.nactions()
            )));
        }
        let finite = self.means.iter().all(|m| m.is_finite())
            && self.scales.iter().all(|s| s.is_finite() && *s > 0.0)
            && self.weights.iter().flatten().all(|w| w.is_finite());
        if !finite {
            return Err(DomainError::InvalidModel(
                "classifier parameters must be finite with positive scales".to_string(),
            ));
        }
        Ok(())
    }

    /// Outcome probabilities for a task with `features`.
    ///
    /// Features are matched by name; a missing one takes its training mean.
    pub fn predict(&self, features: Option<&FeatureVector>) -> PredictionTable {
        let Some(features) = features.filter(|f| !f.is_empty()) else {
            return self.pooled.clone();
        };
        let values: Vec<f64> = self
            .names
            .iter()
            .zip(&self.means)
            .map(|(name, mean)| features.get(name).filter(|v| v.is_finite()).unwrap_or(*mean))
            .collect();
        let row = standardize(&values, &self.means, &self.scales);

        let noutcomes = self.noutcomes();
        let unsolved = OutcomeKind::Unsolved.index();
        let mut scores = Vec::with_capacity(self.nactions() * noutcomes);
        for (action, weights) in self.weights.iter().enumerate() {
            let success = sigmoid(linear(weights, &row));
            let pooled = self.pooled.row(action);
            let solved_mass: f64 = (0..noutcomes).filter(|&d| d != unsolved).map(|d| pooled[d]).sum();
            for (d, p) in pooled.iter().enumerate() {
                scores.push(if d == unsolved {
                    1.0 - success
                } else if solved_mass > 0.0 {
                    success * p / solved_mass
                } else if d == OutcomeKind::Positive.index() {
                    success
                } else {
                    0.0
                });
            }
        }
        PredictionTable::from_scores(self.nactions(), noutcomes, scores)
    }
}

fn standardization(features: &[FeatureVector], nfeatures: usize) -> (Vec<f64>, Vec<f64>) {
    let n = features.len() as f64;
    let mut means = vec![0.0; nfeatures];
    for vector in features {
        for (mean, value) in means.iter_mut().zip(&vector.values) {
            *mean += value / n;
        }
    }
    let mut scales = vec![0.0; nfeatures];
    for vector in features {
        for ((scale, value), mean) in scales.iter_mut().zip(&vector.values).zip(&means) {
            *scale += (value - mean).powi(2) / n;
        }
    }
    for scale in &mut scales {
        *scale = if scale.sqrt() > 1e-12 { scale.sqrt() } else { 1.0 };
    }
    (means, scales)
}

fn standardize(values: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(means)
        .zip(scales)
        .map(|((value, mean), scale)| (value - mean) / scale)
        .collect()
}

fn linear(weights: &[f64], row: &[f64]) -> f64 {
    weights[0] + weights[1..].iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
}

/// Batch gradient descent on the mean cross-entropy plus an L2 penalty on
/// the non-bias weights. Starts from the pooled rate.
fn fit_logistic(
    samples: &[(&[f64], f64)],
    nfeatures: usize,
    prior_rate: f64,
    config: &EstimatorConfig,
) -> Vec<f64> {
    let mut weights = vec![0.0; nfeatures + 1];
    weights[0] = logit(prior_rate);
    if samples.is_empty() {
        return weights;
    }

    let n = samples.len() as f64;
    let mut gradient = vec![0.0; nfeatures + 1];
    for _ in 0..config.logistic_iterations {
        gradient.iter_mut().for_each(|g| *g = 0.0);
        for (row, label) in samples {
            let error = sigmoid(linear(&weights, row)) - label;
            gradient[0] += error;
            for (g, x) in gradient[1..].iter_mut().zip(row.iter()) {
                *g += error * x;
            }
        }
        for (j, (w, g)) in weights.iter_mut().zip(&gradient).enumerate() {
            let penalty = if j == 0 { 0.0 } else { config.logistic_l2 * *w };
            *w -= config.logistic_step * (g / n + penalty);
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(hardness: f64) -> FeatureVector {
        FeatureVector::new(
            vec!["cost".to_string(), "hardness".to_string()],
            vec![0.5, hardness],
        )
    }

    /// Action 0 solves easy tasks, action 1 solves hard ones.
    fn training() -> (Vec<CountArray>, Vec<FeatureVector>) {
        let mut counts = Vec::new();
        let mut vectors = Vec::new();
        for i in 0..8 {
            let hard = i % 2 == 1;
            let rows = if hard {
                vec![vec![4, 0, 0], vec![0, 4, 0]]
            } else {
                vec![vec![0, 3, 1], vec![4, 0, 0]]
            };
            counts.push(CountArray::from_rows(&rows).unwrap());
            vectors.push(features(if hard { 10.0 + f64::from(i) } else { f64::from(i) }));
        }
        (counts, vectors)
    }

    #[test]
    fn test_prediction_follows_features() {
        let (counts, vectors) = training();
        let classifier =
            FeatureClassifier::fit(&counts, &vectors, &EstimatorConfig::default()).unwrap();

        let easy = classifier.predict(Some(&features(2.0)));
        let hard = classifier.predict(Some(&features(13.0)));
        assert!(easy.success_rate(0) > 0.8);
        assert!(easy.success_rate(1) < 0.2);
        assert!(hard.success_rate(1) > 0.8);
        assert!(hard.success_rate(0) < 0.2);
        assert!(easy.validate().is_ok());
    }

    #[test]
    fn test_solved_mass_split_follows_pooled_answers() {
        let (counts, vectors) = training();
        let classifier =
            FeatureClassifier::fit(&counts, &vectors, &EstimatorConfig::default()).unwrap();
        let easy = classifier.predict(Some(&features(2.0)));
        let positive = easy.get(0, OutcomeKind::Positive);
        let negative = easy.get(0, OutcomeKind::Negative);
        assert!((positive / negative - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_missing_features_fall_back_to_pooled() {
        let (counts, vectors) = training();
        let config = EstimatorConfig::default();
        let classifier = FeatureClassifier::fit(&counts, &vectors, &config).unwrap();
        let pooled = pooled_table(&counts, config.concentration).unwrap();
        assert_eq!(classifier.predict(None), pooled);
        assert_eq!(classifier.predict(Some(&FeatureVector::empty())), pooled);
    }

    #[test]
    fn test_fit_requires_features_for_every_task() {
        let (counts, mut vectors) = training();
        vectors.pop();
        assert!(matches!(
            FeatureClassifier::fit(&counts, &vectors, &EstimatorConfig::default()),
            Err(DomainError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_validate_rejects_truncated_weights() {
        let (counts, vectors) = training();
        let mut classifier =
            FeatureClassifier::fit(&counts, &vectors, &EstimatorConfig::default()).unwrap();
        classifier.weights[1].pop();
        assert!(classifier.validate().is_err());
    }
}
