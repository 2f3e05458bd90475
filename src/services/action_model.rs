//! Action models: predicted outcome probabilities per action, given the
//! outcomes observed so far in a session and, for the classifier, the
//! task's features.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CountArray, FeatureVector, OutcomeKind, RecordedRun};
use super::feature_classifier::FeatureClassifier;
use super::mixture_estimator::MixtureModel;
use super::statistics::normalize_in_place;
use super::world_model::WorldModel;

/// Outcome probabilities per action, `nactions x noutcomes`, rows summing
/// to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionTable {
    nactions: usize,
    noutcomes: usize,
    probabilities: Vec<f64>,
}

impl PredictionTable {
    /// Build from raw nonnegative scores, normalizing each row.
    pub fn from_scores(nactions: usize, noutcomes: usize, mut scores: Vec<f64>) -> Self {
        for row in scores.chunks_mut(noutcomes.max(1)) {
            normalize_in_place(row);
        }
        Self {
            nactions,
            noutcomes,
            probabilities: scores,
        }
    }

    /// Check the table's size and that every row is a distribution.
    pub fn validate(&self) -> DomainResult<()> {
        if self.noutcomes == 0 || self.probabilities.len() != self.nactions * self.noutcomes {
            return Err(DomainError::InvalidModel(format!(
                "prediction table holds {} probabilities for {}x{}",
                self.probabilities.len(),
                self.nactions,
                self.noutcomes
            )));
        }
        for (action, row) in self.probabilities.chunks(self.noutcomes).enumerate() {
            let total: f64 = row.iter().sum();
            if !row.iter().all(|p| p.is_finite() && *p >= 0.0) || (total - 1.0).abs() > 1e-6 {
                return Err(DomainError::InvalidModel(format!(
                    "prediction row for action {action} is not a distribution: {row:?}"
                )));
            }
        }
        Ok(())
    }

    pub const fn nactions(&self) -> usize {
        self.nactions
    }

    pub const fn noutcomes(&self) -> usize {
        self.noutcomes
    }

    pub fn get(&self, action: usize, outcome: OutcomeKind) -> f64 {
        self.probabilities[action * self.noutcomes + outcome.index()]
    }

    pub fn row(&self, action: usize) -> &[f64] {
        &self.probabilities[action * self.noutcomes..(action + 1) * self.noutcomes]
    }

    /// Probability that `action` yields any solved outcome.
    pub fn success_rate(&self, action: usize) -> f64 {
        (1.0 - self.get(action, OutcomeKind::Unsolved)).clamp(0.0, 1.0)
    }

    pub fn success_rates(&self) -> Vec<f64> {
        (0..self.nactions).map(|a| self.success_rate(a)).collect()
    }
}

/// Pool all training counts into one smoothed categorical per action.
pub(crate) fn pooled_table(training: &[CountArray], concentration: f64) -> DomainResult<PredictionTable> {
    let first = training.first().ok_or(DomainError::EmptyTrainingSet)?;
    let (nactions, noutcomes) = (first.nactions(), first.noutcomes());
    let mut scores = vec![concentration; nactions * noutcomes];
    for counts in training {
        counts.check_shape(nactions, noutcomes)?;
        for a in 0..nactions {
            for (d, &c) in counts.row(a).iter().enumerate() {
                scores[a * noutcomes + d] += f64::from(c);
            }
        }
    }
    Ok(PredictionTable::from_scores(nactions, noutcomes, scores))
}

/// The closed set of action-model variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionModel {
    /// Pooled outcome frequencies; ignores the session history.
    Multinomial { prediction: PredictionTable },
    /// Mixture over task populations with a per-session posterior.
    Mixture { mixture: MixtureModel },
    /// Per-action success predicted from task features; ignores the
    /// session history.
    Classifier { classifier: FeatureClassifier },
    /// True per-task outcome frequencies taken from recorded runs.
    Oracle {
        tables: BTreeMap<String, PredictionTable>,
    },
    /// Uninformed baseline. Deterministic in (seed, history).
    Random {
        seed: u64,
        nactions: usize,
        noutcomes: usize,
    },
}

impl ActionModel {
    /// Pool all training counts into one smoothed categorical per action.
    pub fn multinomial(training: &[CountArray], concentration: f64) -> DomainResult<Self> {
        Ok(Self::Multinomial {
            prediction: pooled_table(training, concentration)?,
        })
    }

    pub const fn mixture(mixture: MixtureModel) -> Self {
        Self::Mixture { mixture }
    }

    /// Wrap a fitted feature classifier.
    pub const fn classifier(classifier: FeatureClassifier) -> Self {
        Self::Classifier { classifier }
    }

    /// Per-task outcome frequencies from recorded runs.
    ///
    /// Actions never observed on a task are predicted to stay unsolved.
    pub fn oracle(world: &WorldModel, runs: &[RecordedRun]) -> DomainResult<Self> {
        let mut by_task: BTreeMap<&str, Vec<RecordedRun>> = BTreeMap::new();
        for run in runs {
            by_task.entry(run.task_id.as_str()).or_default().push(run.clone());
        }

        let mut tables = BTreeMap::new();
        for (task_id, task_runs) in by_task {
            let counts = world.counts_from_runs(&task_runs)?;
            let mut scores = Vec::with_capacity(world.nactions() * world.noutcomes());
            for a in 0..world.nactions() {
                if counts.total(a) == 0 {
                    let mut unsolved = vec![0.0; world.noutcomes()];
                    unsolved[OutcomeKind::Unsolved.index()] = 1.0;
                    scores.extend(unsolved);
                } else {
                    scores.extend(counts.row(a).iter().map(|&c| f64::from(c)));
                }
            }
            tables.insert(
                task_id.to_string(),
                PredictionTable::from_scores(world.nactions(), world.noutcomes(), scores),
            );
        }
        Ok(Self::Oracle { tables })
    }

    /// Random baseline over `nactions x noutcomes`.
    pub const fn random(seed: u64, nactions: usize, noutcomes: usize) -> Self {
        Self::Random {
            seed,
            nactions,
            noutcomes,
        }
    }

    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Multinomial { .. } => "multinomial",
            Self::Mixture { .. } => "mixture",
            Self::Classifier { .. } => "classifier",
            Self::Oracle { .. } => "oracle",
            Self::Random { .. } => "random",
        }
    }

    /// Posterior component weights, for mixture models only.
    pub fn posterior(&self, history: &CountArray) -> Option<Vec<f64>> {
        match self {
            Self::Mixture { mixture } => Some(mixture.posterior(history)),
            _ => None,
        }
    }

    /// Predict outcome probabilities for every action given `history`.
    ///
    /// `features` only informs the classifier. The posterior is recomputed
    /// from scratch on every call; nothing is cached across calls.
    pub fn predict(
        &self,
        task_id: &str,
        features: Option<&FeatureVector>,
        history: &CountArray,
    ) -> DomainResult<PredictionTable> {
        match self {
            Self::Multinomial { prediction } => {
                history.check_shape(prediction.nactions, prediction.noutcomes)?;
                Ok(prediction.clone())
            }
            Self::Mixture { mixture } => {
                history.check_shape(mixture.nactions(), mixture.noutcomes())?;
                Ok(predict_mixture(mixture, history))
            }
            Self::Classifier { classifier } => {
                history.check_shape(classifier.nactions(), classifier.noutcomes())?;
                Ok(classifier.predict(features))
            }
            Self::Oracle { tables } => tables.get(task_id).cloned().ok_or_else(|| {
                DomainError::InvalidModel(format!("oracle has no runs for task {task_id}"))
            }),
            Self::Random {
                seed,
                nactions,
                noutcomes,
            } => {
                history.check_shape(*nactions, *noutcomes)?;
                let mut rng = StdRng::seed_from_u64(mix_history(*seed, history));
                let scores = (0..nactions * noutcomes)
                    .map(|_| rng.random_range(0.0..1.0))
                    .collect();
                Ok(PredictionTable::from_scores(*nactions, *noutcomes, scores))
            }
        }
    }
}

fn predict_mixture(mixture: &MixtureModel, history: &CountArray) -> PredictionTable {
    let posterior = mixture.posterior(history);
    let (nactions, noutcomes) = (mixture.nactions(), mixture.noutcomes());
    let mut scores = vec![0.0; nactions * noutcomes];
    for (k, weight) in posterior.iter().enumerate() {
        if *weight == 0.0 {
            continue;
        }
        for a in 0..nactions {
            let predictive = mixture.predictive(k, a, history.row(a));
            for (d, p) in predictive.iter().enumerate() {
                scores[a * noutcomes + d] += weight * p;
            }
        }
    }
    PredictionTable::from_scores(nactions, noutcomes, scores)
}

/// Fold the history counts into the seed (FNV-1a style).
fn mix_history(seed: u64, history: &CountArray) -> u64 {
    const PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
    for a in 0..history.nactions() {
        for &c in history.row(a) {
            hash ^= u64::from(c);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}
