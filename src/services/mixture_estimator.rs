//! Finite mixture models over per-action outcome counts, fitted by EM.
//!
//! Each training example is one task's `nactions x noutcomes` count array.
//! A component holds, for every action, either a categorical distribution
//! over outcomes or a Dirichlet-compound-multinomial concentration vector.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ComponentFamily, CountArray, EstimatorConfig};
use super::statistics::{digamma, ln_gamma, log_sum_exp, normalize_in_place, normalize_log_weights};

/// Smallest concentration a DCM component may hold.
const MIN_CONCENTRATION: f64 = 1e-6;

/// Inner fixed-point iterations per DCM M-step.
const DCM_FIXED_POINT_ITERATIONS: usize = 16;

/// A fitted mixture. Read-only once estimated; per-session posterior weights
/// are computed from it and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureModel {
    family: ComponentFamily,
    nactions: usize,
    noutcomes: usize,
    weights: Vec<f64>,
    /// One flat `nactions x noutcomes` parameter block per component:
    /// probabilities for categorical components, concentrations for DCM.
    components: Vec<Vec<f64>>,
    #[serde(default)]
    training_log_likelihood: Option<f64>,
}

impl MixtureModel {
    /// Assemble a model from explicit parameters, validating them.
    pub fn from_parts(
        family: ComponentFamily,
        nactions: usize,
        noutcomes: usize,
        weights: Vec<f64>,
        components: Vec<Vec<f64>>,
    ) -> DomainResult<Self> {
        let model = Self {
            family,
            nactions,
            noutcomes,
            weights,
            components,
            training_log_likelihood: None,
        };
        model.validate()?;
        Ok(model)
    }

    pub const fn family(&self) -> ComponentFamily {
        self.family
    }

    pub const fn nactions(&self) -> usize {
        self.nactions
    }

    pub const fn noutcomes(&self) -> usize {
        self.noutcomes
    }

    pub fn ncomponents(&self) -> usize {
        self.weights.len()
    }

    /// Prior component weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Parameters of component `k` for `action`.
    pub fn parameters(&self, k: usize, action: usize) -> &[f64] {
        let start = action * self.noutcomes;
        &self.components[k][start..start + self.noutcomes]
    }

    /// Log-likelihood of the fitted training set; `None` for hand-built models.
    pub const fn training_log_likelihood(&self) -> Option<f64> {
        self.training_log_likelihood
    }

    fn fit_score(&self) -> f64 {
        self.training_log_likelihood.unwrap_or(f64::NEG_INFINITY)
    }

    /// Check the stored parameters: weights form a simplex, categorical rows
    /// form simplices, concentrations are strictly positive, nothing is NaN.
    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |message: String| Err(DomainError::InvalidModel(message));

        if self.weights.is_empty() || self.weights.len() != self.components.len() {
            return invalid(format!(
                "{} weights for {} components",
                self.weights.len(),
                self.components.len()
            ));
        }
        if !is_simplex(&self.weights) {
            return invalid("component weights do not sum to one".to_string());
        }
        for (k, component) in self.components.iter().enumerate() {
            if component.len() != self.nactions * self.noutcomes {
                return invalid(format!("component {k} has wrong parameter count"));
            }
            for action in 0..self.nactions {
                let row = self.parameters(k, action);
                let ok = match self.family {
                    ComponentFamily::Multinomial => is_simplex(row),
                    ComponentFamily::Dcm => row.iter().all(|a| a.is_finite() && *a > 0.0),
                };
                if !ok {
                    return invalid(format!("component {k}, action {action}: {row:?}"));
                }
            }
        }
        Ok(())
    }

    /// Log-likelihood of the exact outcome sequence summarized by `counts`
    /// under component `k`. Actions with no observations contribute zero.
    pub fn log_likelihood(&self, k: usize, counts: &CountArray) -> f64 {
        (0..self.nactions)
            .filter(|&a| counts.total(a) > 0)
            .map(|a| self.action_log_likelihood(k, a, counts.row(a)))
            .sum()
    }

    fn action_log_likelihood(&self, k: usize, action: usize, row: &[u32]) -> f64 {
        let parameters = self.parameters(k, action);
        match self.family {
            ComponentFamily::Multinomial => parameters
                .iter()
                .zip(row)
                .filter(|(_, &c)| c > 0)
                .map(|(p, &c)| f64::from(c) * p.ln())
                .sum(),
            ComponentFamily::Dcm => dcm_log_likelihood(parameters, row),
        }
    }

    /// Posterior component weights given one session's counts.
    ///
    /// An all-zero history returns the prior weights unchanged.
    pub fn posterior(&self, counts: &CountArray) -> Vec<f64> {
        if counts.is_zero() {
            return self.weights.clone();
        }
        let log_weights: Vec<f64> = self
            .weights
            .iter()
            .enumerate()
            .map(|(k, w)| w.ln() + self.log_likelihood(k, counts))
            .collect();
        normalize_log_weights(&log_weights)
    }

    /// Posterior-predictive outcome distribution for `action` under
    /// component `k`, given that action's observed counts.
    pub fn predictive(&self, k: usize, action: usize, row: &[u32]) -> Vec<f64> {
        let parameters = self.parameters(k, action);
        match self.family {
            ComponentFamily::Multinomial => parameters.to_vec(),
            ComponentFamily::Dcm => {
                let total_alpha: f64 = parameters.iter().sum();
                let total_counts: f64 = row.iter().map(|&c| f64::from(c)).sum();
                let norm = total_alpha + total_counts;
                parameters
                    .iter()
                    .zip(row)
                    .map(|(a, &c)| (a + f64::from(c)) / norm)
                    .collect()
            }
        }
    }
}

/// `ln P(sequence | alpha)` for a DCM with concentrations `alpha`.
fn dcm_log_likelihood(alpha: &[f64], counts: &[u32]) -> f64 {
    let total_alpha: f64 = alpha.iter().sum();
    let total_counts: f64 = counts.iter().map(|&c| f64::from(c)).sum();
    let mut ll = ln_gamma(total_alpha) - ln_gamma(total_alpha + total_counts);
    for (a, &c) in alpha.iter().zip(counts) {
        if c > 0 {
            ll += ln_gamma(a + f64::from(c)) - ln_gamma(*a);
        }
    }
    ll
}

fn is_simplex(values: &[f64]) -> bool {
    let total: f64 = values.iter().sum();
    values.iter().all(|v| v.is_finite() && *v >= 0.0) && (total - 1.0).abs() < 1e-6
}

/// EM estimator for [`MixtureModel`].
#[derive(Debug, Clone)]
pub struct MixtureEstimator {
    config: EstimatorConfig,
}

impl MixtureEstimator {
    /// Estimator fitting `config.components` components by EM.
    pub const fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Fit a mixture to `training`, keeping the best of several restarts.
    ///
    /// The number of components is capped at the number of examples.
    pub fn estimate(&self, training: &[CountArray]) -> DomainResult<MixtureModel> {
        let first = training.first().ok_or(DomainError::EmptyTrainingSet)?;
        let (nactions, noutcomes) = (first.nactions(), first.noutcomes());
        for counts in training {
            counts.check_shape(nactions, noutcomes)?;
        }
        if self.config.components == 0 || self.config.restarts == 0 {
            return Err(DomainError::InvalidModel(
                "estimator needs at least one component and one restart".to_string(),
            ));
        }

        let ncomponents = self.config.components.min(training.len());
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut best: Option<MixtureModel> = None;
        for restart in 0..self.config.restarts {
            let model = self.run_restart(training, ncomponents, nactions, noutcomes, &mut rng);
            debug!(restart, log_likelihood = model.fit_score(), "EM restart finished");
            let better = best
                .as_ref()
                .is_none_or(|b| model.fit_score() > b.fit_score());
            if better {
                best = Some(model);
            }
        }

        let model = best.ok_or(DomainError::EmptyTrainingSet)?;
        model.validate()?;
        info!(
            family = ?model.family,
            components = model.ncomponents(),
            examples = training.len(),
            log_likelihood = model.fit_score(),
            "Fitted mixture model"
        );
        Ok(model)
    }

    fn run_restart(
        &self,
        training: &[CountArray],
        ncomponents: usize,
        nactions: usize,
        noutcomes: usize,
        rng: &mut StdRng,
    ) -> MixtureModel {
        let initial_parameter = match self.config.family {
            ComponentFamily::Multinomial => 1.0 / noutcomes as f64,
            ComponentFamily::Dcm => 1.0,
        };
        let mut model = MixtureModel {
            family: self.config.family,
            nactions,
            noutcomes,
            weights: vec![1.0 / ncomponents as f64; ncomponents],
            components: vec![vec![initial_parameter; nactions * noutcomes]; ncomponents],
            training_log_likelihood: None,
        };

        let mut responsibilities: Vec<Vec<f64>> = training
            .iter()
            .map(|_| {
                let mut row: Vec<f64> = (0..ncomponents).map(|_| rng.random_range(0.0..1.0)).collect();
                normalize_in_place(&mut row);
                row
            })
            .collect();

        let mut previous = f64::NEG_INFINITY;
        for iteration in 0..self.config.max_iterations {
            self.maximize(&mut model, training, &responsibilities);
            let ll = expectation(&model, training, &mut responsibilities);
            model.training_log_likelihood = Some(ll);

            let converged = previous.is_finite()
                && (ll - previous).abs() <= self.config.tolerance * previous.abs().max(1.0);
            if converged {
                debug!(iteration, log_likelihood = ll, "EM converged");
                break;
            }
            previous = ll;
        }
        model
    }

    /// M-step: re-estimate weights and component parameters.
    fn maximize(&self, model: &mut MixtureModel, training: &[CountArray], responsibilities: &[Vec<f64>]) {
        let n = training.len() as f64;
        for k in 0..model.weights.len() {
            let column: Vec<f64> = responsibilities.iter().map(|r| r[k]).collect();
            model.weights[k] = column.iter().sum::<f64>() / n;

            for action in 0..model.nactions {
                let start = action * model.noutcomes;
                let end = start + model.noutcomes;
                let updated = match model.family {
                    ComponentFamily::Multinomial => {
                        self.categorical_update(training, &column, action, model.noutcomes)
                    }
                    ComponentFamily::Dcm => self.dcm_update(
                        training,
                        &column,
                        action,
                        &model.components[k][start..end],
                    ),
                };
                model.components[k][start..end].copy_from_slice(&updated);
            }
        }
        normalize_in_place(&mut model.weights);
    }

    /// MAP categorical estimate with a symmetric pseudo-count.
    fn categorical_update(
        &self,
        training: &[CountArray],
        column: &[f64],
        action: usize,
        noutcomes: usize,
    ) -> Vec<f64> {
        let beta = self.config.concentration;
        let mut numerators = vec![beta; noutcomes];
        for (counts, r) in training.iter().zip(column) {
            for (d, &c) in counts.row(action).iter().enumerate() {
                numerators[d] += r * f64::from(c);
            }
        }
        normalize_in_place(&mut numerators);
        numerators
    }

    /// MAP DCM concentrations under a Gamma prior, by Minka's fixed point.
    fn dcm_update(
        &self,
        training: &[CountArray],
        column: &[f64],
        action: usize,
        current: &[f64],
    ) -> Vec<f64> {
        let shape = self.config.dcm_prior_shape;
        let rate = 1.0 / self.config.dcm_prior_scale;
        let mut alpha = current.to_vec();

        for _ in 0..DCM_FIXED_POINT_ITERATIONS {
            let total_alpha: f64 = alpha.iter().sum();
            let psi_total = digamma(total_alpha);
            let mut denominator = rate;
            let mut numerators = vec![0.0; alpha.len()];

            for (counts, &r) in training.iter().zip(column) {
                let row = counts.row(action);
                let total = counts.total(action);
                if total == 0 || r <= 0.0 {
                    continue;
                }
                denominator += r * (digamma(total_alpha + f64::from(total)) - psi_total);
                for (d, &c) in row.iter().enumerate() {
                    if c > 0 {
                        numerators[d] += r * (digamma(alpha[d] + f64::from(c)) - digamma(alpha[d]));
                    }
                }
            }

            for (a, numerator) in alpha.iter_mut().zip(&numerators) {
                let next = (*a * numerator + (shape - 1.0)) / denominator;
                *a = if next.is_finite() {
                    next.max(MIN_CONCENTRATION)
                } else {
                    MIN_CONCENTRATION
                };
            }
        }
        alpha
    }
}

/// E-step: recompute responsibilities and return the total log-likelihood.
fn expectation(model: &MixtureModel, training: &[CountArray], responsibilities: &mut [Vec<f64>]) -> f64 {
    let mut total = 0.0;
    for (counts, row) in training.iter().zip(responsibilities.iter_mut()) {
        let log_weights: Vec<f64> = model
            .weights
            .iter()
            .enumerate()
            .map(|(k, w)| w.ln() + model.log_likelihood(k, counts))
            .collect();
        total += log_sum_exp(&log_weights);
        *row = normalize_log_weights(&log_weights);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(family: ComponentFamily, components: usize) -> EstimatorConfig {
        EstimatorConfig {
            family,
            components,
            restarts: 3,
            max_iterations: 50,
            seed: Some(42),
            ..EstimatorConfig::default()
        }
    }

    /// Two task populations: action 0 always solves the first, action 1 the
    /// second.
    fn two_cluster_training() -> Vec<CountArray> {
        let mut training = Vec::new();
        for _ in 0..6 {
            training.push(CountArray::from_rows(&[vec![0, 4, 0], vec![4, 0, 0]]).unwrap());
            training.push(CountArray::from_rows(&[vec![4, 0, 0], vec![0, 0, 4]]).unwrap());
        }
        training
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let estimator = MixtureEstimator::new(config(ComponentFamily::Dcm, 2));
        assert!(matches!(
            estimator.estimate(&[]),
            Err(DomainError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let estimator = MixtureEstimator::new(config(ComponentFamily::Dcm, 2));
        let training = vec![CountArray::zeros(2, 3), CountArray::zeros(3, 3)];
        assert!(matches!(
            estimator.estimate(&training),
            Err(DomainError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_multinomial_fit_is_valid() {
        let estimator = MixtureEstimator::new(config(ComponentFamily::Multinomial, 2));
        let model = estimator.estimate(&two_cluster_training()).unwrap();
        model.validate().unwrap();
        assert_eq!(model.ncomponents(), 2);
        assert!(model.training_log_likelihood().is_some_and(f64::is_finite));
    }

    #[test]
    fn test_dcm_fit_separates_clusters() {
        let estimator = MixtureEstimator::new(config(ComponentFamily::Dcm, 2));
        let model = estimator.estimate(&two_cluster_training()).unwrap();
        model.validate().unwrap();

        // After seeing action 0 fail, the model should expect action 1 to
        // resolve the task.
        let mut history = CountArray::zeros(2, 3);
        history.increment(0, 0);
        let posterior = model.posterior(&history);
        let success: f64 = (0..model.ncomponents())
            .map(|k| posterior[k] * (1.0 - model.predictive(k, 1, history.row(1))[0]))
            .sum();
        assert!(success > 0.8, "success = {success}");
    }

    #[test]
    fn test_component_count_capped_by_examples() {
        let estimator = MixtureEstimator::new(config(ComponentFamily::Dcm, 16));
        let training = vec![CountArray::from_rows(&[vec![1, 1, 0]]).unwrap()];
        let model = estimator.estimate(&training).unwrap();
        assert_eq!(model.ncomponents(), 1);
        assert!((model.weights()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_history_posterior_is_prior() {
        let estimator = MixtureEstimator::new(config(ComponentFamily::Dcm, 2));
        let model = estimator.estimate(&two_cluster_training()).unwrap();
        assert_eq!(model.posterior(&CountArray::zeros(2, 3)), model.weights());
    }

    #[test]
    fn test_zero_count_actions_contribute_nothing() {
        let model = MixtureModel::from_parts(
            ComponentFamily::Dcm,
            2,
            3,
            vec![1.0],
            vec![vec![1.0, 2.0, 3.0, 0.5, 0.5, 0.5]],
        )
        .unwrap();
        let mut only_first = CountArray::zeros(2, 3);
        only_first.increment(0, 1);
        let expected = dcm_log_likelihood(&[1.0, 2.0, 3.0], &[0, 1, 0]);
        assert!((model.log_likelihood(0, &only_first) - expected).abs() < 1e-12);
        // P(first draw is outcome 1) = alpha_1 / sum(alpha)
        assert!((expected - (2.0_f64 / 6.0).ln()).abs() < 1e-9);
    }

    #[test]
    fn test_from_parts_rejects_bad_parameters() {
        let result = MixtureModel::from_parts(
            ComponentFamily::Multinomial,
            1,
            3,
            vec![1.0],
            vec![vec![0.5, 0.5, 0.5]],
        );
        assert!(matches!(result, Err(DomainError::InvalidModel(_))));

        let result =
            MixtureModel::from_parts(ComponentFamily::Dcm, 1, 3, vec![1.0], vec![vec![1.0, 0.0, 1.0]]);
        assert!(result.is_err());
    }
}
