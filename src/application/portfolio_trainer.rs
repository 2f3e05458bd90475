//! Builds a [`TrainedPortfolio`] from recorded solver runs.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::errors::DomainError;
use crate::domain::models::{
    ActionModelKind, BudgetLadder, Config, CountArray, FeatureVector, RecordedRun, Task,
};
use crate::domain::ports::{FeatureError, FeatureProvider, HarnessError, RunStore};
use crate::services::{
    ActionModel, FeatureClassifier, MixtureEstimator, TrainedPortfolio, WorldModel,
};

/// Errors raised while training a portfolio.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Failed to read training runs: {0}")]
    Store(#[from] HarnessError),

    #[error("Failed to compute training features: {0}")]
    Features(#[from] FeatureError),
}

/// Training data for one world: one count array per task, plus the raw runs
/// the oracle needs.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    /// Censored outcome counts, one array per task
    pub counts: Vec<CountArray>,
    /// Every usable run, across all tasks
    pub runs: Vec<RecordedRun>,
    /// Task features aligned with `counts`; empty without a feature provider
    pub features: Vec<FeatureVector>,
}

/// Fits the configured action model to recorded runs.
pub struct PortfolioTrainer {
    config: Config,
    features: Option<Arc<dyn FeatureProvider>>,
}

impl PortfolioTrainer {
    /// Trainer using the budget, estimator and planner sections of `config`.
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            features: None,
        }
    }

    /// Collect features for every training task from `provider`. The
    /// classifier model needs them.
    #[must_use]
    pub fn with_features(mut self, provider: Arc<dyn FeatureProvider>) -> Self {
        self.features = Some(provider);
        self
    }

    /// World over `solvers` with the configured budget ladder.
    pub fn world(&self, solvers: Vec<String>) -> Result<WorldModel, DomainError> {
        let budget = &self.config.budget;
        let ladder = BudgetLadder::uniform(budget.ladder_step, budget.ladder_len)?;
        WorldModel::new(solvers, ladder)
    }

    /// Read every task's runs from `store` and expand them into counts.
    ///
    /// Runs of solvers outside the world are ignored; tasks with no usable
    /// runs are dropped.
    pub async fn collect(
        &self,
        world: &WorldModel,
        store: &dyn RunStore,
    ) -> Result<TrainingSet, TrainerError> {
        let mut training = TrainingSet::default();
        for task_id in store.task_ids().await? {
            let task_runs: Vec<RecordedRun> = store
                .runs_for_task(&task_id)
                .await?
                .into_iter()
                .filter(|run| world.solver_index(&run.solver).is_some())
                .collect();
            let task_counts = world.counts_from_runs(&task_runs)?;
            if task_counts.is_zero() {
                debug!(task_id = %task_id, "Skipping task without usable runs");
                continue;
            }
            if let Some(provider) = &self.features {
                // Stored runs carry no path; providers key on the id.
                let task = Task::new(task_id.clone(), &task_id);
                training.features.push(provider.compute_features(&task).await?);
            }
            training.counts.push(task_counts);
            training.runs.extend(task_runs);
        }
        Ok(training)
    }

    /// Train a portfolio over `solvers` from the runs in `store`.
    #[instrument(skip(self, store), fields(solvers = solvers.len()))]
    pub async fn train(
        &self,
        solvers: Vec<String>,
        store: &dyn RunStore,
    ) -> Result<TrainedPortfolio, TrainerError> {
        let world = self.world(solvers)?;
        let training = self.collect(&world, store).await?;
        Ok(self.train_from(world, &training)?)
    }

    /// Fit the configured action model to an already collected training set.
    pub fn train_from(
        &self,
        world: WorldModel,
        training: &TrainingSet,
    ) -> Result<TrainedPortfolio, DomainError> {
        let estimator = &self.config.estimator;
        let model = match estimator.model {
            ActionModelKind::Mixture => {
                let mixture = MixtureEstimator::new(estimator.clone()).estimate(&training.counts)?;
                ActionModel::mixture(mixture)
            }
            ActionModelKind::Multinomial => {
                ActionModel::multinomial(&training.counts, estimator.concentration)?
            }
            ActionModelKind::Classifier => ActionModel::classifier(FeatureClassifier::fit(
                &training.counts,
                &training.features,
                estimator,
            )?),
            ActionModelKind::Oracle => ActionModel::oracle(&world, &training.runs)?,
            ActionModelKind::Random => {
                let seed = estimator.seed.unwrap_or_else(|| rand::rng().random());
                ActionModel::random(seed, world.nactions(), world.noutcomes())
            }
        };

        info!(
            model = model.variant_name(),
            tasks = training.counts.len(),
            actions = world.nactions(),
            "Trained portfolio"
        );
        TrainedPortfolio::new(world, model, self.config.planner.clone())
    }
}
