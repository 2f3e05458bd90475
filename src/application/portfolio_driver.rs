//! Portfolio driver: runs one solving session end to end.
//!
//! Charges feature extraction and (optionally) preprocessing against the
//! budget, then loops select -> run -> observe until a run solves the task,
//! the strategy runs out of actions, the budget is gone, or the invocation
//! ceiling is reached.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{
    AttemptEntry, AttemptRecord, Outcome, OutcomeKind, PortfolioConfig, PreprocessingSummary, Task,
};
use crate::domain::ports::{
    ExecutionHarness, FeatureError, FeatureProvider, HarnessError, PreprocessError, Preprocessor,
};
use crate::infrastructure::execution::cpu::self_cpu_seconds;
use crate::services::{Strategy, TrainedPortfolio};

/// Errors that abort a session.
///
/// Solver failures are not errors; they show up as unsolved entries in the
/// attempt record.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Harness failed running {action} on task {task_id}: {source}")]
    Harness {
        task_id: String,
        action: String,
        #[source]
        source: HarnessError,
    },

    #[error("Feature extraction failed for task {task_id}: {source}")]
    Features {
        task_id: String,
        #[source]
        source: FeatureError,
    },

    #[error("Preprocessing failed for task {task_id}: {source}")]
    Preprocess {
        task_id: String,
        #[source]
        source: PreprocessError,
    },
}

/// Budget bookkeeping for one session.
struct Ledger {
    budget: f64,
    spent: f64,
    charge_overhead: bool,
    cpu_at_start: Option<f64>,
}

impl Ledger {
    fn new(budget: f64, charge_overhead: bool) -> Self {
        Self {
            budget,
            spent: 0.0,
            charge_overhead,
            cpu_at_start: if charge_overhead { self_cpu_seconds() } else { None },
        }
    }

    fn charge(&mut self, cost: f64) {
        if cost.is_finite() && cost > 0.0 {
            self.spent += cost;
        }
    }

    /// Engine CPU time since the session started, when overhead is charged.
    fn overhead(&self) -> f64 {
        if !self.charge_overhead {
            return 0.0;
        }
        match (self.cpu_at_start, self_cpu_seconds()) {
            (Some(start), Some(now)) => (now - start).max(0.0),
            _ => 0.0,
        }
    }

    fn elapsed(&self) -> f64 {
        self.spent + self.overhead()
    }

    fn remaining(&self) -> f64 {
        (self.budget - self.elapsed()).max(0.0)
    }
}

/// Result of the select/run/observe loop on one task.
struct LoopOutcome {
    entries: Vec<AttemptEntry>,
    answer: Option<Outcome>,
}

/// Drives sessions against a trained portfolio.
pub struct PortfolioDriver {
    portfolio: Arc<TrainedPortfolio>,
    harness: Arc<dyn ExecutionHarness>,
    features: Arc<dyn FeatureProvider>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
    config: PortfolioConfig,
}

impl PortfolioDriver {
    /// Driver without a preprocessor. Features come from `features` and
    /// are computed at most once per task.
    pub fn new(
        portfolio: Arc<TrainedPortfolio>,
        harness: Arc<dyn ExecutionHarness>,
        features: Arc<dyn FeatureProvider>,
        config: PortfolioConfig,
    ) -> Self {
        Self {
            portfolio,
            harness,
            features,
            preprocessor: None,
            config,
        }
    }

    /// Run a preprocessor before the portfolio.
    #[must_use]
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub const fn portfolio(&self) -> &Arc<TrainedPortfolio> {
        &self.portfolio
    }

    /// Solve `task` within `budget` CPU seconds using the portfolio's
    /// modeling strategy.
    pub async fn solve(&self, task: &Task, budget: f64) -> Result<AttemptRecord, DriverError> {
        self.run_session(task, budget, |loop_task: &Task| {
            self.portfolio
                .start_session(loop_task.id())
                .with_features(loop_task.features())
        })
        .await
    }

    /// Solve `task` with an explicit strategy, e.g. a fixed sequence.
    pub async fn solve_with(
        &self,
        task: &Task,
        budget: f64,
        strategy: Strategy,
    ) -> Result<AttemptRecord, DriverError> {
        self.run_session(task, budget, move |_: &Task| strategy).await
    }

    #[instrument(skip(self, task, make_strategy), fields(task_id = %task.id()))]
    async fn run_session<F>(
        &self,
        task: &Task,
        budget: f64,
        make_strategy: F,
    ) -> Result<AttemptRecord, DriverError>
    where
        F: FnOnce(&Task) -> Strategy,
    {
        if budget.is_nan() || budget < 0.0 {
            return Err(DomainError::NegativeBudget(budget).into());
        }

        let started_at = Utc::now();
        let mut ledger = Ledger::new(budget, self.config.charge_overhead);
        info!("Starting portfolio session");

        let mut preprocessing = None;
        let mut simplified = None;

        if let Some(preprocessor) = &self.preprocessor {
            let result = preprocessor
                .preprocess(task, ledger.remaining())
                .await
                .map_err(|source| DriverError::Preprocess {
                    task_id: task.id().to_string(),
                    source,
                })?;
            ledger.charge(result.cost);

            let solved_directly = result.answer.as_ref().is_some_and(|a| a.utility() > 0.0);
            preprocessing = Some(PreprocessingSummary {
                preprocessor: preprocessor.name().to_string(),
                cost: result.cost,
                solved_directly,
                output_task: result.output.as_ref().map(|t| t.id().to_string()),
            });

            if solved_directly {
                info!(cost = result.cost, "Preprocessor solved the task directly");
                return Ok(build_record(
                    task,
                    budget,
                    &ledger,
                    Vec::new(),
                    result.answer,
                    preprocessing,
                    started_at,
                ));
            }
            simplified = result.output;
        }

        // Features are cached on the task the loop runs against.
        let loop_task = simplified.as_ref().unwrap_or(task);
        self.charge_features(loop_task, &mut ledger).await?;

        let strategy = make_strategy(loop_task);
        let LoopOutcome { entries, answer } =
            self.solve_loop(loop_task, strategy, &mut ledger).await?;

        let answer = match (answer, &self.preprocessor, preprocessing.as_ref()) {
            (Some(answer), Some(preprocessor), Some(summary))
                if summary.output_task.is_some() && answer.kind == OutcomeKind::Positive =>
            {
                let extended = preprocessor.extend(loop_task, answer).await.map_err(|source| {
                    DriverError::Preprocess {
                        task_id: task.id().to_string(),
                        source,
                    }
                })?;
                Some(extended)
            }
            (answer, _, _) => answer,
        };

        Ok(build_record(
            task,
            budget,
            &ledger,
            entries,
            answer,
            preprocessing,
            started_at,
        ))
    }

    /// Compute features for `task`, charging their cost the first time.
    async fn charge_features(&self, task: &Task, ledger: &mut Ledger) -> Result<(), DriverError> {
        let (features, computed) = task
            .features_or_init(|| self.features.compute_features(task))
            .await
            .map_err(|source| DriverError::Features {
                task_id: task.id().to_string(),
                source,
            })?;
        if computed && self.config.charge_feature_cost {
            debug!(cost = features.cost(), features = features.len(), "Charging feature cost");
            ledger.charge(features.cost());
        }
        Ok(())
    }

    async fn solve_loop(
        &self,
        task: &Task,
        mut strategy: Strategy,
        ledger: &mut Ledger,
    ) -> Result<LoopOutcome, DriverError> {
        let mut entries = Vec::new();
        let max_invocations = self.config.max_invocations as usize;

        while entries.len() < max_invocations {
            let remaining = ledger.remaining();
            if remaining <= 0.0 {
                debug!("Budget exhausted");
                break;
            }
            let Some(action) = strategy.select(remaining)? else {
                debug!(remaining, "No action fits the remaining budget");
                break;
            };

            let run = self
                .harness
                .run(&action, task)
                .await
                .map_err(|source| DriverError::Harness {
                    task_id: task.id().to_string(),
                    action: action.to_string(),
                    source,
                })?;
            ledger.charge(run.cost);
            strategy.observe(&action, &run.outcome)?;

            debug!(
                action = %action,
                cost = run.cost,
                outcome = %run.outcome.kind,
                remaining = ledger.remaining(),
                "Run finished"
            );

            let solved = run.outcome.utility() > 0.0;
            let outcome = run.outcome.clone();
            entries.push(AttemptEntry { action, result: run });
            if solved {
                return Ok(LoopOutcome {
                    entries,
                    answer: Some(outcome),
                });
            }
        }

        if entries.len() >= max_invocations {
            warn!(max_invocations, "Invocation ceiling reached");
        }
        Ok(LoopOutcome {
            entries,
            answer: None,
        })
    }
}

fn build_record(
    task: &Task,
    budget: f64,
    ledger: &Ledger,
    entries: Vec<AttemptEntry>,
    answer: Option<Outcome>,
    preprocessing: Option<PreprocessingSummary>,
    started_at: chrono::DateTime<Utc>,
) -> AttemptRecord {
    let record = AttemptRecord {
        id: Uuid::new_v4(),
        task_id: task.id().to_string(),
        budget,
        cost: ledger.elapsed(),
        entries,
        answer,
        preprocessing,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        solved = record.is_solved(),
        cost = record.cost,
        invocations = record.invocations(),
        "Portfolio session finished"
    );
    record
}
