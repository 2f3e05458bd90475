//! Per-session decision state machine.
//!
//! A strategy alternates between choosing an action (`select`) and
//! absorbing its outcome (`observe`). It never runs anything itself.
//!
//! ```text
//! Ready --select(Some)--> AwaitingOutcome --observe--> Ready
//! Ready --select(None)--> Exhausted
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Action, FeatureVector, History, Outcome, StrategyState};
use super::action_model::PredictionTable;
use super::planner::{PlannedAction, Planner};
use super::portfolio::TrainedPortfolio;

/// What drives action choice.
#[derive(Debug, Clone)]
enum Policy {
    /// Plan against the action model's predictions.
    Modeling(Box<ModelingPolicy>),
    /// Run a fixed list of actions in order.
    Sequence,
    /// Run the same action over and over.
    Fixed(Action),
}

#[derive(Debug, Clone)]
struct ModelingPolicy {
    portfolio: Arc<TrainedPortfolio>,
    planner: Planner,
    replan: bool,
    task_id: String,
    features: Option<FeatureVector>,
    history: History,
    planned: bool,
    prediction: Option<PredictionTable>,
    posterior: Option<Vec<f64>>,
}

impl ModelingPolicy {
    /// Recompute the prediction and posterior from the full history.
    fn refresh(&mut self) -> DomainResult<()> {
        let model = self.portfolio.model();
        self.posterior = model.posterior(self.history.counts());
        self.prediction = Some(model.predict(
            &self.task_id,
            self.features.as_ref(),
            self.history.counts(),
        )?);
        Ok(())
    }

    fn build_plan(&mut self, remaining: f64) -> DomainResult<Vec<PlannedAction>> {
        if self.prediction.is_none() {
            self.refresh()?;
        }
        let rates = self
            .prediction
            .as_ref()
            .map(PredictionTable::success_rates)
            .unwrap_or_default();
        self.planned = true;
        self.planner.plan(self.portfolio.world(), &rates, remaining)
    }

    fn wants_new_plan(&self) -> bool {
        !self.planned || (self.replan && self.planner.supports_replanning())
    }
}

/// Session-scoped strategy. Not reentrant; one per session.
#[derive(Debug, Clone)]
pub struct Strategy {
    policy: Policy,
    state: StrategyState,
    plan: VecDeque<QueuedAction>,
    pending: Option<(Action, Option<usize>)>,
}

/// A queued plan step. Sequence steps carry no world index.
#[derive(Debug, Clone)]
struct QueuedAction {
    action: Action,
    index: Option<usize>,
    runs_to_remaining: bool,
}

impl QueuedAction {
    const fn fixed(action: Action) -> Self {
        Self {
            action,
            index: None,
            runs_to_remaining: false,
        }
    }

    /// The action to run with `remaining` seconds left, if the step fits.
    fn fit(&self, remaining: f64) -> Option<(Action, Option<usize>)> {
        if self.action.cost() > remaining {
            return None;
        }
        let action = if self.runs_to_remaining {
            self.action.with_cost(remaining)
        } else {
            self.action.clone()
        };
        Some((action, self.index))
    }
}

impl From<PlannedAction> for QueuedAction {
    fn from(step: PlannedAction) -> Self {
        Self {
            action: step.action,
            index: Some(step.index),
            runs_to_remaining: step.runs_to_remaining,
        }
    }
}

impl Strategy {
    /// Strategy that plans against `portfolio`'s action model.
    pub fn modeling(portfolio: Arc<TrainedPortfolio>, task_id: impl Into<String>) -> Self {
        let config = portfolio.planner_config().clone();
        let history = History::new(portfolio.world().nactions());
        Self::new(Policy::Modeling(Box::new(ModelingPolicy {
            planner: Planner::from_config(&config),
            replan: config.replan,
            portfolio,
            task_id: task_id.into(),
            features: None,
            history,
            planned: false,
            prediction: None,
            posterior: None,
        })))
    }

    /// Let a modeling strategy condition its predictions on `features`.
    /// Other strategies ignore them.
    #[must_use]
    pub fn with_features(mut self, features: Option<&FeatureVector>) -> Self {
        if let Policy::Modeling(policy) = &mut self.policy {
            policy.features = features.cloned();
            policy.prediction = None;
        }
        self
    }

    /// Strategy that runs `actions` in order, stopping at the first one that
    /// does not fit the remaining budget.
    pub fn sequence(actions: Vec<Action>) -> Self {
        let mut strategy = Self::new(Policy::Sequence);
        strategy.plan = actions.into_iter().map(QueuedAction::fixed).collect();
        strategy
    }

    /// Strategy that repeats `action` while it fits.
    pub fn fixed(action: Action) -> Self {
        Self::new(Policy::Fixed(action))
    }

    fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: StrategyState::Ready,
            plan: VecDeque::new(),
            pending: None,
        }
    }

    pub const fn state(&self) -> StrategyState {
        self.state
    }

    /// Session history, for modeling strategies.
    pub fn history(&self) -> Option<&History> {
        match &self.policy {
            Policy::Modeling(policy) => Some(&policy.history),
            _ => None,
        }
    }

    /// Posterior component weights after the last observation, for
    /// mixture-backed strategies.
    pub fn posterior(&self) -> Option<&[f64]> {
        match &self.policy {
            Policy::Modeling(policy) => policy.posterior.as_deref(),
            _ => None,
        }
    }

    /// Actions still queued in the current plan.
    pub fn planned_actions(&self) -> Vec<Action> {
        self.plan.iter().map(|q| q.action.clone()).collect()
    }

    /// Choose the next action to run within `remaining` seconds.
    ///
    /// Returns `None` (and moves to `Exhausted`) when nothing fits. Never
    /// returns an action whose ceiling exceeds `remaining`.
    pub fn select(&mut self, remaining: f64) -> DomainResult<Option<Action>> {
        if self.state != StrategyState::Ready {
            return Err(DomainError::InvalidStateTransition {
                from: self.state,
                operation: "select",
            });
        }
        if remaining.is_nan() || remaining < 0.0 {
            return Err(DomainError::NegativeBudget(remaining));
        }

        let next = match &mut self.policy {
            Policy::Modeling(policy) => {
                if policy.wants_new_plan() {
                    let plan = policy.build_plan(remaining)?;
                    self.plan = plan.into_iter().map(QueuedAction::from).collect();
                }
                next_fitting(&mut self.plan, remaining)
            }
            Policy::Sequence => {
                let next = self.plan.front().and_then(|step| step.fit(remaining));
                if next.is_some() {
                    self.plan.pop_front();
                }
                next
            }
            Policy::Fixed(action) => (action.cost() <= remaining).then(|| (action.clone(), None)),
        };

        match next {
            Some((action, index)) => {
                debug!(action = %action, remaining, "Strategy selected action");
                self.pending = Some((action.clone(), index));
                self.state = StrategyState::AwaitingOutcome;
                Ok(Some(action))
            }
            None => {
                debug!(remaining, "Strategy exhausted");
                self.plan.clear();
                self.state = StrategyState::Exhausted;
                Ok(None)
            }
        }
    }

    /// Record the outcome of the action returned by the last `select`.
    pub fn observe(&mut self, action: &Action, outcome: &Outcome) -> DomainResult<()> {
        if self.state != StrategyState::AwaitingOutcome {
            return Err(DomainError::InvalidStateTransition {
                from: self.state,
                operation: "observe",
            });
        }
        let Some((pending, index)) = self.pending.take() else {
            return Err(DomainError::InvalidStateTransition {
                from: self.state,
                operation: "observe",
            });
        };
        if pending != *action {
            let observed = action.to_string();
            let expected = pending.to_string();
            self.pending = Some((pending, index));
            return Err(DomainError::UnexpectedObservation {
                observed,
                pending: expected,
            });
        }

        if let Policy::Modeling(policy) = &mut self.policy {
            if let Some(index) = index {
                policy.history.record(index, outcome.kind);
            }
            policy.refresh()?;
        }
        self.state = StrategyState::Ready;
        Ok(())
    }
}

/// Pop planned actions until one fits; drop the ones that do not.
fn next_fitting(plan: &mut VecDeque<QueuedAction>, remaining: f64) -> Option<(Action, Option<usize>)> {
    while let Some(step) = plan.pop_front() {
        if let Some(next) = step.fit(remaining) {
            return Some(next);
        }
    }
    None
}
