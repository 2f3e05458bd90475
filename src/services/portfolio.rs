//! A trained portfolio: everything a session needs, shareable across
//! sessions and persisted as one JSON blob.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::PlannerConfig;
use super::action_model::ActionModel;
use super::strategy::Strategy;
use super::world_model::WorldModel;

/// Everything a session needs to decide: the world, a fitted action model
/// and planner settings. Immutable once built and shared across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedPortfolio {
    world: WorldModel,
    model: ActionModel,
    planner: PlannerConfig,
}

impl TrainedPortfolio {
    /// Bundle a world, a model fitted against it, and planner settings.
    pub fn new(world: WorldModel, model: ActionModel, planner: PlannerConfig) -> DomainResult<Self> {
        let portfolio = Self {
            world,
            model,
            planner,
        };
        portfolio.validate()?;
        Ok(portfolio)
    }

    pub const fn world(&self) -> &WorldModel {
        &self.world
    }

    pub const fn model(&self) -> &ActionModel {
        &self.model
    }

    pub const fn planner_config(&self) -> &PlannerConfig {
        &self.planner
    }

    /// Check that the model's shape matches the world and its parameters
    /// are well formed.
    pub fn validate(&self) -> DomainResult<()> {
        self.world.validate()?;
        let shapes = match &self.model {
            ActionModel::Multinomial { prediction } => {
                prediction.validate()?;
                vec![(prediction.nactions(), prediction.noutcomes())]
            }
            ActionModel::Mixture { mixture } => {
                mixture.validate()?;
                vec![(mixture.nactions(), mixture.noutcomes())]
            }
            ActionModel::Random {
                nactions,
                noutcomes,
                ..
            } => vec![(*nactions, *noutcomes)],
            ActionModel::Classifier { classifier } => {
                classifier.validate()?;
                vec![(classifier.nactions(), classifier.noutcomes())]
            }
            ActionModel::Oracle { tables } => tables
                .values()
                .map(|table| {
                    table.validate()?;
                    Ok((table.nactions(), table.noutcomes()))
                })
                .collect::<DomainResult<Vec<_>>>()?,
        };
        for (nactions, noutcomes) in shapes {
            if nactions != self.world.nactions() || noutcomes != self.world.noutcomes() {
                return Err(DomainError::ShapeMismatch {
                    expected_actions: self.world.nactions(),
                    expected_outcomes: self.world.noutcomes(),
                    actual_actions: nactions,
                    actual_outcomes: noutcomes,
                });
            }
        }
        if !(0.0..1.0).contains(&self.planner.discount) {
            return Err(DomainError::InvalidModel(format!(
                "planner discount must be in [0, 1), got {}",
                self.planner.discount
            )));
        }
        Ok(())
    }

    /// Fresh modeling strategy for one session on `task_id`.
    pub fn start_session(self: &Arc<Self>, task_id: impl Into<String>) -> Strategy {
        Strategy::modeling(Arc::clone(self), task_id)
    }

    /// Pretty-printed JSON blob; [`Self::from_json`] reads it back.
    pub fn to_json(&self) -> DomainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a persisted portfolio.
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let portfolio: Self = serde_json::from_str(json)?;
        portfolio.validate()?;
        Ok(portfolio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BudgetLadder, CountArray, Outcome, RecordedRun};

    fn world() -> WorldModel {
        WorldModel::new(vec!["a".to_string()], BudgetLadder::uniform(10.0, 2).unwrap()).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let model = ActionModel::random(9, 2, 3);
        let portfolio = TrainedPortfolio::new(world(), model, PlannerConfig::default()).unwrap();
        let json = portfolio.to_json().unwrap();
        assert_eq!(TrainedPortfolio::from_json(&json).unwrap(), portfolio);
    }

    #[test]
    fn test_multinomial_model_validates_against_world() {
        let training = vec![CountArray::from_rows(&[vec![1, 2, 0], vec![0, 3, 1]]).unwrap()];
        let model = ActionModel::multinomial(&training, 0.01).unwrap();
        assert!(TrainedPortfolio::new(world(), model, PlannerConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_mismatched_model() {
        let model = ActionModel::random(1, 5, 3);
        let result = TrainedPortfolio::new(world(), model, PlannerConfig::default());
        assert!(matches!(result, Err(DomainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_rejects_truncated_prediction_table() {
        let training = vec![CountArray::from_rows(&[vec![1, 2, 0], vec![0, 3, 1]]).unwrap()];
        let model = ActionModel::multinomial(&training, 0.01).unwrap();
        let portfolio = TrainedPortfolio::new(world(), model, PlannerConfig::default()).unwrap();
        let mut blob: serde_json::Value = serde_json::from_str(&portfolio.to_json().unwrap()).unwrap();
        blob["model"]["prediction"]["probabilities"] = serde_json::json!([]);
        assert!(matches!(
            TrainedPortfolio::from_json(&blob.to_string()),
            Err(DomainError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_rejects_misshapen_oracle_table() {
        let runs = vec![RecordedRun {
            task_id: "t".to_string(),
            solver: "a".to_string(),
            budget: 20.0,
            cost: 5.0,
            outcome: Outcome::positive(None),
        }];
        let model = ActionModel::oracle(&world(), &runs).unwrap();
        let portfolio = TrainedPortfolio::new(world(), model, PlannerConfig::default()).unwrap();
        let mut blob: serde_json::Value = serde_json::from_str(&portfolio.to_json().unwrap()).unwrap();
        blob["model"]["tables"]["t"]["nactions"] = serde_json::json!(1);
        blob["model"]["tables"]["t"]["probabilities"] = serde_json::json!([0.0, 1.0, 0.0]);
        assert!(matches!(
            TrainedPortfolio::from_json(&blob.to_string()),
            Err(DomainError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_world() {
        let portfolio =
            TrainedPortfolio::new(world(), ActionModel::random(3, 2, 3), PlannerConfig::default())
                .unwrap();
        let json = portfolio.to_json().unwrap();

        let mut empty: serde_json::Value = serde_json::from_str(&json).unwrap();
        empty["world"]["solvers"] = serde_json::json!([]);
        assert!(TrainedPortfolio::from_json(&empty.to_string()).is_err());

        let mut zero_step: serde_json::Value = serde_json::from_str(&json).unwrap();
        zero_step["world"]["ladder"]["step"] = serde_json::json!(0.0);
        assert!(matches!(
            TrainedPortfolio::from_json(&zero_step.to_string()),
            Err(DomainError::InvalidBudgetLadder(_))
        ));
    }

    #[test]
    fn test_rejects_garbage_json() {
        assert!(matches!(
            TrainedPortfolio::from_json("{\"world\": 3}"),
            Err(DomainError::SerializationError(_))
        ));
    }
}
