pub mod action_model;
pub mod feature_classifier;
pub mod mixture_estimator;
pub mod planner;
pub mod portfolio;
pub mod statistics;
pub mod strategy;
pub mod world_model;

pub use action_model::{ActionModel, PredictionTable};
pub use feature_classifier::FeatureClassifier;
pub use mixture_estimator::{MixtureEstimator, MixtureModel};
pub use planner::{BellmanPlanner, KnapsackPlanner, KnapsackSolution, PlannedAction, Planner};
pub use portfolio::TrainedPortfolio;
pub use strategy::Strategy;
pub use world_model::WorldModel;
