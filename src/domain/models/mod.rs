pub mod action;
pub mod attempt;
pub mod config;
pub mod counts;
pub mod outcome;
pub mod strategy_state;
pub mod task;

pub use action::{Action, BudgetLadder};
pub use attempt::{
    AttemptEntry, AttemptRecord, PreprocessingSummary, RecordedRun, RunResult, RunTermination,
};
pub use config::{
    ActionModelKind, BudgetConfig, ComponentFamily, Config, EstimatorConfig, ExecutionConfig,
    ExecutionMode, LoggingConfig, PlannerConfig, PlannerKind, PortfolioConfig,
};
pub use counts::{CountArray, History};
pub use outcome::{Certificate, Outcome, OutcomeKind};
pub use strategy_state::StrategyState;
pub use task::{FeatureVector, Task};
