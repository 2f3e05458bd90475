//! Budgetfolio - Solver Portfolio Decision Engine
//!
//! Budgetfolio decides which solver to run on a task, and with how much CPU
//! time, so that a fixed budget is spent where it most likely solves the
//! task. It learns a mixture model over solver outcomes from recorded runs,
//! updates its beliefs after every observed outcome, and plans the next
//! actions with a knapsack or discounted Bellman planner.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Actions, outcomes, counts, errors and ports
//! - **Service Layer** (`services`): Estimation, models, planners, strategies
//! - **Application Layer** (`application`): Training and solve sessions
//! - **Infrastructure Layer** (`infrastructure`): Process execution, stores,
//!   configuration and logging
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use budgetfolio::{ConfigLoader, PortfolioDriver, PortfolioTrainer, Task};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let portfolio = PortfolioTrainer::new(config.clone())
//!         .train(solvers, store.as_ref())
//!         .await?;
//!     let driver = PortfolioDriver::new(Arc::new(portfolio), harness, features, config.portfolio);
//!     let record = driver.solve(&Task::from_path("inst.cnf"), 600.0).await?;
//!     println!("{:?}", record.answer);
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{DriverError, PortfolioDriver, PortfolioTrainer, TrainerError, TrainingSet};
pub use domain::models::{
    Action, AttemptRecord, BudgetLadder, Config, CountArray, FeatureVector, History, Outcome,
    OutcomeKind, RecordedRun, RunResult, StrategyState, Task,
};
pub use domain::ports::{
    ExecutionHarness, FeatureProvider, Preprocessor, RunStore, SolverCommand, SolverRegistry,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ActionModel, Planner, Strategy, TrainedPortfolio, WorldModel};
