pub mod portfolio_driver;
pub mod portfolio_trainer;

pub use portfolio_driver::{DriverError, PortfolioDriver};
pub use portfolio_trainer::{PortfolioTrainer, TrainerError, TrainingSet};
