//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the decision engine consumes:
//! - ExecutionHarness: run one solver action on one task
//! - SolverRegistry: command templates and output parsers per solver
//! - RunStore: read-only lookup of recorded runs
//! - FeatureProvider: task analyzers
//! - Preprocessor: instance simplifiers with answer extension
//!
//! These traits keep the engine independent of process management,
//! storage, and instance formats.

pub mod errors;
pub mod execution_harness;
pub mod feature_provider;
pub mod null_features;
pub mod preprocessor;
pub mod run_store;
pub mod solver_registry;

pub use errors::{FeatureError, HarnessError, PreprocessError};
pub use execution_harness::ExecutionHarness;
pub use feature_provider::FeatureProvider;
pub use null_features::NullFeatureProvider;
pub use preprocessor::{Preprocessed, Preprocessor};
pub use run_store::RunStore;
pub use solver_registry::{OutputFormat, SolverCommand, SolverRegistry};
