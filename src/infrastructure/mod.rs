//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Execution harnesses (live processes, recycled runs)
//! - Solver registry, run stores, feature providers
//! - Portfolio persistence

pub mod config;
pub mod execution;
pub mod features;
pub mod logging;
pub mod persistence;
pub mod registry;
pub mod run_store;
