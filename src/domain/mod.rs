//! Domain layer for the portfolio decision engine
//!
//! This module contains the core vocabulary (actions, outcomes, tasks,
//! counts, attempt records), domain errors, and the port traits that the
//! infrastructure layer implements.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
