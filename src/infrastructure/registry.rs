//! YAML-backed solver registry.
//!
//! ```yaml
//! solvers:
//!   - name: minisat
//!     program: /opt/solvers/minisat
//!     args: ["-rnd-seed={seed}", "-cpu-lim={budget}", "{task}"]
//!     format: sat_competition
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::ports::{SolverCommand, SolverRegistry};

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    solvers: Vec<SolverCommand>,
}

/// Fixed set of solver commands, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct StaticSolverRegistry {
    solvers: BTreeMap<String, SolverCommand>,
}

impl StaticSolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a solver.
    pub fn insert(&mut self, command: SolverCommand) {
        self.solvers.insert(command.name.clone(), command);
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, command: SolverCommand) -> Self {
        self.insert(command);
        self
    }

    /// Parse a `solvers:` list. Names must be unique and every entry needs a
    /// program.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: RegistryFile =
            serde_yaml::from_str(yaml).context("Failed to parse solver registry YAML")?;
        let mut registry = Self::new();
        for command in file.solvers {
            if command.name.is_empty() || command.program.is_empty() {
                anyhow::bail!("Solver entries need a name and a program");
            }
            if registry.solvers.contains_key(&command.name) {
                anyhow::bail!("Duplicate solver in registry: {}", command.name);
            }
            registry.insert(command);
        }
        Ok(registry)
    }

    /// Read a registry YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read solver registry {}", path.display()))?;
        Self::from_yaml_str(&yaml)
    }
}

impl SolverRegistry for StaticSolverRegistry {
    fn resolve(&self, solver: &str) -> Option<SolverCommand> {
        self.solvers.get(solver).cloned()
    }

    fn solver_names(&self) -> Vec<String> {
        self.solvers.keys().cloned().collect()
    }
}
