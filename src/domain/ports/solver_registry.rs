//! Solver registry port: maps solver names to command templates.

use serde::{Deserialize, Serialize};

/// Output conventions of a solver family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// SAT competition: `s SATISFIABLE` / `s UNSATISFIABLE`, `v` literal lines
    SatCompetition,
    /// Pseudo-Boolean competition: adds `s OPTIMUM FOUND`; a positive answer
    /// without a certificate is not trusted
    PbCompetition,
}

/// How to invoke one solver.
///
/// Arguments may contain the placeholders `{task}` (instance path), `{seed}`
/// (random seed) and `{budget}` (CPU ceiling in whole seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverCommand {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub format: OutputFormat,
}

impl SolverCommand {
    /// Substitute placeholders into the argument list.
    pub fn render_args(&self, task_path: &str, seed: u32, budget_secs: u64) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{task}", task_path)
                    .replace("{seed}", &seed.to_string())
                    .replace("{budget}", &budget_secs.to_string())
            })
            .collect()
    }
}

/// Port trait for looking up solver commands.
pub trait SolverRegistry: Send + Sync {
    fn resolve(&self, solver: &str) -> Option<SolverCommand>;

    /// Names of every registered solver, sorted.
    fn solver_names(&self) -> Vec<String>;
}
