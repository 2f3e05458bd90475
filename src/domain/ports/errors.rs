use thiserror::Error;

/// Errors raised by execution harnesses.
///
/// A misbehaving solver is not an error: crashes, garbage output and
/// exceeded ceilings are reported as unsolved outcomes. These variants cover
/// failures of the harness itself.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Solver not registered: {0}")]
    UnknownSolver(String),

    #[error("Failed to spawn solver {solver}: {source}")]
    Spawn {
        solver: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for solver {solver}: {source}")]
    Wait {
        solver: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No recorded run for task {task_id}, solver {solver}, budget >= {budget}")]
    NoRecordedRun {
        task_id: String,
        solver: String,
        budget: f64,
    },

    #[error("Run store error: {0}")]
    Store(String),
}

/// Errors raised by feature providers.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("No features available for task {0}")]
    Unavailable(String),

    #[error("Feature extraction failed: {0}")]
    Extraction(String),
}

/// Errors raised by preprocessors.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Preprocessing failed: {0}")]
    Failed(String),

    #[error("Cannot extend answer to the original task: {0}")]
    Extension(String),
}
