use serde::{Deserialize, Serialize};

/// Main configuration structure for budgetfolio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Budget ladder and host calibration
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Portfolio driver limits
    #[serde(default)]
    pub portfolio: PortfolioConfig,

    /// Planner selection and parameters
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Mixture estimator parameters
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Solver execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Budget ladder and machine calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetConfig {
    /// Spacing of the budget ladder in CPU seconds
    #[serde(default = "default_ladder_step")]
    pub ladder_step: f64,

    /// Number of rungs on the ladder
    #[serde(default = "default_ladder_len")]
    pub ladder_len: usize,

    /// Ratio of this host's speed to the host the training data came from.
    /// CPU ceilings handed to the OS are `cost * machine_speed`.
    #[serde(default = "default_machine_speed")]
    pub machine_speed: f64,
}

const fn default_ladder_step() -> f64 {
    100.0
}

const fn default_ladder_len() -> usize {
    10
}

const fn default_machine_speed() -> f64 {
    1.0
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            ladder_step: default_ladder_step(),
            ladder_len: default_ladder_len(),
            machine_speed: default_machine_speed(),
        }
    }
}

/// Portfolio driver limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PortfolioConfig {
    /// Maximum solver invocations per session
    #[serde(default = "default_max_invocations")]
    pub max_invocations: u32,

    /// Charge feature-extraction CPU time against the budget
    #[serde(default = "default_true")]
    pub charge_feature_cost: bool,

    /// Charge the engine's own CPU time against the budget
    #[serde(default)]
    pub charge_overhead: bool,
}

const fn default_max_invocations() -> u32 {
    50
}

const fn default_true() -> bool {
    true
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            max_invocations: default_max_invocations(),
            charge_feature_cost: true,
            charge_overhead: false,
        }
    }
}

/// Which planner builds plans for the modeling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    /// Knapsack dynamic program, optionally re-planned after every outcome
    Knapsack,
    /// Discounted Bellman plan computed once per session
    Bellman,
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    #[serde(default = "default_planner_kind")]
    pub kind: PlannerKind,

    /// Re-plan after every observed outcome (knapsack only)
    #[serde(default = "default_true")]
    pub replan: bool,

    /// Per-second discount epsilon: future utility is scaled by `(1 - discount)^cost`
    #[serde(default = "default_discount")]
    pub discount: f64,

    /// Maximum number of actions in a Bellman plan
    #[serde(default = "default_horizon")]
    pub horizon: usize,
}

const fn default_planner_kind() -> PlannerKind {
    PlannerKind::Knapsack
}

const fn default_discount() -> f64 {
    5e-4
}

const fn default_horizon() -> usize {
    4
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            kind: default_planner_kind(),
            replan: true,
            discount: default_discount(),
            horizon: default_horizon(),
        }
    }
}

/// Which action model a trainer builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionModelKind {
    /// Mixture fitted by EM, with per-session posterior updates
    Mixture,
    /// Pooled frequencies without history
    Multinomial,
    /// Per-action logistic regression on task features
    Classifier,
    /// Per-task truth from recorded runs
    Oracle,
    /// Uninformed random predictions
    Random,
}

/// Family of per-action component distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentFamily {
    /// Categorical outcome probabilities
    Multinomial,
    /// Dirichlet-compound-multinomial concentration vectors
    Dcm,
}

/// Mixture estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EstimatorConfig {
    #[serde(default = "default_model")]
    pub model: ActionModelKind,

    #[serde(default = "default_family")]
    pub family: ComponentFamily,

    /// Number of mixture components (K)
    #[serde(default = "default_components")]
    pub components: usize,

    /// Random restarts; the best training log-likelihood wins
    #[serde(default = "default_restarts")]
    pub restarts: usize,

    /// EM iteration budget per restart
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Relative log-likelihood change treated as converged
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Symmetric pseudo-count added to categorical estimates
    #[serde(default = "default_concentration")]
    pub concentration: f64,

    /// Gamma prior shape on DCM concentrations (must be >= 1)
    #[serde(default = "default_dcm_prior_shape")]
    pub dcm_prior_shape: f64,

    /// Gamma prior scale on DCM concentrations
    #[serde(default = "default_dcm_prior_scale")]
    pub dcm_prior_scale: f64,

    /// Gradient steps when fitting the feature classifier
    #[serde(default = "default_logistic_iterations")]
    pub logistic_iterations: usize,

    /// Classifier learning rate
    #[serde(default = "default_logistic_step")]
    pub logistic_step: f64,

    /// L2 penalty on classifier weights (not the bias)
    #[serde(default = "default_logistic_l2")]
    pub logistic_l2: f64,

    /// Seed for restarts; drawn from the OS when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_model() -> ActionModelKind {
    ActionModelKind::Mixture
}

const fn default_family() -> ComponentFamily {
    ComponentFamily::Dcm
}

const fn default_components() -> usize {
    16
}

const fn default_restarts() -> usize {
    4
}

const fn default_max_iterations() -> usize {
    64
}

const fn default_tolerance() -> f64 {
    1e-6
}

const fn default_concentration() -> f64 {
    1e-2
}

const fn default_dcm_prior_shape() -> f64 {
    1.1
}

const fn default_dcm_prior_scale() -> f64 {
    2.0
}

const fn default_logistic_iterations() -> usize {
    500
}

const fn default_logistic_step() -> f64 {
    0.5
}

const fn default_logistic_l2() -> f64 {
    1e-3
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            family: default_family(),
            components: default_components(),
            restarts: default_restarts(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            concentration: default_concentration(),
            dcm_prior_shape: default_dcm_prior_shape(),
            dcm_prior_scale: default_dcm_prior_scale(),
            logistic_iterations: default_logistic_iterations(),
            logistic_step: default_logistic_step(),
            logistic_l2: default_logistic_l2(),
            seed: None,
        }
    }
}

/// Live processes or replayed runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Live,
    Recycled,
}

/// Solver execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionConfig {
    #[serde(default = "default_execution_mode")]
    pub mode: ExecutionMode,

    /// How often a running solver's CPU usage is sampled
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Wall-clock backstop as a multiple of the CPU ceiling, for solvers
    /// that block without consuming CPU
    #[serde(default = "default_wall_clock_slack")]
    pub wall_clock_slack: f64,

    /// How long to wait for a killed process group to be reaped
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
}

const fn default_execution_mode() -> ExecutionMode {
    ExecutionMode::Live
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_wall_clock_slack() -> f64 {
    2.0
}

const fn default_kill_grace_ms() -> u64 {
    2000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: default_execution_mode(),
            poll_interval_ms: default_poll_interval_ms(),
            wall_clock_slack: default_wall_clock_slack(),
            kill_grace_ms: default_kill_grace_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
