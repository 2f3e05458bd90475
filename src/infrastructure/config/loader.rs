use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid ladder_step: {0}. Must be positive and finite")]
    InvalidLadderStep(f64),

    #[error("Invalid ladder_len: {0}. Must be at least 1")]
    InvalidLadderLen(usize),

    #[error("Invalid machine_speed: {0}. Must be positive and finite")]
    InvalidMachineSpeed(f64),

    #[error("Invalid max_invocations: {0}. Must be at least 1")]
    InvalidMaxInvocations(u32),

    #[error("Invalid discount: {0}. Must be in [0, 1)")]
    InvalidDiscount(f64),

    #[error("Invalid horizon: {0}. Must be at least 1")]
    InvalidHorizon(usize),

    #[error("Invalid components: {0}. Must be at least 1")]
    InvalidComponents(usize),

    #[error("Invalid restarts: {0}. Must be at least 1")]
    InvalidRestarts(usize),

    #[error("Invalid dcm_prior_shape: {0}. Must be at least 1")]
    InvalidPriorShape(f64),

    #[error("Invalid poll_interval_ms: {0}. Must be at least 1")]
    InvalidPollInterval(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .budgetfolio/config.yaml (project config)
    /// 3. .budgetfolio/local.yaml (local overrides, optional)
    /// 4. Environment variables (BUDGETFOLIO_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The figment behind [`Self::load`], exposed for layering extra providers.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".budgetfolio/config.yaml"))
            .merge(Yaml::file(".budgetfolio/local.yaml"))
            .merge(Env::prefixed("BUDGETFOLIO_").split("__"))
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let budget = &config.budget;
        if !budget.ladder_step.is_finite() || budget.ladder_step <= 0.0 {
            return Err(ConfigError::InvalidLadderStep(budget.ladder_step));
        }
        if budget.ladder_len == 0 {
            return Err(ConfigError::InvalidLadderLen(budget.ladder_len));
        }
        if !budget.machine_speed.is_finite() || budget.machine_speed <= 0.0 {
            return Err(ConfigError::InvalidMachineSpeed(budget.machine_speed));
        }

        if config.portfolio.max_invocations == 0 {
            return Err(ConfigError::InvalidMaxInvocations(
                config.portfolio.max_invocations,
            ));
        }

        let planner = &config.planner;
        if !(0.0..1.0).contains(&planner.discount) {
            return Err(ConfigError::InvalidDiscount(planner.discount));
        }
        if planner.horizon == 0 {
            return Err(ConfigError::InvalidHorizon(planner.horizon));
        }

        let estimator = &config.estimator;
        if estimator.components == 0 {
            return Err(ConfigError::InvalidComponents(estimator.components));
        }
        if estimator.restarts == 0 {
            return Err(ConfigError::InvalidRestarts(estimator.restarts));
        }
        if estimator.dcm_prior_shape < 1.0 {
            return Err(ConfigError::InvalidPriorShape(estimator.dcm_prior_shape));
        }
        if estimator.dcm_prior_scale <= 0.0 || estimator.concentration < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "dcm_prior_scale must be positive and concentration nonnegative".to_string(),
            ));
        }
        if !(estimator.logistic_step > 0.0 && estimator.logistic_l2 >= 0.0) {
            return Err(ConfigError::ValidationFailed(
                "logistic_step must be positive and logistic_l2 nonnegative".to_string(),
            ));
        }

        let execution = &config.execution;
        if execution.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(execution.poll_interval_ms));
        }
        if execution.wall_clock_slack < 1.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "wall_clock_slack must be at least 1, got {}",
                execution.wall_clock_slack
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{ExecutionMode, PlannerKind};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.budget.ladder_len, 10);
        assert!((config.budget.machine_speed - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.portfolio.max_invocations, 50);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
budget:
  ladder_step: 50.0
  ladder_len: 6
  machine_speed: 1.25
planner:
  kind: bellman
  discount: 0.001
execution:
  mode: recycled
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert!((config.budget.ladder_step - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.budget.ladder_len, 6);
        assert_eq!(config.planner.kind, PlannerKind::Bellman);
        assert_eq!(config.execution.mode, ExecutionMode::Recycled);
        assert_eq!(config.logging.format, "pretty");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_ladder_len() {
        let mut config = Config::default();
        config.budget.ladder_len = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLadderLen(0))
        ));
    }

    #[test]
    fn test_validate_nonpositive_ladder_step() {
        let mut config = Config::default();
        config.budget.ladder_step = 0.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLadderStep(_))
        ));
    }

    #[test]
    fn test_validate_machine_speed() {
        let mut config = Config::default();
        config.budget.machine_speed = -1.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMachineSpeed(_))
        ));
    }

    #[test]
    fn test_validate_discount_range() {
        let mut config = Config::default();
        config.planner.discount = 1.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidDiscount(_))
        ));
    }

    #[test]
    fn test_validate_zero_components() {
        let mut config = Config::default();
        config.estimator.components = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidComponents(0))
        ));
    }

    #[test]
    fn test_validate_logistic_step() {
        let mut config = Config::default();
        config.estimator.logistic_step = 0.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogFormat(format)) => assert_eq!(format, "xml"),
            other => panic!("Expected InvalidLogFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("BUDGETFOLIO_PLANNER__KIND", Some("bellman")),
                ("BUDGETFOLIO_BUDGET__LADDER_LEN", Some("4")),
                ("BUDGETFOLIO_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config: Config = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Env::prefixed("BUDGETFOLIO_").split("__"))
                    .extract()
                    .expect("env config should extract");
                assert_eq!(config.planner.kind, PlannerKind::Bellman);
                assert_eq!(config.budget.ladder_len, 4);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "budget:\n  ladder_len: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "budget:\n  ladder_len: 15\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.budget.ladder_len, 15, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }

    #[test]
    fn test_load_from_file_validates() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "planner:\n  horizon: 0").unwrap();
        file.flush().unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("horizon"));
    }
}
