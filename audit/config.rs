//! Run parameters.
//!
//! A configuration is assembled before the game starts, either from a TOML file
//! or from command-line flags, and is validated once. Unknown formulation tags
//! are rejected here rather than silently falling back to a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown fairness definition '{0}'. Expected one of: alpha_beta, gamma.")]
    UnknownFairnessDefinition(String),
    #[error("Unknown auditor '{0}'. Expected one of: random, regression.")]
    UnknownAuditor(String),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// How a discovered disparity is judged small enough to leave unpenalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessDefinition {
    /// Tolerance on the raw rate gap: `|disparity| < beta`.
    AlphaBeta,
    /// Tolerance on the prevalence-weighted gap: `|disparity| * group_mass_0 < beta`.
    #[default]
    Gamma,
}

impl FairnessDefinition {
    /// The quantity compared against `beta`.
    pub fn gated_quantity(self, disparity: f64, group_mass_0: f64) -> f64 {
        match self {
            Self::AlphaBeta => disparity.abs(),
            Self::Gamma => disparity.abs() * group_mass_0,
        }
    }

    /// True when the disparity is within tolerance and carries no penalty.
    pub fn within_tolerance(self, disparity: f64, group_mass_0: f64, beta: f64) -> bool {
        self.gated_quantity(disparity, group_mass_0) < beta
    }
}

impl FromStr for FairnessDefinition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha_beta" => Ok(Self::AlphaBeta),
            "gamma" => Ok(Self::Gamma),
            other => Err(ConfigError::UnknownFairnessDefinition(other.to_string())),
        }
    }
}

impl fmt::Display for FairnessDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlphaBeta => write!(f, "alpha_beta"),
            Self::Gamma => write!(f, "gamma"),
        }
    }
}

/// How the dual player proposes its group each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditorKind {
    /// One random hyperplane per round.
    #[default]
    Random,
    /// Fitted cost-sensitive oracle in both directions.
    Regression,
}

impl FromStr for AuditorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "regression" => Ok(Self::Regression),
            other => Err(ConfigError::UnknownAuditor(other.to_string())),
        }
    }
}

impl fmt::Display for AuditorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Regression => write!(f, "regression"),
        }
    }
}

/// Parameters of one fictitious-play run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Dual-variable scale `B`.
    pub budget: f64,
    /// Number of sensitive columns exposed to the auditor.
    pub num_sensitive: usize,
    pub fairness: FairnessDefinition,
    /// Slack tolerance.
    pub beta: f64,
    pub max_iterations: usize,
    pub seed: u64,
    pub auditor: AuditorKind,
    /// Stop as soon as the discovered group is within tolerance.
    pub early_stop: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            budget: 10.0,
            num_sensitive: 18,
            fairness: FairnessDefinition::Gamma,
            beta: 0.05,
            max_iterations: 1000,
            seed: 1,
            auditor: AuditorKind::Random,
            early_stop: false,
        }
    }
}

impl AuditConfig {
    /// Loads a configuration from a TOML file; missing keys take their defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_string)
    }

    pub fn from_toml_str(toml_string: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_string)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.budget.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "budget",
                reason: format!("must be finite, got {}", self.budget),
            });
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "beta",
                reason: format!("must be finite and non-negative, got {}", self.beta),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fairness_tags_parse() {
        assert_eq!(
            "alpha_beta".parse::<FairnessDefinition>().unwrap(),
            FairnessDefinition::AlphaBeta
        );
        assert_eq!(
            "gamma".parse::<FairnessDefinition>().unwrap(),
            FairnessDefinition::Gamma
        );
        assert_eq!(FairnessDefinition::AlphaBeta.to_string(), "alpha_beta");
    }

    #[test]
    fn unknown_fairness_tag_is_rejected() {
        let err = "delta".parse::<FairnessDefinition>().unwrap_err();
        match err {
            ConfigError::UnknownFairnessDefinition(tag) => assert_eq!(tag, "delta"),
            other => panic!("Expected UnknownFairnessDefinition, got {:?}", other),
        }
    }

    #[test]
    fn unknown_fairness_tag_in_toml_is_rejected() {
        let err = AuditConfig::from_toml_str("fairness = \"equal_odds\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError(_)));
    }

    #[test]
    fn gamma_weights_by_group_mass() {
        let gamma = FairnessDefinition::Gamma;
        let alpha_beta = FairnessDefinition::AlphaBeta;

        assert!(gamma.within_tolerance(0.4, 0.1, 0.05));
        assert!(!alpha_beta.within_tolerance(0.4, 0.1, 0.05));
        assert!(alpha_beta.within_tolerance(-0.01, 1.0, 0.05));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = AuditConfig::from_toml_str(
            r#"
            budget = 26.0
            fairness = "alpha_beta"
            max_iterations = 50
            auditor = "regression"
            "#,
        )
        .unwrap();

        assert_eq!(config.budget, 26.0);
        assert_eq!(config.fairness, FairnessDefinition::AlphaBeta);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.auditor, AuditorKind::Regression);
        assert_eq!(config.beta, 0.05);
        assert_eq!(config.seed, 1);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let config = AuditConfig {
            max_iterations: 0,
            ..AuditConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                ..
            })
        ));

        let config = AuditConfig {
            beta: -1.0,
            ..AuditConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "beta", .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AuditConfig::from_toml_str("buget = 1.0").is_err());
    }
}
