use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::EquityVarResult;

/// Trading days in a year; the annualization constant and the horizon cap.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Default cap on how many times an exact-zero normal draw is redrawn.
pub const DEFAULT_MAX_ZERO_REDRAWS: u32 = 8;

/// Parameters shared by every risk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of simulated scenarios (paths).
    #[serde(default = "default_scenario_count")]
    pub scenario_count: u32,
    /// Horizon in trading days, 1..=252.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Confidence levels in (0, 1), e.g. 0.95 and 0.99.
    #[serde(default = "default_confidence_levels")]
    pub confidence_levels: Vec<f64>,
    /// Annualization constant; the day-count fraction is its reciprocal.
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Bounded retry policy for exact-zero normal draws.
    #[serde(default = "default_max_zero_redraws")]
    pub max_zero_redraws: u32,
}

fn default_scenario_count() -> u32 {
    10_000
}

fn default_horizon_days() -> u32 {
    21
}

fn default_confidence_levels() -> Vec<f64> {
    vec![0.95, 0.99]
}

fn default_trading_days() -> u32 {
    TRADING_DAYS_PER_YEAR
}

fn default_max_zero_redraws() -> u32 {
    DEFAULT_MAX_ZERO_REDRAWS
}

fn config_error(e: serde_yaml::Error) -> EquityVarError {
    EquityVarError::ConfigurationError(e.to_string())
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenario_count: default_scenario_count(),
            horizon_days: default_horizon_days(),
            confidence_levels: default_confidence_levels(),
            trading_days_per_year: default_trading_days(),
            seed: None,
            max_zero_redraws: default_max_zero_redraws(),
        }
    }
}

impl RunConfig {
    /// Parse a YAML document (JSON is valid YAML, so both work).
    pub fn from_yaml_str(s: &str) -> EquityVarResult<Self> {
        Self::default().overlay_yaml_str(s)
    }

    /// Apply the keys present in a YAML (or JSON) document on top of `self`.
    /// Keys the document leaves out keep their current values; unknown keys
    /// are a `ConfigurationError`.
    pub fn overlay_yaml_str(&self, s: &str) -> EquityVarResult<Self> {
        if s.trim().is_empty() {
            return Ok(self.clone());
        }
        let overrides: serde_yaml::Value = serde_yaml::from_str(s).map_err(config_error)?;
        let mut merged = serde_yaml::to_value(self).map_err(config_error)?;
        match (overrides, &mut merged) {
            (serde_yaml::Value::Null, _) => {}
            (serde_yaml::Value::Mapping(keys), serde_yaml::Value::Mapping(base)) => {
                for (key, value) in keys {
                    base.insert(key, value);
                }
            }
            (other, _) => {
                return Err(EquityVarError::ConfigurationError(format!(
                    "Run configuration must be a mapping of settings, got {other:?}"
                )))
            }
        }
        serde_yaml::from_value(merged).map_err(config_error)
    }

    /// Day-count fraction for one simulation step.
    pub fn dt(&self) -> f64 {
        1.0 / self.trading_days_per_year as f64
    }

    /// Check every field before any tensor is allocated.
    ///
    /// Structural problems (scenario count, horizon) are `InvalidInput`;
    /// contradictory or out-of-domain settings are `ConfigurationError`.
    pub fn validate(&self) -> EquityVarResult<()> {
        if self.scenario_count == 0 {
            return Err(EquityVarError::invalid(
                "scenario_count",
                "Must be greater than zero",
            ));
        }
        if self.horizon_days < 1 || self.horizon_days > TRADING_DAYS_PER_YEAR {
            return Err(EquityVarError::invalid(
                "horizon_days",
                format!(
                    "Must be between 1 and {TRADING_DAYS_PER_YEAR}, got {}",
                    self.horizon_days
                ),
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(EquityVarError::ConfigurationError(
                "trading_days_per_year must be positive".into(),
            ));
        }
        if self.confidence_levels.is_empty() {
            return Err(EquityVarError::ConfigurationError(
                "At least one confidence level is required".into(),
            ));
        }
        for (i, &c) in self.confidence_levels.iter().enumerate() {
            if !(c > 0.0 && c < 1.0) {
                return Err(EquityVarError::ConfigurationError(format!(
                    "Confidence level {c} must be strictly between 0 and 1"
                )));
            }
            if self.confidence_levels[..i].contains(&c) {
                return Err(EquityVarError::ConfigurationError(format!(
                    "Confidence level {c} is listed more than once"
                )));
            }
        }
        Ok(())
    }
}
