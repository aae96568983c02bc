pub mod covariance;
pub mod holdings;
pub mod percentile;
pub mod portfolio;
pub mod single;

use clap::Args;

use equity_var_core::RunConfig;

use crate::input;

/// Simulation settings shared by `single` and `portfolio`.
///
/// Precedence: flags, then `--config`, then whatever the JSON input carried,
/// then built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// YAML or JSON run configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Number of simulated scenarios
    #[arg(long)]
    pub scenarios: Option<u32>,

    /// Horizon in trading days (1-252)
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Comma-separated confidence levels (e.g. "0.95,0.99")
    #[arg(long, value_delimiter = ',')]
    pub confidence: Option<Vec<f64>>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Comma-separated percentiles (0-100) to report across the horizon
    #[arg(long, value_delimiter = ',')]
    pub bands: Option<Vec<f64>>,

    /// Include the sorted loss distribution in the output
    #[arg(long)]
    pub include_losses: bool,
}

impl RunArgs {
    /// Layer the configuration file and flags over `base`.
    pub fn resolve(&self, base: RunConfig) -> Result<RunConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => input::file::read_run_config(path, &base)?,
            None => base,
        };
        if let Some(n) = self.scenarios {
            config.scenario_count = n;
        }
        if let Some(h) = self.horizon {
            config.horizon_days = h;
        }
        if let Some(c) = &self.confidence {
            config.confidence_levels = c.clone();
        }
        if let Some(s) = self.seed {
            config.seed = Some(s);
        }
        config.validate()?;
        tracing::debug!(?config, "run configuration resolved");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_base() {
        let args = RunArgs {
            scenarios: Some(500),
            confidence: Some(vec![0.9]),
            seed: Some(7),
            ..Default::default()
        };
        let base = RunConfig {
            horizon_days: 5,
            ..Default::default()
        };
        let config = args.resolve(base).unwrap();
        assert_eq!(config.scenario_count, 500);
        assert_eq!(config.horizon_days, 5);
        assert_eq!(config.confidence_levels, vec![0.9]);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_config_file_layers_over_input_config() {
        let path = std::env::temp_dir().join("evar_resolve_layering.yaml");
        std::fs::write(&path, "scenario_count: 1200\nseed: 4\n").unwrap();
        let args = RunArgs {
            config: Some(path.to_string_lossy().into_owned()),
            seed: Some(8),
            ..Default::default()
        };
        let base = RunConfig {
            horizon_days: 7,
            confidence_levels: vec![0.975],
            ..Default::default()
        };
        let config = args.resolve(base).unwrap();
        assert_eq!(config.scenario_count, 1200);
        assert_eq!(config.horizon_days, 7);
        assert_eq!(config.confidence_levels, vec![0.975]);
        assert_eq!(config.seed, Some(8));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = RunArgs {
            horizon: Some(0),
            ..Default::default()
        };
        assert!(args.resolve(RunConfig::default()).is_err());
    }
}
