use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::RunConfig;
use crate::covariance::CovarianceModel;
use crate::error::EquityVarError;
use crate::series::{return_matrix, validate_aligned, AssetSeries};
use crate::simulation::multi_asset::{simulate_price_paths, MultiAssetParams};
use crate::simulation::run_rng;
use crate::simulation::shocks::{generate_correlated_shocks, ShockStats, ZeroRedrawPolicy};
use crate::simulation::single_asset::{simulate_single_asset, GbmParams};
use crate::stats::percentile_band;
use crate::tensor::{PathMatrix, Tensor3};
use crate::types::{with_metadata, ComputationOutput};
use crate::EquityVarResult;

use super::metrics::{portfolio_terminal_values, LossDistribution, RiskMetrics};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a single-position run from precomputed drift and volatility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleAssetRiskInput {
    #[serde(default)]
    pub ticker: Option<String>,
    pub last_price: f64,
    pub shares: u32,
    /// Annualized drift μ.
    pub annual_drift: f64,
    /// Annualized volatility σ.
    pub annual_volatility: f64,
    #[serde(default)]
    pub config: RunConfig,
    /// Percentiles (0–100) to report as bands across the horizon.
    #[serde(default)]
    pub bands: Vec<f64>,
    /// Attach the sorted loss distribution to the output.
    #[serde(default)]
    pub include_losses: bool,
}

impl SingleAssetRiskInput {
    /// Take μ and σ from a return history.
    pub fn from_series(series: &AssetSeries, config: RunConfig) -> Self {
        let (annual_drift, annual_volatility) = series.annualized(config.trading_days_per_year);
        Self {
            ticker: Some(series.ticker.clone()),
            last_price: series.last_price,
            shares: series.shares,
            annual_drift,
            annual_volatility,
            config,
            bands: Vec::new(),
            include_losses: false,
        }
    }
}

/// Value of a percentile at every step of the horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileBand {
    pub percentile: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleAssetRiskOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub initial_value: f64,
    pub scenario_count: u32,
    pub horizon_days: u32,
    pub mean_terminal_value: f64,
    pub metrics: Vec<RiskMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub percentile_bands: Vec<PercentileBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_distribution: Option<Vec<f64>>,
}

/// Input for a correlated multi-asset run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRiskInput {
    pub assets: Vec<AssetSeries>,
    #[serde(default)]
    pub config: RunConfig,
    #[serde(default)]
    pub bands: Vec<f64>,
    #[serde(default)]
    pub include_losses: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSummary {
    pub ticker: String,
    pub shares: u32,
    pub last_price: f64,
    pub position_value: f64,
    pub weight: f64,
    pub annualized_mean: f64,
    pub annualized_volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRiskOutput {
    pub initial_value: f64,
    pub scenario_count: u32,
    pub horizon_days: u32,
    pub mean_terminal_value: f64,
    pub assets: Vec<AssetSummary>,
    pub correlation: Vec<Vec<f64>>,
    pub metrics: Vec<RiskMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub percentile_bands: Vec<PercentileBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_distribution: Option<Vec<f64>>,
}

/// Everything one correlated run produced, for custom downstream analysis.
#[derive(Debug, Clone)]
pub struct PortfolioSimulation {
    pub tickers: Vec<String>,
    pub shares: Vec<f64>,
    pub initial_value: f64,
    pub covariance: CovarianceModel,
    /// `(horizon + 1) × assets × scenarios`
    pub price_tensor: Tensor3,
    pub terminal_values: Vec<f64>,
    pub losses: LossDistribution,
    pub shock_stats: ShockStats,
}

impl PortfolioSimulation {
    /// Portfolio value per `(step, scenario)`.
    pub fn portfolio_value_paths(&self) -> EquityVarResult<PathMatrix> {
        let (steps, _, scenarios) = self.price_tensor.shape();
        let mut paths = PathMatrix::filled(steps, scenarios, 0.0);
        for t in 0..steps {
            let values = portfolio_terminal_values(self.price_tensor.step(t), &self.shares, scenarios)?;
            paths.row_mut(t).copy_from_slice(&values);
        }
        Ok(paths)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn collect_metrics(
    losses: &LossDistribution,
    config: &RunConfig,
    warnings: &mut Vec<String>,
) -> EquityVarResult<Vec<RiskMetrics>> {
    config
        .confidence_levels
        .iter()
        .map(|&c| {
            let m = losses.metrics(c)?;
            if let Some(note) = &m.expected_shortfall_note {
                tracing::warn!(confidence = c, "{note}");
                warnings.push(format!("Expected shortfall not reported: {note}"));
            }
            Ok(m)
        })
        .collect()
}

fn bands_for(paths: &PathMatrix, percentiles: &[f64]) -> EquityVarResult<Vec<PercentileBand>> {
    percentiles
        .iter()
        .map(|&p| {
            Ok(PercentileBand {
                percentile: p,
                values: percentile_band(paths, p)?,
            })
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn shock_warnings(stats: &ShockStats, warnings: &mut Vec<String>) {
    if stats.persistent_zeros > 0 {
        warnings.push(format!(
            "{} of {} normal draws stayed exactly zero after the redraw limit",
            stats.persistent_zeros, stats.cells
        ));
    }
}

// ---------------------------------------------------------------------------
// Public API: single asset
// ---------------------------------------------------------------------------

/// Simulate one position with independent GBM paths and report VaR/ES.
///
/// The loss convention matches the portfolio run: loss = initial value −
/// simulated terminal value, with shares folded into the simulated value.
pub fn run_single_asset_risk(
    input: &SingleAssetRiskInput,
) -> EquityVarResult<ComputationOutput<SingleAssetRiskOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let config = &input.config;

    config.validate()?;
    if !(input.last_price.is_finite() && input.last_price > 0.0) {
        return Err(EquityVarError::invalid("last_price", "Must be positive"));
    }
    if input.shares == 0 {
        return Err(EquityVarError::invalid("shares", "Must be at least 1"));
    }

    let _span = tracing::info_span!("single_asset_risk", ticker = ?input.ticker).entered();
    tracing::info!(
        scenarios = config.scenario_count,
        horizon_days = config.horizon_days,
        "starting single-asset simulation"
    );

    let initial_value = input.last_price * input.shares as f64;
    let params = GbmParams {
        initial_value,
        drift: input.annual_drift,
        volatility: input.annual_volatility,
        dt: config.dt(),
    };
    let mut rng = run_rng(config.seed);
    let paths = simulate_single_asset(
        &params,
        config.horizon_days as usize,
        config.scenario_count as usize,
        &mut rng,
    )?;

    let losses = LossDistribution::from_terminal_values(initial_value, paths.terminal())?;
    let metrics = collect_metrics(&losses, config, &mut warnings)?;
    let percentile_bands = bands_for(&paths, &input.bands)?;

    let output = SingleAssetRiskOutput {
        ticker: input.ticker.clone(),
        initial_value,
        scenario_count: config.scenario_count,
        horizon_days: config.horizon_days,
        mean_terminal_value: mean(paths.terminal()),
        metrics,
        percentile_bands,
        loss_distribution: input.include_losses.then(|| losses.losses().to_vec()),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    tracing::info!(elapsed_us = elapsed, "single-asset simulation finished");
    Ok(with_metadata(
        "Monte Carlo VaR (single-asset GBM)",
        &serde_json::json!({
            "last_price": input.last_price,
            "shares": input.shares,
            "annual_drift": input.annual_drift,
            "annual_volatility": input.annual_volatility,
            "scenario_count": config.scenario_count,
            "horizon_days": config.horizon_days,
            "trading_days_per_year": config.trading_days_per_year,
            "seed": config.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Public API: correlated portfolio
// ---------------------------------------------------------------------------

/// Run the full correlated pipeline: covariance → Cholesky → shocks →
/// price tensor → losses. Validation happens before anything is allocated;
/// a non-positive-definite covariance aborts the run.
pub fn simulate_portfolio<R: Rng>(
    assets: &[AssetSeries],
    config: &RunConfig,
    rng: &mut R,
) -> EquityVarResult<PortfolioSimulation> {
    config.validate()?;
    validate_aligned(assets)?;
    if let Some(a) = assets.iter().find(|a| a.shares == 0) {
        return Err(EquityVarError::invalid(
            "shares",
            format!("{} holds no shares", a.ticker),
        ));
    }

    let shares: Vec<f64> = assets.iter().map(|a| a.shares as f64).collect();
    let initial_value: f64 = assets.iter().map(AssetSeries::position_value).sum();

    let covariance = CovarianceModel::from_returns(&return_matrix(assets)?, config.trading_days_per_year)?;
    let lower = covariance.decompose()?;

    let params = MultiAssetParams {
        annual_mean: covariance.annualized_mean().iter().copied().collect(),
        annual_variance: covariance.variances().iter().copied().collect(),
        start_prices: assets.iter().map(|a| a.last_price).collect(),
        dt: config.dt(),
    };
    let policy = ZeroRedrawPolicy {
        max_redraws: config.max_zero_redraws,
    };
    let shocks = generate_correlated_shocks(
        config.horizon_days as usize,
        config.scenario_count as usize,
        &lower,
        policy,
        rng,
    )?;
    let price_tensor = simulate_price_paths(&params, &shocks.tensor)?;

    let scenarios = config.scenario_count as usize;
    let terminal_values = portfolio_terminal_values(price_tensor.terminal(), &shares, scenarios)?;
    let losses = LossDistribution::from_terminal_values(initial_value, &terminal_values)?;

    Ok(PortfolioSimulation {
        tickers: assets.iter().map(|a| a.ticker.clone()).collect(),
        shares,
        initial_value,
        covariance,
        price_tensor,
        terminal_values,
        losses,
        shock_stats: shocks.stats,
    })
}

/// Correlated multi-asset VaR/ES for every configured confidence level.
pub fn run_portfolio_risk(
    input: &PortfolioRiskInput,
) -> EquityVarResult<ComputationOutput<PortfolioRiskOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let config = &input.config;

    let _span = tracing::info_span!("portfolio_risk", assets = input.assets.len()).entered();
    tracing::info!(
        scenarios = config.scenario_count,
        horizon_days = config.horizon_days,
        "starting correlated portfolio simulation"
    );

    let mut rng = run_rng(config.seed);
    let sim = simulate_portfolio(&input.assets, config, &mut rng)?;
    shock_warnings(&sim.shock_stats, &mut warnings);

    let metrics = collect_metrics(&sim.losses, config, &mut warnings)?;
    let percentile_bands = if input.bands.is_empty() {
        Vec::new()
    } else {
        bands_for(&sim.portfolio_value_paths()?, &input.bands)?
    };

    let annual_mean = sim.covariance.annualized_mean();
    let vols = sim.covariance.volatilities();
    let assets = input
        .assets
        .iter()
        .enumerate()
        .map(|(j, a)| AssetSummary {
            ticker: a.ticker.clone(),
            shares: a.shares,
            last_price: a.last_price,
            position_value: a.position_value(),
            weight: a.position_value() / sim.initial_value,
            annualized_mean: annual_mean[j],
            annualized_volatility: vols[j],
        })
        .collect();
    let correlation = sim
        .covariance
        .correlation()
        .row_iter()
        .map(|r| r.iter().copied().collect())
        .collect();

    let output = PortfolioRiskOutput {
        initial_value: sim.initial_value,
        scenario_count: config.scenario_count,
        horizon_days: config.horizon_days,
        mean_terminal_value: mean(&sim.terminal_values),
        assets,
        correlation,
        metrics,
        percentile_bands,
        loss_distribution: input.include_losses.then(|| sim.losses.losses().to_vec()),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    tracing::info!(elapsed_us = elapsed, "correlated portfolio simulation finished");
    Ok(with_metadata(
        "Monte Carlo VaR (correlated multi-asset GBM, Cholesky)",
        &serde_json::json!({
            "tickers": sim.tickers,
            "observations": sim.covariance.observations,
            "scenario_count": config.scenario_count,
            "horizon_days": config.horizon_days,
            "trading_days_per_year": config.trading_days_per_year,
            "seed": config.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 42;

    fn config(scenarios: u32, horizon: u32) -> RunConfig {
        RunConfig {
            scenario_count: scenarios,
            horizon_days: horizon,
            confidence_levels: vec![0.95, 0.99],
            seed: Some(SEED),
            ..Default::default()
        }
    }

    fn two_assets() -> Vec<AssetSeries> {
        let a = vec![0.012, -0.008, 0.004, -0.015, 0.009, 0.001, -0.003, 0.006];
        let b = vec![0.004, -0.011, 0.007, -0.002, 0.010, -0.006, 0.002, 0.003];
        vec![
            AssetSeries::new("AAA", a, 120.0, 10),
            AssetSeries::new("BBB", b, 45.5, 30),
        ]
    }

    #[test]
    fn test_single_asset_flat_market_has_no_risk() {
        let input = SingleAssetRiskInput {
            ticker: Some("FLAT".into()),
            last_price: 150.0,
            shares: 10,
            annual_drift: 0.0,
            annual_volatility: 0.0,
            config: config(200, 5),
            bands: vec![],
            include_losses: false,
        };
        let out = run_single_asset_risk(&input).unwrap();
        assert_eq!(out.result.initial_value, 1500.0);
        assert_eq!(out.result.mean_terminal_value, 1500.0);
        for m in &out.result.metrics {
            assert_eq!(m.var, 0.0);
            assert_eq!(m.expected_shortfall, Some(0.0));
        }
        // round(0.05 * 199) = 10, round(0.01 * 199) = 2
        let ranks: Vec<usize> = out.result.metrics.iter().map(|m| m.tail_observations).collect();
        assert_eq!(ranks, vec![10, 2]);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn test_single_asset_bands_and_losses() {
        let input = SingleAssetRiskInput {
            ticker: None,
            last_price: 100.0,
            shares: 1,
            annual_drift: 0.05,
            annual_volatility: 0.3,
            config: config(500, 10),
            bands: vec![5.0, 50.0, 95.0],
            include_losses: true,
        };
        let out = run_single_asset_risk(&input).unwrap().result;
        assert_eq!(out.percentile_bands.len(), 3);
        assert_eq!(out.percentile_bands[0].values.len(), 11);
        assert_eq!(out.percentile_bands[1].values[0], 100.0);
        let last = 10;
        assert!(out.percentile_bands[0].values[last] < out.percentile_bands[2].values[last]);
        assert_eq!(out.loss_distribution.unwrap().len(), 500);
    }

    #[test]
    fn test_single_asset_rejects_bad_horizon() {
        let input = SingleAssetRiskInput {
            ticker: None,
            last_price: 100.0,
            shares: 1,
            annual_drift: 0.0,
            annual_volatility: 0.2,
            config: config(100, 300),
            bands: vec![],
            include_losses: false,
        };
        assert!(matches!(
            run_single_asset_risk(&input),
            Err(EquityVarError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_portfolio_run_reports_every_confidence() {
        let input = PortfolioRiskInput {
            assets: two_assets(),
            config: config(2_000, 10),
            bands: vec![50.0],
            include_losses: false,
        };
        let out = run_portfolio_risk(&input).unwrap();
        let r = &out.result;
        assert_eq!(r.metrics.len(), 2);
        assert!((r.initial_value - (1200.0 + 1365.0)).abs() < 1e-9);
        assert_eq!(r.percentile_bands[0].values.len(), 11);
        assert!((r.percentile_bands[0].values[0] - r.initial_value).abs() < 1e-9);
        let w: f64 = r.assets.iter().map(|a| a.weight).sum();
        assert!((w - 1.0).abs() < 1e-12);
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }

    #[test]
    fn test_portfolio_seeded_reproducibility() {
        let cfg = config(500, 5);
        let a = simulate_portfolio(&two_assets(), &cfg, &mut run_rng(Some(SEED))).unwrap();
        let b = simulate_portfolio(&two_assets(), &cfg, &mut run_rng(Some(SEED))).unwrap();
        assert_eq!(a.price_tensor, b.price_tensor);
        assert_eq!(a.losses, b.losses);
    }

    #[test]
    fn test_portfolio_value_paths_start_at_initial_value() {
        let sim = simulate_portfolio(&two_assets(), &config(50, 3), &mut run_rng(Some(SEED))).unwrap();
        let paths = sim.portfolio_value_paths().unwrap();
        assert_eq!(paths.steps(), 4);
        assert!(paths.row(0).iter().all(|v| (v - sim.initial_value).abs() < 1e-9));
        assert_eq!(paths.terminal(), sim.terminal_values.as_slice());
    }

    #[test]
    fn test_misaligned_portfolio_rejected_before_simulation() {
        let mut assets = two_assets();
        assets[1].log_returns.pop();
        let input = PortfolioRiskInput {
            assets,
            config: config(100, 5),
            bands: vec![],
            include_losses: false,
        };
        assert!(matches!(
            run_portfolio_risk(&input),
            Err(EquityVarError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_identical_series_abort_without_fallback() {
        // Exactly representable returns: the annualized covariance is the
        // all-ones matrix, whose second Cholesky pivot is exactly zero.
        let returns = vec![0.5, -0.5];
        let assets = vec![
            AssetSeries::new("A", returns.clone(), 10.0, 1),
            AssetSeries::new("B", returns, 20.0, 1),
        ];
        let cfg = RunConfig {
            trading_days_per_year: 2,
            ..config(100, 1)
        };
        let err = simulate_portfolio(&assets, &cfg, &mut run_rng(Some(SEED))).unwrap_err();
        assert!(matches!(err, EquityVarError::NumericalError(_)), "{err}");
    }
}
