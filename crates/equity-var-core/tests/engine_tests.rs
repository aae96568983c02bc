use equity_var_core::covariance::{CovarianceModel, DecompositionOperator};
use equity_var_core::risk::{
    run_portfolio_risk, run_single_asset_risk, simulate_portfolio, PortfolioRiskInput,
    SingleAssetRiskInput,
};
use equity_var_core::simulation::multi_asset::{simulate_price_paths, MultiAssetParams};
use equity_var_core::simulation::run_rng;
use equity_var_core::simulation::shocks::{correlate_shocks, draw_raw_shocks, ZeroRedrawPolicy};
use equity_var_core::simulation::single_asset::{simulate_single_asset, GbmParams};
use equity_var_core::stats::percentile;
use equity_var_core::{AssetSeries, EquityVarError, RunConfig};
use nalgebra::DMatrix;
use pretty_assertions::assert_eq;

const SEED: u64 = 20_240_117;

fn run_config(scenarios: u32, horizon: u32, confidences: &[f64]) -> RunConfig {
    RunConfig {
        scenario_count: scenarios,
        horizon_days: horizon,
        confidence_levels: confidences.to_vec(),
        seed: Some(SEED),
        ..Default::default()
    }
}

/// Sixty days of deterministic, non-collinear daily returns for three names.
fn three_asset_book() -> Vec<AssetSeries> {
    let days = 60;
    let a: Vec<f64> = (0..days)
        .map(|i| 0.011 * (i as f64 * 0.7).sin() + 0.0004)
        .collect();
    let b: Vec<f64> = (0..days)
        .map(|i| 0.008 * (i as f64 * 0.7).sin() + 0.009 * (i as f64 * 1.9).cos())
        .collect();
    let c: Vec<f64> = (0..days)
        .map(|i| 0.015 * (i as f64 * 2.3 + 0.4).sin() - 0.0002)
        .collect();
    vec![
        AssetSeries::new("GOOGL", a, 141.8, 25),
        AssetSeries::new("MSFT", b, 404.9, 10),
        AssetSeries::new("AMZN", c, 155.2, 40),
    ]
}

// ===========================================================================
// Scenario A: degenerate single asset
// ===========================================================================

#[test]
fn test_zero_volatility_single_asset_is_riskless() {
    let params = GbmParams {
        initial_value: 1500.0,
        drift: 0.0,
        volatility: 0.0,
        dt: 1.0 / 252.0,
    };
    let paths = simulate_single_asset(&params, 30, 250, &mut run_rng(Some(SEED))).unwrap();
    assert!(paths.terminal().iter().all(|v| *v == 1500.0));

    let input = SingleAssetRiskInput {
        ticker: Some("FLAT".into()),
        last_price: 150.0,
        shares: 10,
        annual_drift: 0.0,
        annual_volatility: 0.0,
        config: run_config(250, 30, &[0.95, 0.99]),
        bands: vec![],
        include_losses: false,
    };
    let out = run_single_asset_risk(&input).unwrap().result;
    for m in &out.metrics {
        assert_eq!(m.var, 0.0);
        assert_eq!(m.expected_shortfall, Some(0.0));
    }
}

#[test]
fn test_single_asset_row_zero_is_start_value() {
    for (mu, sigma) in [(0.0, 0.2), (0.3, 0.9), (-0.5, 0.05)] {
        let params = GbmParams {
            initial_value: 987.5,
            drift: mu,
            volatility: sigma,
            dt: 1.0 / 252.0,
        };
        let paths = simulate_single_asset(&params, 7, 64, &mut run_rng(Some(SEED))).unwrap();
        assert!(paths.row(0).iter().all(|v| *v == 987.5), "mu={mu}, sigma={sigma}");
    }
}

// ===========================================================================
// Scenario B: perfect correlation
// ===========================================================================

#[test]
fn test_perfectly_correlated_pair_moves_proportionally() {
    let returns = vec![0.010, -0.004, 0.007, -0.012, 0.003, 0.006, -0.002];
    let model = CovarianceModel::from_columns(&[returns.as_slice(), returns.as_slice()], 252).unwrap();
    let corr = model.correlation();
    assert!((corr[(0, 1)] - 1.0).abs() < 1e-12);

    let sigma = model.volatilities()[0];
    let params = MultiAssetParams {
        annual_mean: model.annualized_mean().iter().copied().collect(),
        annual_variance: model.variances().iter().copied().collect(),
        start_prices: vec![100.0, 250.0],
        dt: 1.0 / 252.0,
    };
    let (steps, scenarios) = (15, 200);

    // rank-one factor of the singular covariance: both assets load on z0
    let singular = DecompositionOperator::from_lower(DMatrix::from_row_slice(
        2,
        2,
        &[sigma, 0.0, sigma, 0.0],
    ))
    .unwrap();
    let independent =
        DecompositionOperator::from_lower(DMatrix::from_diagonal_element(2, 2, sigma)).unwrap();

    let policy = ZeroRedrawPolicy::default();
    let (raw_a, _) = draw_raw_shocks(steps, 2, scenarios, policy, &mut run_rng(Some(SEED))).unwrap();
    let (raw_b, _) = draw_raw_shocks(steps, 2, scenarios, policy, &mut run_rng(Some(SEED))).unwrap();
    assert_eq!(raw_a, raw_b);

    let correlated = simulate_price_paths(&params, &correlate_shocks(&raw_a, &singular).unwrap()).unwrap();
    let uncorrelated =
        simulate_price_paths(&params, &correlate_shocks(&raw_b, &independent).unwrap()).unwrap();

    for t in 1..=steps {
        for s in 0..scenarios {
            let move_0 = correlated.get(t, 0, s) / correlated.get(t - 1, 0, s);
            let move_1 = correlated.get(t, 1, s) / correlated.get(t - 1, 1, s);
            assert!((move_0 - move_1).abs() < 1e-12, "t={t}, s={s}");

            let reference = uncorrelated.get(t, 0, s) / uncorrelated.get(t - 1, 0, s);
            assert!((move_0 - reference).abs() < 1e-12, "t={t}, s={s}");
        }
    }
}

#[test]
fn test_identical_series_cannot_be_decomposed_exactly() {
    let returns: &[f64] = &[0.5, -0.5];
    let model = CovarianceModel::from_columns(&[returns, returns], 2).unwrap();
    let err = model.decompose().unwrap_err();
    assert!(matches!(err, EquityVarError::NumericalError(_)));
    assert!(err.is_fatal());
}

// ===========================================================================
// Scenario D: three-asset portfolio
// ===========================================================================

#[test]
fn test_three_asset_portfolio_var_and_es() {
    let input = PortfolioRiskInput {
        assets: three_asset_book(),
        config: run_config(1000, 21, &[0.95]),
        bands: vec![],
        include_losses: false,
    };
    let out = run_portfolio_risk(&input).unwrap();
    let m = &out.result.metrics[0];
    let es = m.expected_shortfall.expect("1000 scenarios leave a populated tail");
    assert!(m.var >= 0.0, "VaR_95 = {}", m.var);
    assert!(es >= m.var, "ES_95 = {es}, VaR_95 = {}", m.var);
    assert!(m.var_pct <= 100.0);
    assert_eq!(m.tail_observations, 50);
    assert_eq!(out.result.correlation.len(), 3);
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
}

#[test]
fn test_var_dominates_tail_loss_percentile() {
    let config = run_config(2000, 10, &[0.9, 0.95, 0.99]);
    let sim = simulate_portfolio(&three_asset_book(), &config, &mut run_rng(Some(SEED))).unwrap();
    let losses: Vec<f64> = sim
        .terminal_values
        .iter()
        .map(|v| sim.initial_value - v)
        .collect();
    for &c in &config.confidence_levels {
        let var = sim.losses.value_at_risk(c).unwrap();
        let cross_check = percentile(&losses, (1.0 - c) * 100.0).unwrap();
        assert!(var >= cross_check, "c={c}: VaR {var} < {cross_check}");
        let es = sim.losses.expected_shortfall(c).unwrap();
        assert!(es >= var, "c={c}: ES {es} < VaR {var}");
    }
}

#[test]
fn test_portfolio_runs_replay_from_seed() {
    let config = run_config(400, 5, &[0.95]);
    let first = run_portfolio_risk(&PortfolioRiskInput {
        assets: three_asset_book(),
        config: config.clone(),
        bands: vec![5.0, 95.0],
        include_losses: true,
    })
    .unwrap()
    .result;
    let second = run_portfolio_risk(&PortfolioRiskInput {
        assets: three_asset_book(),
        config: config.clone(),
        bands: vec![5.0, 95.0],
        include_losses: true,
    })
    .unwrap()
    .result;
    assert_eq!(first.loss_distribution, second.loss_distribution);
    assert_eq!(first.metrics, second.metrics);

    let reseeded = run_portfolio_risk(&PortfolioRiskInput {
        assets: three_asset_book(),
        config: RunConfig {
            seed: Some(SEED + 1),
            ..config
        },
        bands: vec![],
        include_losses: true,
    })
    .unwrap()
    .result;
    assert_ne!(first.loss_distribution, reseeded.loss_distribution);
}

// ===========================================================================
// Fail-fast validation
// ===========================================================================

#[test]
fn test_zero_scenarios_rejected() {
    let input = PortfolioRiskInput {
        assets: three_asset_book(),
        config: run_config(0, 21, &[0.95]),
        bands: vec![],
        include_losses: false,
    };
    assert!(matches!(
        run_portfolio_risk(&input),
        Err(EquityVarError::InvalidInput { .. })
    ));
}

#[test]
fn test_confidence_out_of_range_is_configuration_error() {
    let input = PortfolioRiskInput {
        assets: three_asset_book(),
        config: run_config(100, 21, &[1.5]),
        bands: vec![],
        include_losses: false,
    };
    assert!(matches!(
        run_portfolio_risk(&input),
        Err(EquityVarError::ConfigurationError(_))
    ));
}

#[test]
fn test_tiny_run_reports_inapplicable_shortfall() {
    let input = PortfolioRiskInput {
        assets: three_asset_book(),
        config: run_config(20, 5, &[0.99]),
        bands: vec![],
        include_losses: false,
    };
    let out = run_portfolio_risk(&input).unwrap();
    let m = &out.result.metrics[0];
    assert!(m.expected_shortfall.is_none());
    assert!(m.expected_shortfall_note.is_some());
    assert_eq!(out.warnings.len(), 1);
}
