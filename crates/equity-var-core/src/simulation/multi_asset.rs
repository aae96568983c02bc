use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::tensor::Tensor3;
use crate::EquityVarResult;

/// Per-asset inputs to the correlated GBM recurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAssetParams {
    /// Annualized mean log return per asset.
    pub annual_mean: Vec<f64>,
    /// Annualized variance per asset (covariance diagonal).
    pub annual_variance: Vec<f64>,
    /// Last observed price per asset.
    pub start_prices: Vec<f64>,
    /// Day-count fraction per step.
    pub dt: f64,
}

impl MultiAssetParams {
    pub fn n_assets(&self) -> usize {
        self.start_prices.len()
    }

    /// `(mean − ½·variance)·dt` per asset.
    pub fn step_drift(&self) -> Vec<f64> {
        self.annual_mean
            .iter()
            .zip(&self.annual_variance)
            .map(|(m, v)| (m - 0.5 * v) * self.dt)
            .collect()
    }

    fn validate(&self) -> EquityVarResult<()> {
        let n = self.n_assets();
        if n == 0 {
            return Err(EquityVarError::InsufficientData(
                "At least one asset is required".into(),
            ));
        }
        if self.annual_mean.len() != n || self.annual_variance.len() != n {
            return Err(EquityVarError::invalid(
                "params",
                format!(
                    "Lengths differ: {} means, {} variances, {n} prices",
                    self.annual_mean.len(),
                    self.annual_variance.len()
                ),
            ));
        }
        if self
            .start_prices
            .iter()
            .any(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(EquityVarError::invalid(
                "start_prices",
                "Prices must be finite and non-negative",
            ));
        }
        if self.annual_variance.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EquityVarError::invalid(
                "annual_variance",
                "Variances must be finite and non-negative",
            ));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(EquityVarError::invalid("dt", "Must be positive"));
        }
        Ok(())
    }
}

/// Evolve a `(T+1) × assets × scenarios` price tensor.
///
/// Row 0 broadcasts the start prices. Row `t` uses the shock stored in slot
/// `t − 1`: `P[t][j][s] = P[t−1][j][s] · exp(drift[j] + shock[t−1][j][s]·√dt)`.
/// Shocks already carry each asset's volatility through `L`.
pub fn simulate_price_paths(
    params: &MultiAssetParams,
    correlated_shocks: &Tensor3,
) -> EquityVarResult<Tensor3> {
    params.validate()?;
    let (steps, assets, scenarios) = correlated_shocks.shape();
    if assets != params.n_assets() {
        return Err(EquityVarError::invalid(
            "correlated_shocks",
            format!(
                "Shocks cover {assets} assets, parameters cover {}",
                params.n_assets()
            ),
        ));
    }
    if steps == 0 || scenarios == 0 {
        return Err(EquityVarError::invalid(
            "correlated_shocks",
            "Need at least one step and one scenario",
        ));
    }

    let drift = params.step_drift();
    let sqrt_dt = params.dt.sqrt();

    let mut prices = Tensor3::zeros(steps + 1, assets, scenarios);
    for (j, lane) in prices.step_mut(0).chunks_exact_mut(scenarios).enumerate() {
        lane.fill(params.start_prices[j]);
    }

    for t in 1..=steps {
        let shock = correlated_shocks.step(t - 1);
        let (prev, cur) = prices.step_pair_mut(t);
        cur.par_chunks_exact_mut(scenarios)
            .zip(prev.par_chunks_exact(scenarios))
            .zip(shock.par_chunks_exact(scenarios))
            .enumerate()
            .for_each(|(j, ((cur, prev), shock))| {
                let mu = drift[j];
                for ((p, &p0), &z) in cur.iter_mut().zip(prev).zip(shock) {
                    *p = p0 * (mu + z * sqrt_dt).exp();
                }
            });
    }

    tracing::debug!(steps, assets, scenarios, "price tensor simulated");
    Ok(prices)
}
