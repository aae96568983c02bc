use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::tensor::PathMatrix;
use crate::EquityVarResult;

use super::standard_normal;

/// GBM parameters for a single position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    /// Starting value of the position (price × shares).
    pub initial_value: f64,
    /// Annualized drift μ.
    pub drift: f64,
    /// Annualized volatility σ.
    pub volatility: f64,
    /// Day-count fraction per step.
    pub dt: f64,
}

impl GbmParams {
    /// `(μ − ½σ²)·dt`
    pub fn step_drift(&self) -> f64 {
        (self.drift - 0.5 * self.volatility * self.volatility) * self.dt
    }

    /// `σ·√dt`
    pub fn step_diffusion(&self) -> f64 {
        self.volatility * self.dt.sqrt()
    }

    fn validate(&self) -> EquityVarResult<()> {
        if !self.initial_value.is_finite() || self.initial_value < 0.0 {
            return Err(EquityVarError::invalid(
                "initial_value",
                "Must be finite and non-negative",
            ));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(EquityVarError::invalid(
                "volatility",
                "Must be finite and non-negative",
            ));
        }
        if !self.drift.is_finite() {
            return Err(EquityVarError::invalid("drift", "Must be finite"));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(EquityVarError::invalid("dt", "Must be positive"));
        }
        Ok(())
    }
}

/// Simulate `scenarios` independent GBM value paths over `steps` periods.
///
/// Returns a `(steps + 1) × scenarios` matrix: row 0 is the starting value
/// and every later cell is `V[t-1] · exp(drift + diffusion · z)` with a
/// fresh standard-normal `z`. Draws are taken row by row, scenario by
/// scenario, so a seeded RNG replays exactly.
pub fn simulate_single_asset<R: Rng>(
    params: &GbmParams,
    steps: usize,
    scenarios: usize,
    rng: &mut R,
) -> EquityVarResult<PathMatrix> {
    params.validate()?;
    if steps == 0 {
        return Err(EquityVarError::invalid("steps", "Must be at least 1"));
    }
    if scenarios == 0 {
        return Err(EquityVarError::invalid("scenarios", "Must be at least 1"));
    }

    let normal = standard_normal()?;
    let drift = params.step_drift();
    let diffusion = params.step_diffusion();

    let mut paths = PathMatrix::filled(steps + 1, scenarios, params.initial_value);
    for t in 1..=steps {
        let (prev, cur) = paths.step_pair_mut(t);
        for (v, &p) in cur.iter_mut().zip(prev) {
            let z: f64 = rng.sample(normal);
            *v = p * (drift + diffusion * z).exp();
        }
    }

    tracing::debug!(steps, scenarios, drift, diffusion, "single-asset paths simulated");
    Ok(paths)
}
