//! Independent normal draws and their cross-sectional correlation.

use rand::distributions::Distribution;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_ZERO_REDRAWS;
use crate::covariance::DecompositionOperator;
use crate::error::EquityVarError;
use crate::tensor::Tensor3;
use crate::EquityVarResult;

use super::standard_normal;

/// Bounded retry policy for draws that come back exactly 0.0.
///
/// A zero shock would leave a scenario flat for that step. With a
/// continuous distribution this essentially never happens, so a zero that
/// survives every retry is kept and counted, not treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroRedrawPolicy {
    pub max_redraws: u32,
}

impl Default for ZeroRedrawPolicy {
    fn default() -> Self {
        Self {
            max_redraws: DEFAULT_MAX_ZERO_REDRAWS,
        }
    }
}

/// Bookkeeping from one shock generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShockStats {
    pub cells: usize,
    pub zero_redraws: u64,
    pub persistent_zeros: u64,
}

/// Correlated shocks plus how they were drawn.
#[derive(Debug, Clone)]
pub struct CorrelatedShocks {
    pub tensor: Tensor3,
    pub stats: ShockStats,
}

fn draw_non_zero<R: Rng, D: Distribution<f64>>(
    rng: &mut R,
    dist: &D,
    policy: ZeroRedrawPolicy,
    stats: &mut ShockStats,
) -> f64 {
    let mut z = dist.sample(rng);
    let mut retries = 0;
    while z == 0.0 && retries < policy.max_redraws {
        z = dist.sample(rng);
        retries += 1;
        stats.zero_redraws += 1;
    }
    if z == 0.0 {
        stats.persistent_zeros += 1;
    }
    z
}

fn check_shape(steps: usize, assets: usize, scenarios: usize) -> EquityVarResult<()> {
    if steps == 0 || assets == 0 || scenarios == 0 {
        return Err(EquityVarError::invalid(
            "shape",
            format!("Shock tensor needs non-zero dimensions, got ({steps}, {assets}, {scenarios})"),
        ));
    }
    Ok(())
}

pub(crate) fn draw_raw_shocks_from<R: Rng, D: Distribution<f64>>(
    steps: usize,
    assets: usize,
    scenarios: usize,
    dist: &D,
    policy: ZeroRedrawPolicy,
    rng: &mut R,
) -> EquityVarResult<(Tensor3, ShockStats)> {
    check_shape(steps, assets, scenarios)?;
    let mut raw = Tensor3::zeros(steps, assets, scenarios);
    let mut stats = ShockStats {
        cells: steps * assets * scenarios,
        ..Default::default()
    };
    // One stream, filled in storage order so a seed replays exactly.
    for cell in raw.as_mut_slice() {
        *cell = draw_non_zero(rng, dist, policy, &mut stats);
    }
    if stats.persistent_zeros > 0 {
        tracing::warn!(
            persistent_zeros = stats.persistent_zeros,
            max_redraws = policy.max_redraws,
            "zero normal draws survived the redraw limit"
        );
    }
    Ok((raw, stats))
}

/// Independent N(0,1) draws for every `(step, asset, scenario)` cell.
pub fn draw_raw_shocks<R: Rng>(
    steps: usize,
    assets: usize,
    scenarios: usize,
    policy: ZeroRedrawPolicy,
    rng: &mut R,
) -> EquityVarResult<(Tensor3, ShockStats)> {
    let normal = standard_normal()?;
    draw_raw_shocks_from(steps, assets, scenarios, &normal, policy, rng)
}

/// Left-multiply every step's `assets × scenarios` block by `L`.
///
/// Each step is transformed on its own; correlation is injected across
/// assets at one instant, never across time. Steps run in parallel.
pub fn correlate_shocks(raw: &Tensor3, lower: &DecompositionOperator) -> EquityVarResult<Tensor3> {
    let (steps, assets, scenarios) = raw.shape();
    check_shape(steps, assets, scenarios)?;
    if lower.n_assets() != assets {
        return Err(EquityVarError::invalid(
            "decomposition",
            format!(
                "Operator is {n}×{n} but shocks cover {assets} assets",
                n = lower.n_assets()
            ),
        ));
    }

    let mut correlated = Tensor3::zeros(steps, assets, scenarios);
    let block = raw.step_len();
    correlated
        .as_mut_slice()
        .par_chunks_exact_mut(block)
        .zip(raw.as_slice().par_chunks_exact(block))
        .for_each(|(out, inp)| lower.apply_block(inp, out, scenarios));
    Ok(correlated)
}

/// Draw and correlate in one go.
pub fn generate_correlated_shocks<R: Rng>(
    steps: usize,
    scenarios: usize,
    lower: &DecompositionOperator,
    policy: ZeroRedrawPolicy,
    rng: &mut R,
) -> EquityVarResult<CorrelatedShocks> {
    let (raw, stats) = draw_raw_shocks(steps, lower.n_assets(), scenarios, policy, rng)?;
    let tensor = correlate_shocks(&raw, lower)?;
    tracing::debug!(steps, scenarios, assets = lower.n_assets(), "correlated shocks generated");
    Ok(CorrelatedShocks { tensor, stats })
}
