pub mod multi_asset;
pub mod shocks;
pub mod single_asset;

use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::error::EquityVarError;
use crate::EquityVarResult;

/// One explicit RNG per run: seeded when a seed is given, from entropy otherwise.
pub fn run_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// N(0, 1).
pub(crate) fn standard_normal() -> EquityVarResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| EquityVarError::NumericalError(format!(
        "Cannot build standard normal distribution: {e}"
    )))
}
