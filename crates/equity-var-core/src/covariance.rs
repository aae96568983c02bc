//! Return covariance and its Cholesky factor.
//!
//! The factor `L` (lower triangular, `L·Lᵗ = Σ`) is the operator that turns
//! independent standard normals into shocks with covariance `Σ`.

use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::EquityVarResult;

/// Sample statistics of an `(n_days × n_assets)` log-return matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceModel {
    /// Per-asset daily mean log return. Deliberately not annualized here;
    /// drift derivation scales it once.
    pub mean: DVector<f64>,
    /// Annualized sample covariance.
    pub covariance: DMatrix<f64>,
    pub trading_days_per_year: u32,
    pub observations: usize,
}

impl CovarianceModel {
    /// Build from a return matrix with one row per day and one column per asset.
    pub fn from_returns(returns: &DMatrix<f64>, trading_days_per_year: u32) -> EquityVarResult<Self> {
        let (n_days, n_assets) = returns.shape();
        if n_assets == 0 {
            return Err(EquityVarError::InsufficientData(
                "At least one asset is required".into(),
            ));
        }
        if n_days < 2 {
            return Err(EquityVarError::InsufficientData(format!(
                "At least 2 return observations are required, got {n_days}"
            )));
        }
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(EquityVarError::invalid(
                "returns",
                "Return matrix contains non-finite values",
            ));
        }

        let mean = DVector::from_iterator(n_assets, returns.column_iter().map(|c| c.mean()));

        let mut centered = returns.clone();
        for (j, mut col) in centered.column_iter_mut().enumerate() {
            col.add_scalar_mut(-mean[j]);
        }
        let sample_cov = centered.tr_mul(&centered) / (n_days - 1) as f64;
        let covariance = sample_cov * trading_days_per_year as f64;

        Ok(Self {
            mean,
            covariance,
            trading_days_per_year,
            observations: n_days,
        })
    }

    /// Build from per-asset return columns, which must all share one length.
    pub fn from_columns(columns: &[&[f64]], trading_days_per_year: u32) -> EquityVarResult<Self> {
        let n_days = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some((i, c)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_days) {
            return Err(EquityVarError::invalid(
                "returns",
                format!(
                    "Series {i} has {} observations, expected {n_days}",
                    c.len()
                ),
            ));
        }
        let matrix = DMatrix::from_fn(n_days, columns.len(), |r, c| columns[c][r]);
        Self::from_returns(&matrix, trading_days_per_year)
    }

    pub fn n_assets(&self) -> usize {
        self.mean.len()
    }

    /// Daily mean scaled to a year.
    pub fn annualized_mean(&self) -> DVector<f64> {
        &self.mean * self.trading_days_per_year as f64
    }

    /// Annualized per-asset variance (the covariance diagonal).
    pub fn variances(&self) -> DVector<f64> {
        self.covariance.diagonal()
    }

    pub fn volatilities(&self) -> DVector<f64> {
        self.variances().map(f64::sqrt)
    }

    /// `ρ_ij = Σ_ij / (σ_i σ_j)`; zero-variance assets get zero correlation
    /// off the diagonal.
    pub fn correlation(&self) -> DMatrix<f64> {
        let vols = self.volatilities();
        let n = self.n_assets();
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                1.0
            } else if vols[i] > 0.0 && vols[j] > 0.0 {
                self.covariance[(i, j)] / (vols[i] * vols[j])
            } else {
                0.0
            }
        })
    }

    /// Cholesky factor of the annualized covariance.
    pub fn decompose(&self) -> EquityVarResult<DecompositionOperator> {
        DecompositionOperator::new(&self.covariance)
    }

    /// Plain nested-vector view for reporting.
    pub fn report(&self) -> EquityVarResult<CovarianceReport> {
        let lower = self.decompose()?;
        Ok(CovarianceReport {
            observations: self.observations,
            trading_days_per_year: self.trading_days_per_year,
            daily_mean: self.mean.iter().copied().collect(),
            annualized_volatility: self.volatilities().iter().copied().collect(),
            covariance: to_rows(&self.covariance),
            correlation: to_rows(&self.correlation()),
            cholesky_lower: to_rows(lower.lower()),
        })
    }
}

/// Serializable summary of a covariance build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovarianceReport {
    pub observations: usize,
    pub trading_days_per_year: u32,
    pub daily_mean: Vec<f64>,
    pub annualized_volatility: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub correlation: Vec<Vec<f64>>,
    pub cholesky_lower: Vec<Vec<f64>>,
}

fn to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

/// Lower-triangular `L` with `L·Lᵗ = Σ`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionOperator {
    lower: DMatrix<f64>,
}

impl DecompositionOperator {
    /// Factor a covariance matrix. Fails if it is not square, not finite, or
    /// not positive definite; no operator is built in that case.
    pub fn new(covariance: &DMatrix<f64>) -> EquityVarResult<Self> {
        if !covariance.is_square() || covariance.nrows() == 0 {
            return Err(EquityVarError::invalid(
                "covariance",
                format!("Expected a non-empty square matrix, got {:?}", covariance.shape()),
            ));
        }
        if covariance.iter().any(|v| !v.is_finite()) {
            return Err(EquityVarError::NumericalError(
                "covariance matrix contains non-finite values".into(),
            ));
        }
        let chol = Cholesky::new(covariance.clone()).ok_or_else(|| {
            EquityVarError::NumericalError("covariance matrix is not positive definite".into())
        })?;
        let lower = chol.l();
        tracing::debug!(n_assets = lower.nrows(), "covariance decomposed");
        Ok(Self { lower })
    }

    /// Wrap an existing lower-triangular factor, e.g. a singular one for a
    /// perfectly correlated pair that `new` would refuse.
    pub fn from_lower(lower: DMatrix<f64>) -> EquityVarResult<Self> {
        if !lower.is_square() || lower.nrows() == 0 {
            return Err(EquityVarError::invalid(
                "lower",
                format!("Expected a non-empty square matrix, got {:?}", lower.shape()),
            ));
        }
        let n = lower.nrows();
        for i in 0..n {
            for j in (i + 1)..n {
                if lower[(i, j)] != 0.0 {
                    return Err(EquityVarError::invalid(
                        "lower",
                        format!("Entry ({i},{j}) above the diagonal is non-zero"),
                    ));
                }
            }
        }
        if lower.iter().any(|v| !v.is_finite()) {
            return Err(EquityVarError::invalid("lower", "Contains non-finite values"));
        }
        Ok(Self { lower })
    }

    /// `L = I`, i.e. uncorrelated unit-variance shocks.
    pub fn identity(n_assets: usize) -> Self {
        Self {
            lower: DMatrix::identity(n_assets, n_assets),
        }
    }

    pub fn n_assets(&self) -> usize {
        self.lower.nrows()
    }

    pub fn lower(&self) -> &DMatrix<f64> {
        &self.lower
    }

    /// `L·Lᵗ`
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.lower * self.lower.transpose()
    }

    /// `out = L · raw` on one row-major `assets × scenarios` block.
    pub fn apply_block(&self, raw: &[f64], out: &mut [f64], scenarios: usize) {
        let n = self.n_assets();
        debug_assert_eq!(raw.len(), n * scenarios);
        debug_assert_eq!(out.len(), n * scenarios);
        for i in 0..n {
            let dst = &mut out[i * scenarios..(i + 1) * scenarios];
            dst.fill(0.0);
            for j in 0..=i {
                let l_ij = self.lower[(i, j)];
                if l_ij == 0.0 {
                    continue;
                }
                let src = &raw[j * scenarios..(j + 1) * scenarios];
                for (d, &z) in dst.iter_mut().zip(src) {
                    *d += l_ij * z;
                }
            }
        }
    }
}
