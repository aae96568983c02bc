use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::EquityVarResult;

/// One holding's aligned history: daily log returns, last close, shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub ticker: String,
    pub log_returns: Vec<f64>,
    pub last_price: f64,
    pub shares: u32,
}

impl AssetSeries {
    pub fn new(ticker: impl Into<String>, log_returns: Vec<f64>, last_price: f64, shares: u32) -> Self {
        Self {
            ticker: ticker.into(),
            log_returns,
            last_price,
            shares,
        }
    }

    /// Derive log returns `ln(p_t / p_{t−1})` from closes, oldest first.
    pub fn from_closes(ticker: impl Into<String>, shares: u32, closes: &[f64]) -> EquityVarResult<Self> {
        let ticker = ticker.into();
        if closes.len() < 2 {
            return Err(EquityVarError::InsufficientData(format!(
                "{ticker}: at least 2 closing prices are required, got {}",
                closes.len()
            )));
        }
        if let Some(p) = closes.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
            return Err(EquityVarError::invalid(
                "closes",
                format!("{ticker}: prices must be positive, got {p}"),
            ));
        }
        let log_returns = closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        let last_price = closes[closes.len() - 1];
        Ok(Self {
            ticker,
            log_returns,
            last_price,
            shares,
        })
    }

    /// Market value of the holding at the last price.
    pub fn position_value(&self) -> f64 {
        self.last_price * self.shares as f64
    }

    pub fn daily_mean(&self) -> f64 {
        if self.log_returns.is_empty() {
            return 0.0;
        }
        self.log_returns.iter().sum::<f64>() / self.log_returns.len() as f64
    }

    /// Sample standard deviation of daily log returns.
    pub fn daily_volatility(&self) -> f64 {
        let n = self.log_returns.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.daily_mean();
        let ss: f64 = self.log_returns.iter().map(|r| (r - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    }

    /// `(μ, σ)` scaled to a year of `trading_days` steps.
    pub fn annualized(&self, trading_days: u32) -> (f64, f64) {
        let days = trading_days as f64;
        (self.daily_mean() * days, self.daily_volatility() * days.sqrt())
    }

    pub fn validate(&self) -> EquityVarResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(EquityVarError::invalid("ticker", "Ticker must not be empty"));
        }
        if self.log_returns.is_empty() {
            return Err(EquityVarError::invalid(
                "log_returns",
                format!("{}: return series is empty", self.ticker),
            ));
        }
        if self.log_returns.iter().any(|r| !r.is_finite()) {
            return Err(EquityVarError::invalid(
                "log_returns",
                format!("{}: return series contains non-finite values", self.ticker),
            ));
        }
        if !(self.last_price.is_finite() && self.last_price > 0.0) {
            return Err(EquityVarError::invalid(
                "last_price",
                format!("{}: must be positive, got {}", self.ticker, self.last_price),
            ));
        }
        Ok(())
    }
}

/// Check every series and that they share one length; returns that length.
pub fn validate_aligned(series: &[AssetSeries]) -> EquityVarResult<usize> {
    let first = series
        .first()
        .ok_or_else(|| EquityVarError::InsufficientData("At least one asset is required".into()))?;
    let n_days = first.log_returns.len();
    for s in series {
        s.validate()?;
        if s.log_returns.len() != n_days {
            return Err(EquityVarError::invalid(
                "log_returns",
                format!(
                    "{} has {} returns but {} has {n_days}; series must be aligned",
                    s.ticker,
                    s.log_returns.len(),
                    first.ticker
                ),
            ));
        }
    }
    Ok(n_days)
}

/// `(n_days × n_assets)` matrix, one column per series.
pub fn return_matrix(series: &[AssetSeries]) -> EquityVarResult<DMatrix<f64>> {
    let n_days = validate_aligned(series)?;
    Ok(DMatrix::from_fn(n_days, series.len(), |r, c| {
        series[c].log_returns[r]
    }))
}
