use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::stats::percentile_sorted;
use crate::EquityVarResult;

/// VaR and Expected Shortfall at one confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub confidence: f64,
    /// Loss threshold in currency.
    pub var: f64,
    /// `var` as a percentage of the initial portfolio value.
    pub var_pct: f64,
    /// Mean loss beyond the VaR rank; `None` when too few tail scenarios exist.
    pub expected_shortfall: Option<f64>,
    pub expected_shortfall_pct: Option<f64>,
    /// Scenarios strictly worse than the VaR scenario.
    pub tail_observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_shortfall_note: Option<String>,
}

/// Per-scenario losses (initial value − terminal value), sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossDistribution {
    initial_value: f64,
    losses: Vec<f64>,
}

impl LossDistribution {
    pub fn from_terminal_values(initial_value: f64, terminal_values: &[f64]) -> EquityVarResult<Self> {
        if !(initial_value > 0.0 && initial_value.is_finite()) {
            return Err(EquityVarError::invalid(
                "initial_value",
                format!("Portfolio value must be positive, got {initial_value}"),
            ));
        }
        if terminal_values.is_empty() {
            return Err(EquityVarError::invalid(
                "terminal_values",
                "At least one scenario is required",
            ));
        }
        let mut losses: Vec<f64> = terminal_values.iter().map(|v| initial_value - v).collect();
        losses.sort_by(|a, b| a.total_cmp(b));
        Ok(Self {
            initial_value,
            losses,
        })
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    /// Sorted ascending; the worst scenario is last.
    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    /// Number of scenarios ranked beyond the VaR scenario:
    /// `round((1 − c)·(n − 1))`.
    pub fn tail_rank(&self, confidence: f64) -> EquityVarResult<usize> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(EquityVarError::invalid(
                "confidence",
                format!("Must be strictly between 0 and 1, got {confidence}"),
            ));
        }
        let n = self.losses.len();
        Ok(((1.0 - confidence) * (n - 1) as f64).round() as usize)
    }

    /// The loss with exactly `tail_rank` scenarios worse than it.
    pub fn value_at_risk(&self, confidence: f64) -> EquityVarResult<f64> {
        let k = self.tail_rank(confidence)?;
        Ok(self.losses[self.losses.len() - 1 - k])
    }

    /// Mean of the losses strictly beyond the VaR rank.
    ///
    /// Fewer than two such losses is reported as `DivisionByZero`.
    pub fn expected_shortfall(&self, confidence: f64) -> EquityVarResult<f64> {
        let k = self.tail_rank(confidence)?;
        if k < 2 {
            return Err(EquityVarError::DivisionByZero {
                context: format!(
                    "expected shortfall at {confidence}: {k} tail scenario(s) out of {}",
                    self.losses.len()
                ),
            });
        }
        let tail = &self.losses[self.losses.len() - k..];
        Ok(tail.iter().sum::<f64>() / k as f64)
    }

    /// Interpolated loss percentile, for cross-checking the rank-based VaR.
    pub fn loss_percentile(&self, p: f64) -> EquityVarResult<f64> {
        percentile_sorted(&self.losses, p)
    }

    /// Everything reported for one confidence level. An inapplicable
    /// Expected Shortfall is recorded on the result, not raised.
    pub fn metrics(&self, confidence: f64) -> EquityVarResult<RiskMetrics> {
        let var = self.value_at_risk(confidence)?;
        let tail_observations = self.tail_rank(confidence)?;
        let (expected_shortfall, note) = match self.expected_shortfall(confidence) {
            Ok(es) => (Some(es), None),
            Err(e @ EquityVarError::DivisionByZero { .. }) => (None, Some(e.to_string())),
            Err(e) => return Err(e),
        };
        Ok(RiskMetrics {
            confidence,
            var,
            var_pct: var / self.initial_value * 100.0,
            expected_shortfall,
            expected_shortfall_pct: expected_shortfall.map(|es| es / self.initial_value * 100.0),
            tail_observations,
            expected_shortfall_note: note,
        })
    }
}

/// Portfolio value per scenario from a terminal `assets × scenarios` block.
pub fn portfolio_terminal_values(
    terminal: &[f64],
    shares: &[f64],
    scenarios: usize,
) -> EquityVarResult<Vec<f64>> {
    if scenarios == 0 || terminal.len() != shares.len() * scenarios {
        return Err(EquityVarError::invalid(
            "terminal",
            format!(
                "Expected {} assets × {scenarios} scenarios, got {} cells",
                shares.len(),
                terminal.len()
            ),
        ));
    }
    Ok((0..scenarios)
        .into_par_iter()
        .map(|s| {
            shares
                .iter()
                .enumerate()
                .map(|(j, q)| terminal[j * scenarios + s] * q)
                .sum::<f64>()
        })
        .collect())
}
