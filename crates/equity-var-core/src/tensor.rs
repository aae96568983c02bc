//! Flat, contiguous simulation buffers.
//!
//! Both containers are row-major. A [`PathMatrix`] is indexed `(t, scenario)`
//! at `t * scenarios + scenario`. A [`Tensor3`] is indexed
//! `(t, asset, scenario)` at `(t * assets + asset) * scenarios + scenario`,
//! so one time step is a contiguous `assets × scenarios` block and one
//! `(t, asset)` pair is a contiguous run of scenarios.

use serde::{Deserialize, Serialize};

/// Two-dimensional `(time step, scenario)` buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathMatrix {
    steps: usize,
    scenarios: usize,
    data: Vec<f64>,
}

impl PathMatrix {
    pub fn filled(steps: usize, scenarios: usize, value: f64) -> Self {
        Self {
            steps,
            scenarios,
            data: vec![value; steps * scenarios],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn scenarios(&self) -> usize {
        self.scenarios
    }

    #[inline]
    pub fn get(&self, t: usize, scenario: usize) -> f64 {
        self.data[t * self.scenarios + scenario]
    }

    #[inline]
    pub fn set(&mut self, t: usize, scenario: usize, value: f64) {
        self.data[t * self.scenarios + scenario] = value;
    }

    pub fn row(&self, t: usize) -> &[f64] {
        let start = t * self.scenarios;
        &self.data[start..start + self.scenarios]
    }

    pub fn row_mut(&mut self, t: usize) -> &mut [f64] {
        let start = t * self.scenarios;
        &mut self.data[start..start + self.scenarios]
    }

    /// Previous and current rows, borrowed together for a recurrence step.
    pub fn step_pair_mut(&mut self, t: usize) -> (&[f64], &mut [f64]) {
        debug_assert!(t >= 1 && t < self.steps);
        let (head, tail) = self.data.split_at_mut(t * self.scenarios);
        (&head[(t - 1) * self.scenarios..], &mut tail[..self.scenarios])
    }

    /// Last row.
    pub fn terminal(&self) -> &[f64] {
        self.row(self.steps - 1)
    }

    /// Copy out as nested rows, for callers that want `Vec<Vec<f64>>`.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.steps).map(|t| self.row(t).to_vec()).collect()
    }
}

/// Three-dimensional `(time step, asset, scenario)` buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor3 {
    steps: usize,
    assets: usize,
    scenarios: usize,
    data: Vec<f64>,
}

impl Tensor3 {
    pub fn zeros(steps: usize, assets: usize, scenarios: usize) -> Self {
        Self {
            steps,
            assets,
            scenarios,
            data: vec![0.0; steps * assets * scenarios],
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.steps, self.assets, self.scenarios)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn assets(&self) -> usize {
        self.assets
    }

    pub fn scenarios(&self) -> usize {
        self.scenarios
    }

    /// Size of one time-step block.
    pub fn step_len(&self) -> usize {
        self.assets * self.scenarios
    }

    #[inline]
    fn offset(&self, t: usize, asset: usize, scenario: usize) -> usize {
        debug_assert!(t < self.steps && asset < self.assets && scenario < self.scenarios);
        (t * self.assets + asset) * self.scenarios + scenario
    }

    #[inline]
    pub fn get(&self, t: usize, asset: usize, scenario: usize) -> f64 {
        self.data[self.offset(t, asset, scenario)]
    }

    #[inline]
    pub fn set(&mut self, t: usize, asset: usize, scenario: usize, value: f64) {
        let i = self.offset(t, asset, scenario);
        self.data[i] = value;
    }

    /// The `assets × scenarios` block for step `t`.
    pub fn step(&self, t: usize) -> &[f64] {
        let len = self.step_len();
        &self.data[t * len..(t + 1) * len]
    }

    pub fn step_mut(&mut self, t: usize) -> &mut [f64] {
        let len = self.step_len();
        &mut self.data[t * len..(t + 1) * len]
    }

    /// Previous and current step blocks, borrowed together.
    pub fn step_pair_mut(&mut self, t: usize) -> (&[f64], &mut [f64]) {
        debug_assert!(t >= 1 && t < self.steps);
        let len = self.step_len();
        let (head, tail) = self.data.split_at_mut(t * len);
        (&head[(t - 1) * len..], &mut tail[..len])
    }

    /// Scenarios for one `(t, asset)` pair.
    pub fn lane(&self, t: usize, asset: usize) -> &[f64] {
        let start = self.offset(t, asset, 0);
        &self.data[start..start + self.scenarios]
    }

    /// Last time step.
    pub fn terminal(&self) -> &[f64] {
        self.step(self.steps - 1)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}
