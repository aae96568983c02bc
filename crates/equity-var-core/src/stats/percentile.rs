use crate::error::EquityVarError;
use crate::tensor::PathMatrix;
use crate::EquityVarResult;

/// Percentile of an unsorted sample with linear interpolation between
/// order statistics. The caller's slice is left untouched.
pub fn percentile(data: &[f64], p: f64) -> EquityVarResult<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

/// Same interpolation over an already **sorted** slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> EquityVarResult<f64> {
    if sorted.is_empty() {
        return Err(EquityVarError::invalid("data", "Sample is empty"));
    }
    check_percent(p)?;
    let idx = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let frac = idx - lo as f64;
    if lo + 1 < sorted.len() {
        Ok(sorted[lo] + frac * (sorted[lo + 1] - sorted[lo]))
    } else {
        Ok(sorted[lo])
    }
}

/// Row-wise percentile. Empty rows map to 0.0 so a partially populated
/// grid can still be plotted.
pub fn percentile_rows(rows: &[Vec<f64>], p: f64) -> EquityVarResult<Vec<f64>> {
    check_percent(p)?;
    rows.iter()
        .map(|row| {
            if row.is_empty() {
                Ok(0.0)
            } else {
                percentile(row, p)
            }
        })
        .collect()
}

/// One percentile per time step across all scenarios of a path matrix.
pub fn percentile_band(paths: &PathMatrix, p: f64) -> EquityVarResult<Vec<f64>> {
    check_percent(p)?;
    (0..paths.steps())
        .map(|t| {
            let row = paths.row(t);
            if row.is_empty() {
                Ok(0.0)
            } else {
                percentile(row, p)
            }
        })
        .collect()
}

fn check_percent(p: f64) -> EquityVarResult<()> {
    if !(0.0..=100.0).contains(&p) {
        return Err(EquityVarError::invalid(
            "percentile",
            format!("Must be within [0, 100], got {p}"),
        ));
    }
    Ok(())
}
