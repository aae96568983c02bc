use clap::Args;
use serde::Serialize;
use serde_json::Value;

use equity_var_core::stats::percentile;

use crate::input;

/// Arguments for a percentile query
#[derive(Args)]
pub struct PercentileArgs {
    /// Path to JSON file holding an array of numbers
    #[arg(long, conflicts_with = "values")]
    pub input: Option<String>,

    /// Comma-separated sample values
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub values: Option<Vec<f64>>,

    /// Comma-separated percentiles in [0, 100]
    #[arg(long, value_delimiter = ',', default_value = "50")]
    pub p: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct PercentilePoint {
    percentile: f64,
    value: f64,
}

#[derive(Debug, Serialize)]
struct PercentileOutput {
    observations: usize,
    results: Vec<PercentilePoint>,
}

pub fn run_percentile(args: PercentileArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let values: Vec<f64> = match args.values {
        Some(v) => v,
        None => input::from_file_or_stdin(args.input.as_deref(), "a percentile query")?,
    };

    let results = args
        .p
        .iter()
        .map(|&p| {
            Ok(PercentilePoint {
                percentile: p,
                value: percentile(&values, p)?,
            })
        })
        .collect::<Result<Vec<_>, equity_var_core::EquityVarError>>()?;

    Ok(serde_json::to_value(PercentileOutput {
        observations: values.len(),
        results,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_from_flags() {
        let value = run_percentile(PercentileArgs {
            input: None,
            values: Some(vec![1.0, 2.0, 3.0, 4.0]),
            p: vec![50.0, 100.0],
        })
        .unwrap();
        assert_eq!(value["observations"], 4);
        assert_eq!(value["results"][0]["value"], 2.5);
        assert_eq!(value["results"][1]["value"], 4.0);
    }

    #[test]
    fn test_out_of_range_percentile() {
        let result = run_percentile(PercentileArgs {
            input: None,
            values: Some(vec![1.0]),
            p: vec![101.0],
        });
        assert!(result.is_err());
    }
}
