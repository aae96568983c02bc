use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use equity_var_core::config::TRADING_DAYS_PER_YEAR;
use equity_var_core::covariance::{CovarianceModel, CovarianceReport};

use super::portfolio::history_from_args;
use crate::input;

/// Arguments for the covariance / Cholesky report
#[derive(Args)]
pub struct CovarianceArgs {
    /// Path to JSON input file: {"tickers": [...], "returns": [[...], ...]}
    #[arg(long, conflicts_with = "prices")]
    pub input: Option<String>,

    /// CSV of closing prices: `date,TICK1,TICK2,...`
    #[arg(long)]
    pub prices: Option<String>,

    /// First date of the estimation window (YYYY-MM-DD)
    #[arg(long, requires = "prices")]
    pub from: Option<String>,

    /// Last date of the estimation window (YYYY-MM-DD)
    #[arg(long, requires = "prices")]
    pub to: Option<String>,

    /// Annualization constant
    #[arg(long)]
    pub trading_days: Option<u32>,
}

/// One daily log-return series per asset, all the same length.
#[derive(Debug, Deserialize)]
struct CovarianceInput {
    #[serde(default)]
    tickers: Vec<String>,
    returns: Vec<Vec<f64>>,
    #[serde(default)]
    trading_days_per_year: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CovarianceOutput {
    tickers: Vec<String>,
    #[serde(flatten)]
    report: CovarianceReport,
}

pub fn run_covariance(args: CovarianceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cov_input = if let Some(ref prices) = args.prices {
        let history = history_from_args(prices, args.from.as_deref(), args.to.as_deref())?;
        CovarianceInput {
            returns: history.log_returns(),
            tickers: history.tickers,
            trading_days_per_year: None,
        }
    } else {
        input::from_file_or_stdin(args.input.as_deref(), "a covariance report")?
    };

    let trading_days = args
        .trading_days
        .or(cov_input.trading_days_per_year)
        .unwrap_or(TRADING_DAYS_PER_YEAR);
    if trading_days == 0 {
        return Err("--trading-days must be positive".into());
    }
    let tickers = if cov_input.tickers.is_empty() {
        (1..=cov_input.returns.len()).map(|i| format!("ASSET{i}")).collect()
    } else if cov_input.tickers.len() == cov_input.returns.len() {
        cov_input.tickers
    } else {
        return Err(format!(
            "{} tickers given for {} return series",
            cov_input.tickers.len(),
            cov_input.returns.len()
        )
        .into());
    };

    let columns: Vec<&[f64]> = cov_input.returns.iter().map(Vec::as_slice).collect();
    let model = CovarianceModel::from_columns(&columns, trading_days)?;
    let report = model.report()?;
    Ok(serde_json::to_value(CovarianceOutput { tickers, report })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_json_file() {
        let path = std::env::temp_dir().join("evar_covariance_input.json");
        std::fs::write(
            &path,
            r#"{"tickers": ["A", "B"],
                "returns": [[0.01, -0.02, 0.015, 0.003], [0.002, 0.004, -0.01, 0.007]]}"#,
        )
        .unwrap();
        let value = run_covariance(CovarianceArgs {
            input: Some(path.to_string_lossy().into_owned()),
            prices: None,
            from: None,
            to: None,
            trading_days: None,
        })
        .unwrap();
        assert_eq!(value["tickers"][1], "B");
        assert_eq!(value["observations"], 4);
        assert_eq!(value["cholesky_lower"][0][1], 0.0);
        assert_eq!(value["correlation"][0][0].as_f64().unwrap().round(), 1.0);
    }
}
