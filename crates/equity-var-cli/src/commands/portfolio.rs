use clap::Args;
use serde_json::Value;

use equity_var_core::market_data::PriceHistory;
use equity_var_core::risk::{run_portfolio_risk, PortfolioRiskInput};
use equity_var_core::RunConfig;

use super::RunArgs;
use crate::input;

/// Arguments for a correlated portfolio simulation
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to JSON input file (PortfolioRiskInput with per-asset log returns)
    #[arg(long, conflicts_with = "prices")]
    pub input: Option<String>,

    /// CSV of closing prices: `date,TICK1,TICK2,...`
    #[arg(long, requires = "shares")]
    pub prices: Option<String>,

    /// Comma-separated share counts, e.g. "GOOGL=25,MSFT=10"
    #[arg(long, value_delimiter = ',')]
    pub shares: Option<Vec<String>>,

    /// First date of the estimation window (YYYY-MM-DD)
    #[arg(long, requires = "prices")]
    pub from: Option<String>,

    /// Last date of the estimation window (YYYY-MM-DD)
    #[arg(long, requires = "prices")]
    pub to: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

fn windowed(
    history: PriceHistory,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<PriceHistory, Box<dyn std::error::Error>> {
    if from.is_none() && to.is_none() {
        return Ok(history);
    }
    let from = match from {
        Some(d) => PriceHistory::parse_date(d)?,
        None => history.first_date(),
    };
    let to = match to {
        Some(d) => PriceHistory::parse_date(d)?,
        None => history.last_date(),
    };
    Ok(history.window(from, to)?)
}

pub(crate) fn history_from_args(
    prices: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<PriceHistory, Box<dyn std::error::Error>> {
    let history = input::prices::read_price_csv(prices)?;
    let history = windowed(history, from, to)?;
    tracing::info!(
        tickers = history.tickers.len(),
        first = %history.first_date(),
        last = %history.last_date(),
        "price history loaded"
    );
    Ok(history)
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut risk_input = if let Some(ref prices) = args.prices {
        let shares = input::prices::parse_share_counts(args.shares.as_deref().unwrap_or_default())?;
        let history = history_from_args(prices, args.from.as_deref(), args.to.as_deref())?;
        PortfolioRiskInput {
            assets: history.to_asset_series(&shares)?,
            config: args.run.resolve(RunConfig::default())?,
            bands: Vec::new(),
            include_losses: false,
        }
    } else {
        let mut risk_input: PortfolioRiskInput =
            input::from_file_or_stdin(args.input.as_deref(), "a portfolio run")?;
        risk_input.config = args.run.resolve(risk_input.config)?;
        risk_input
    };
    if let Some(bands) = &args.run.bands {
        risk_input.bands = bands.clone();
    }
    risk_input.include_losses |= args.run.include_losses;

    let result = run_portfolio_risk(&risk_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_prices(name: &str) -> String {
        let mut csv = String::from("date,AAA,BBB,CCC\n");
        for i in 0..28 {
            let t = i as f64;
            csv.push_str(&format!(
                "2024-02-{:02},{:.4},{:.4},{:.4}\n",
                i + 1,
                100.0 * (0.01 * (t * 0.9).sin() + 1.0 + 0.001 * t),
                50.0 * (0.02 * (t * 1.7).cos() + 1.0),
                20.0 * (0.015 * (t * 2.9 + 0.3).sin() + 1.0 - 0.0005 * t),
            ));
        }
        let path = std::env::temp_dir().join(name);
        fs::write(&path, csv).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn args(prices: String) -> PortfolioArgs {
        PortfolioArgs {
            input: None,
            prices: Some(prices),
            shares: Some(vec!["AAA=10".into(), "BBB=20".into(), "CCC=50".into()]),
            from: None,
            to: None,
            run: RunArgs {
                scenarios: Some(300),
                horizon: Some(10),
                confidence: Some(vec![0.95]),
                seed: Some(3),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_portfolio_from_price_csv() {
        let path = write_prices("evar_portfolio_full.csv");
        let value = run_portfolio(args(path)).unwrap();
        let result = &value["result"];
        assert_eq!(result["assets"].as_array().unwrap().len(), 3);
        assert_eq!(result["metrics"].as_array().unwrap().len(), 1);
        assert_eq!(value["assumptions"]["observations"], 27);
    }

    #[test]
    fn test_window_limits_observations() {
        let path = write_prices("evar_portfolio_window.csv");
        let mut a = args(path);
        a.from = Some("2024-02-05".into());
        a.to = Some("2024-02-20".into());
        let value = run_portfolio(a).unwrap();
        assert_eq!(value["assumptions"]["observations"], 15);
    }

    #[test]
    fn test_missing_share_count_rejected() {
        let path = write_prices("evar_portfolio_missing.csv");
        let mut a = args(path);
        a.shares = Some(vec!["AAA=10".into()]);
        assert!(run_portfolio(a).is_err());
    }
}
