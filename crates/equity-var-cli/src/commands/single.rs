use clap::Args;
use serde_json::Value;

use equity_var_core::risk::{run_single_asset_risk, SingleAssetRiskInput};
use equity_var_core::{AssetSeries, RunConfig};

use super::RunArgs;
use crate::input;

/// Arguments for a single-asset simulation
#[derive(Args)]
pub struct SingleArgs {
    /// Path to JSON input file (SingleAssetRiskInput)
    #[arg(long)]
    pub input: Option<String>,

    /// Ticker label for the output
    #[arg(long)]
    pub ticker: Option<String>,

    /// Last observed price
    #[arg(long)]
    pub price: Option<f64>,

    /// Number of shares held
    #[arg(long)]
    pub shares: Option<u32>,

    /// Mean daily log return
    #[arg(long, allow_hyphen_values = true)]
    pub mean: Option<f64>,

    /// Standard deviation of daily log returns
    #[arg(long)]
    pub volatility: Option<f64>,

    /// Comma-separated closing prices, oldest first; derives price, mean and volatility
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["price", "mean", "volatility"])]
    pub closes: Option<Vec<f64>>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Build the input from flags. Daily statistics are annualized with the
/// resolved day count.
fn from_flags(
    args: &SingleArgs,
    shares: u32,
    config: RunConfig,
) -> Result<SingleAssetRiskInput, Box<dyn std::error::Error>> {
    let ticker = args.ticker.clone().unwrap_or_else(|| "ASSET".to_string());

    if let Some(closes) = &args.closes {
        let series = AssetSeries::from_closes(ticker, shares, closes)?;
        return Ok(SingleAssetRiskInput::from_series(&series, config));
    }

    match (args.price, args.mean, args.volatility) {
        (Some(price), Some(mean), Some(vol)) => {
            let days = config.trading_days_per_year as f64;
            Ok(SingleAssetRiskInput {
                ticker: Some(ticker),
                last_price: price,
                shares,
                annual_drift: mean * days,
                annual_volatility: vol * days.sqrt(),
                config,
                bands: Vec::new(),
                include_losses: false,
            })
        }
        _ => Err("--shares needs either --closes or all of --price, --mean, --volatility".into()),
    }
}

pub fn run_single(args: SingleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut risk_input = match args.shares {
        Some(shares) => {
            let config = args.run.resolve(RunConfig::default())?;
            from_flags(&args, shares, config)?
        }
        None => {
            let mut risk_input: SingleAssetRiskInput =
                input::from_file_or_stdin(args.input.as_deref(), "a single-asset run")?;
            risk_input.config = args.run.resolve(risk_input.config)?;
            risk_input
        }
    };
    if let Some(bands) = &args.run.bands {
        risk_input.bands = bands.clone();
    }
    risk_input.include_losses |= args.run.include_losses;

    let result = run_single_asset_risk(&risk_input)?;
    Ok(serde_json::to_value(result)?)
}
