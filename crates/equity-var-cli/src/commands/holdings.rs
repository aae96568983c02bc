use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use equity_var_core::holdings::{Equity, Portfolio};

use crate::input;

/// Arguments for valuing holdings
#[derive(Args)]
pub struct HoldingsArgs {
    /// Path to JSON file: [{"ticker": "...", "shares": N, "price": "..."}, ...]
    #[arg(long)]
    pub input: Option<String>,

    /// Holding as TICKER:SHARES:PRICE (repeatable)
    #[arg(long = "holding")]
    pub holdings: Vec<String>,

    /// Ticker to drop before valuing (repeatable)
    #[arg(long)]
    pub remove: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HoldingLine {
    ticker: String,
    shares: u32,
    price: Decimal,
    value: Decimal,
}

#[derive(Debug, Serialize)]
struct HoldingsOutput {
    total_value: Decimal,
    positions: usize,
    holdings: Vec<HoldingLine>,
}

fn parse_holding(item: &str) -> Result<Equity, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = item.split(':').map(str::trim).collect();
    let [ticker, shares, price] = parts.as_slice() else {
        return Err(format!("Expected TICKER:SHARES:PRICE, got '{item}'").into());
    };
    let shares: u32 = shares
        .parse()
        .map_err(|e| format!("Invalid share count in '{item}': {e}"))?;
    let price: Decimal = price
        .parse()
        .map_err(|e| format!("Invalid price in '{item}': {e}"))?;
    Ok(Equity::new(*ticker, shares, price)?)
}

pub fn run_holdings(args: HoldingsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let equities: Vec<Equity> = if !args.holdings.is_empty() {
        args.holdings
            .iter()
            .map(|h| parse_holding(h))
            .collect::<Result<_, _>>()?
    } else {
        let raw: Vec<Equity> = input::from_file_or_stdin(args.input.as_deref(), "holdings")?;
        // re-validate anything that came in through serde
        raw.into_iter()
            .map(|e| Equity::new(e.ticker, e.shares, e.price))
            .collect::<Result<_, _>>()?
    };

    let mut portfolio = Portfolio::new(equities);
    for ticker in &args.remove {
        portfolio.remove_equity(ticker);
    }

    let holdings = portfolio
        .iter()
        .map(|e| HoldingLine {
            ticker: e.ticker.clone(),
            shares: e.shares,
            price: e.price,
            value: e.shares_value(),
        })
        .collect();

    Ok(serde_json::to_value(HoldingsOutput {
        total_value: portfolio.total_value(),
        positions: portfolio.len(),
        holdings,
    })?)
}
