mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::covariance::CovarianceArgs;
use commands::holdings::HoldingsArgs;
use commands::percentile::PercentileArgs;
use commands::portfolio::PortfolioArgs;
use commands::single::SingleArgs;
use logging::LogLevel;

/// Correlated Monte Carlo Value-at-Risk for equity portfolios
#[derive(Parser)]
#[command(
    name = "evar",
    version,
    about = "Correlated Monte Carlo Value-at-Risk for equity portfolios",
    long_about = "Simulates correlated Geometric Brownian Motion price paths from \
                  historical log returns (Cholesky-decomposed covariance) and reports \
                  Value-at-Risk and Expected Shortfall at the requested confidence levels."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Single-asset GBM VaR/ES from drift and volatility
    Single(SingleArgs),
    /// Correlated multi-asset VaR/ES from return histories or closing prices
    Portfolio(PortfolioArgs),
    /// Annualized covariance, correlation and Cholesky factor of returns
    Covariance(CovarianceArgs),
    /// Linear-interpolated percentile of a sample
    Percentile(PercentileArgs),
    /// Value a set of holdings
    Holdings(HoldingsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.log_json);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Single(args) => commands::single::run_single(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Covariance(args) => commands::covariance::run_covariance(args),
        Commands::Percentile(args) => commands::percentile::run_percentile(args),
        Commands::Holdings(args) => commands::holdings::run_holdings(args),
        Commands::Version => {
            println!("evar {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
