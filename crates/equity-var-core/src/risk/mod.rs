pub mod engine;
pub mod metrics;

pub use engine::{
    run_portfolio_risk, run_single_asset_risk, simulate_portfolio, PortfolioRiskInput,
    PortfolioRiskOutput, PortfolioSimulation, SingleAssetRiskInput, SingleAssetRiskOutput,
};
pub use metrics::{portfolio_terminal_values, LossDistribution, RiskMetrics};
