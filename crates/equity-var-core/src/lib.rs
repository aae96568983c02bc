pub mod config;
pub mod covariance;
pub mod error;
pub mod risk;
pub mod series;
pub mod simulation;
pub mod stats;
pub mod tensor;
pub mod types;

#[cfg(feature = "holdings")]
pub mod holdings;

#[cfg(feature = "market_data")]
pub mod market_data;

pub use config::RunConfig;
pub use error::EquityVarError;
pub use series::AssetSeries;
pub use types::*;

/// Standard result type for all equity-var operations
pub type EquityVarResult<T> = Result<T, EquityVarError>;
