pub mod percentile;

pub use percentile::{percentile, percentile_band, percentile_rows, percentile_sorted};
