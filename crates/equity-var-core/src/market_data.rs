//! Aligned closing-price histories and their conversion into [`AssetSeries`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::series::AssetSeries;
use crate::EquityVarResult;

/// Closing prices for several tickers over one shared, ascending date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// `closes[j]` is the series for `tickers[j]`, one value per date.
    pub closes: Vec<Vec<f64>>,
}

impl PriceHistory {
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, closes: Vec<Vec<f64>>) -> EquityVarResult<Self> {
        let history = Self {
            dates,
            tickers,
            closes,
        };
        history.validate()?;
        Ok(history)
    }

    /// Parse `YYYY-MM-DD` dates.
    pub fn parse_date(s: &str) -> EquityVarResult<NaiveDate> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| EquityVarError::DateError(format!("'{s}': {e}")))
    }

    fn validate(&self) -> EquityVarResult<()> {
        if self.tickers.is_empty() {
            return Err(EquityVarError::InsufficientData("No tickers in price history".into()));
        }
        if self.tickers.len() != self.closes.len() {
            return Err(EquityVarError::invalid(
                "closes",
                format!("{} tickers but {} price series", self.tickers.len(), self.closes.len()),
            ));
        }
        if self.dates.len() < 2 {
            return Err(EquityVarError::InsufficientData(format!(
                "At least 2 dates are required, got {}",
                self.dates.len()
            )));
        }
        if let Some(w) = self.dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(EquityVarError::DateError(format!(
                "Dates must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }
        for (ticker, series) in self.tickers.iter().zip(&self.closes) {
            if let Some(p) = series.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
                return Err(EquityVarError::invalid(
                    "closes",
                    format!("{ticker}: prices must be positive, got {p}"),
                ));
            }
            if series.len() != self.dates.len() {
                return Err(EquityVarError::invalid(
                    "closes",
                    format!(
                        "{ticker} has {} prices for {} dates",
                        series.len(),
                        self.dates.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Daily log returns per ticker, `ln(p_t / p_{t−1})`, one fewer than dates.
    pub fn log_returns(&self) -> Vec<Vec<f64>> {
        self.closes
            .iter()
            .map(|c| c.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
            .collect()
    }

    /// Keep only dates within `[from, to]`.
    pub fn window(&self, from: NaiveDate, to: NaiveDate) -> EquityVarResult<Self> {
        let keep: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= from && **d <= to)
            .map(|(i, _)| i)
            .collect();
        Self::new(
            keep.iter().map(|&i| self.dates[i]).collect(),
            self.tickers.clone(),
            self.closes
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
        )
    }

    /// One aligned [`AssetSeries`] per ticker. `shares` is looked up by ticker;
    /// every ticker must have an entry.
    pub fn to_asset_series(&self, shares: &[(String, u32)]) -> EquityVarResult<Vec<AssetSeries>> {
        self.tickers
            .iter()
            .zip(&self.closes)
            .map(|(ticker, closes)| {
                let held = shares
                    .iter()
                    .find(|(t, _)| t == ticker)
                    .map(|(_, n)| *n)
                    .ok_or_else(|| {
                        EquityVarError::invalid("shares", format!("No share count for {ticker}"))
                    })?;
                AssetSeries::from_closes(ticker.clone(), held, closes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        PriceHistory::parse_date(s).unwrap()
    }

    fn history() -> PriceHistory {
        PriceHistory::new(
            vec![d("2024-01-02"), d("2024-01-03"), d("2024-01-04"), d("2024-01-05")],
            vec!["AAA".into(), "BBB".into()],
            vec![vec![100.0, 101.0, 99.5, 102.0], vec![50.0, 49.0, 49.5, 51.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_asset_series_conversion() {
        let series = history()
            .to_asset_series(&[("BBB".into(), 20), ("AAA".into(), 5)])
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].ticker, "AAA");
        assert_eq!(series[0].shares, 5);
        assert_eq!(series[0].log_returns.len(), 3);
        assert_eq!(series[1].last_price, 51.0);
    }

    #[test]
    fn test_log_returns() {
        let r = history().log_returns();
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].len(), 3);
        assert!((r[0][0] - (1.01f64).ln()).abs() < 1e-15);
        assert!((r[1][0] - (0.98f64).ln()).abs() < 1e-15);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        assert!(PriceHistory::new(
            vec![d("2024-01-02"), d("2024-01-03")],
            vec!["AAA".into()],
            vec![vec![1.0, 0.0]],
        )
        .is_err());
    }

    #[test]
    fn test_missing_share_count() {
        assert!(history().to_asset_series(&[("AAA".into(), 5)]).is_err());
    }

    #[test]
    fn test_unsorted_dates_rejected() {
        let err = PriceHistory::new(
            vec![d("2024-01-03"), d("2024-01-02")],
            vec!["AAA".into()],
            vec![vec![1.0, 2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, EquityVarError::DateError(_)));
    }

    #[test]
    fn test_bad_date_string() {
        assert!(matches!(
            PriceHistory::parse_date("03/01/2024"),
            Err(EquityVarError::DateError(_))
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(PriceHistory::new(
            vec![d("2024-01-02"), d("2024-01-03")],
            vec!["AAA".into()],
            vec![vec![1.0]],
        )
        .is_err());
    }

    #[test]
    fn test_window() {
        let w = history().window(d("2024-01-03"), d("2024-01-05")).unwrap();
        assert_eq!(w.first_date(), d("2024-01-03"));
        assert_eq!(w.last_date(), d("2024-01-05"));
        assert_eq!(w.closes[0], vec![101.0, 99.5, 102.0]);
    }
}
