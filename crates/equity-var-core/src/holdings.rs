use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EquityVarError;
use crate::types::Money;
use crate::EquityVarResult;

/// A block of shares in one ticker at a quoted price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equity {
    pub ticker: String,
    pub shares: u32,
    pub price: Money,
}

impl Equity {
    pub fn new(ticker: impl Into<String>, shares: u32, price: Money) -> EquityVarResult<Self> {
        let ticker = ticker.into();
        if ticker.trim().is_empty() {
            return Err(EquityVarError::invalid("ticker", "Ticker must not be empty"));
        }
        if price < Decimal::ZERO {
            return Err(EquityVarError::invalid(
                "price",
                format!("{ticker}: price must be non-negative, got {price}"),
            ));
        }
        tracing::debug!(%ticker, shares, %price, "equity created");
        Ok(Self {
            ticker,
            shares,
            price,
        })
    }

    /// Price × shares.
    pub fn shares_value(&self) -> Money {
        self.price * Decimal::from(self.shares)
    }
}

/// A static collection of holdings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    equities: Vec<Equity>,
}

impl Portfolio {
    pub fn new(equities: impl IntoIterator<Item = Equity>) -> Self {
        let equities: Vec<Equity> = equities.into_iter().collect();
        tracing::info!(holdings = equities.len(), "portfolio created");
        Self { equities }
    }

    pub fn add_equity(&mut self, equity: Equity) {
        tracing::info!(ticker = %equity.ticker, "equity added to portfolio");
        self.equities.push(equity);
    }

    /// Drop every holding in `ticker`; returns how many were removed.
    pub fn remove_equity(&mut self, ticker: &str) -> usize {
        let before = self.equities.len();
        self.equities.retain(|e| e.ticker != ticker);
        let removed = before - self.equities.len();
        if removed > 0 {
            tracing::info!(ticker, removed, "equity removed from portfolio");
        } else {
            tracing::warn!(ticker, "no holding to remove");
        }
        removed
    }

    pub fn total_value(&self) -> Money {
        self.equities.iter().map(Equity::shares_value).sum()
    }

    pub fn len(&self) -> usize {
        self.equities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Equity> {
        self.equities.iter()
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.equities.iter().map(|e| e.ticker.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a Portfolio {
    type Item = &'a Equity;
    type IntoIter = std::slice::Iter<'a, Equity>;

    fn into_iter(self) -> Self::IntoIter {
        self.equities.iter()
    }
}
