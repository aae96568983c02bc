use equity_var_core::market_data::PriceHistory;

use crate::input::file;

/// Read a closing-price CSV: a `date` column followed by one column per ticker.
///
/// ```text
/// date,GOOGL,MSFT
/// 2024-01-02,139.56,370.87
/// 2024-01-03,140.36,370.60
/// ```
pub fn read_price_csv(path: &str) -> Result<PriceHistory, Box<dyn std::error::Error>> {
    let (canonical, contents) = file::read_to_string(path)?;
    parse_price_csv(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

pub fn parse_price_csv(contents: &str) -> Result<PriceHistory, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err("Expected a date column and at least one ticker column".into());
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut dates = Vec::new();
    let mut closes: Vec<Vec<f64>> = vec![Vec::new(); tickers.len()];
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let row = line + 2;
        let date = record
            .get(0)
            .ok_or_else(|| format!("Row {row}: missing date"))?;
        dates.push(PriceHistory::parse_date(date)?);
        for (j, series) in closes.iter_mut().enumerate() {
            let cell = record
                .get(j + 1)
                .ok_or_else(|| format!("Row {row}: missing price for {}", tickers[j]))?;
            let price: f64 = cell
                .parse()
                .map_err(|e| format!("Row {row}, {}: '{cell}' {e}", tickers[j]))?;
            series.push(price);
        }
    }

    tracing::debug!(rows = dates.len(), tickers = tickers.len(), "price CSV parsed");
    Ok(PriceHistory::new(dates, tickers, closes)?)
}

/// Parse `TICK=N` share counts, as given to `--shares`.
pub fn parse_share_counts(items: &[String]) -> Result<Vec<(String, u32)>, Box<dyn std::error::Error>> {
    items
        .iter()
        .map(|item| {
            let (ticker, count) = item
                .split_once('=')
                .ok_or_else(|| format!("Expected TICKER=SHARES, got '{item}'"))?;
            let count: u32 = count
                .trim()
                .parse()
                .map_err(|e| format!("Invalid share count in '{item}': {e}"))?;
            Ok((ticker.trim().to_string(), count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "date,AAA,BBB\n\
                       2024-01-02,100.0,50.0\n\
                       2024-01-03,101.0,49.0\n\
                       2024-01-04, 99.5,49.5\n";

    #[test]
    fn test_parse_price_csv() {
        let history = parse_price_csv(CSV).unwrap();
        assert_eq!(history.tickers, vec!["AAA", "BBB"]);
        assert_eq!(history.dates.len(), 3);
        assert_eq!(history.closes[0], vec![100.0, 101.0, 99.5]);
    }

    #[test]
    fn test_bad_price_cell() {
        let csv = "date,AAA\n2024-01-02,100\n2024-01-03,n/a\n";
        let err = parse_price_csv(csv).unwrap_err().to_string();
        assert!(err.contains("Row 3"), "{err}");
    }

    #[test]
    fn test_parse_share_counts() {
        let parsed = parse_share_counts(&["AAA=10".into(), " BBB = 3".into()]).unwrap();
        assert_eq!(parsed, vec![("AAA".to_string(), 10), ("BBB".to_string(), 3)]);
        assert!(parse_share_counts(&["AAA:10".into()]).is_err());
        assert!(parse_share_counts(&["AAA=-1".into()]).is_err());
    }
}
