//! Parsing helpers for symbols, dates and stock lists, plus trading-day
//! resolution of the analysis date.

use crate::error::{AppError, Result};
use crate::sources::PriceSource;
use crate::types::DateRange;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Accepted analysis date layouts.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%Y%m%d"];

/// Calendar days of reference history searched for the latest session.
const SESSION_LOOKBACK_DAYS: i64 = 10;

/// Trim and upper-case a ticker.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Parse a date in any of the accepted layouts.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Unrecognised date '{}', expected YYYY-MM-DD, YYYY.MM.DD, YYYY/MM/DD or YYYYMMDD",
                input
            ))
        })
}

/// Parse a stock list into groups, one per line.
///
/// Symbols on a line are comma separated; blank lines and lines starting with
/// `#` are skipped. Symbols are normalized and de-duplicated within a group.
pub fn parse_stock_groups(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut seen = HashSet::new();
            line.split(',')
                .map(normalize_symbol)
                .filter(|s| !s.is_empty())
                .filter(|s| seen.insert(s.clone()))
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Every symbol of `groups` once, in first-seen order.
pub fn flatten_groups(groups: &[Vec<String>]) -> Vec<String> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .flatten()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Parse a stock list as one flat, de-duplicated symbol list.
pub fn parse_stock_list(text: &str) -> Vec<String> {
    flatten_groups(&parse_stock_groups(text))
}

/// Read and parse a stock list file into its line groups.
pub fn read_stock_groups(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path)?;
    let groups = parse_stock_groups(&text);
    if groups.is_empty() {
        warn!("Stock list {} is empty", path.display());
    } else {
        info!(
            "Read {} symbols in {} groups from {}",
            flatten_groups(&groups).len(),
            groups.len(),
            path.display()
        );
    }
    Ok(groups)
}

/// Resolve `date` to the latest session on or before it.
///
/// Dates after `today` are clamped to `today`. Sessions are the dates of the
/// reference symbol's daily bars over the preceding ten calendar days.
pub async fn last_trading_day(
    source: &dyn PriceSource,
    reference: &str,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<NaiveDate> {
    let target = if date > today {
        warn!("Analysis date {} is in the future, using {}", date, today);
        today
    } else {
        date
    };

    let reference = normalize_symbol(reference);
    let range = DateRange::new(target - Duration::days(SESSION_LOOKBACK_DAYS), target);
    let session = source
        .fetch(&reference, range)
        .await?
        .into_iter()
        .map(|bar| bar.date)
        .filter(|d| range.contains(*d))
        .max()
        .ok_or_else(|| AppError::DataUnavailable {
            symbol: reference.clone(),
            range,
        })?;

    if session != target {
        info!("{} is not a trading day, using {}", target, session);
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
        assert_eq!(normalize_symbol("brk.b"), "BRK.B");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-15").unwrap(), date(2024, 3, 15));
        assert_eq!(parse_date("2024.03.15").unwrap(), date(2024, 3, 15));
        assert_eq!(parse_date("2024/03/15").unwrap(), date(2024, 3, 15));
        assert_eq!(parse_date("20240315").unwrap(), date(2024, 3, 15));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("15/03/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_stock_list() {
        let text = "# indices\nSPY, qqq\n\n# tech\naapl,MSFT,,spy\n";
        assert_eq!(parse_stock_list(text), vec!["SPY", "QQQ", "AAPL", "MSFT"]);
    }

    #[test]
    fn test_parse_stock_groups_keeps_lines() {
        let text = "# indices\nSPY, qqq\n\n# tech\naapl,MSFT,,aapl, spy\n ,\n";
        assert_eq!(
            parse_stock_groups(text),
            vec![vec!["SPY", "QQQ"], vec!["AAPL", "MSFT", "SPY"]]
        );
    }

    #[test]
    fn test_flatten_groups_dedupes_across_lines() {
        let groups = vec![
            vec!["SPY".to_string(), "QQQ".to_string()],
            vec!["AAPL".to_string(), "SPY".to_string()],
        ];
        assert_eq!(flatten_groups(&groups), vec!["SPY", "QQQ", "AAPL"]);
    }

    #[test]
    fn test_read_stock_groups_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nvda\n#skip\ntsla, amd").unwrap();
        let groups = read_stock_groups(file.path()).unwrap();
        assert_eq!(groups, vec![vec!["NVDA"], vec!["TSLA", "AMD"]]);
    }

    #[test]
    fn test_read_stock_groups_missing_file() {
        let err = read_stock_groups(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
