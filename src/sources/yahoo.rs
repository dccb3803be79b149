//! Yahoo Finance client for daily stock and index history.
//!
//! Uses the unofficial v8 chart endpoint with explicit epoch bounds.

use crate::error::{AppError, Result};
use crate::sources::PriceSource;
use crate::types::{Bar, DateRange};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart response.
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Normalize symbol for Yahoo Finance API.
/// Yahoo uses hyphens instead of dots for share classes (e.g., BRK-B not BRK.B)
fn normalize_yahoo_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('.', "-")
}

/// Epoch seconds at UTC midnight.
fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Convert a chart payload into bars inside `range`.
fn parse_chart(data: YahooChartResponse, range: &DateRange) -> Result<Vec<Bar>> {
    if let Some(error) = data.chart.error {
        return Err(AppError::ExternalApi(format!(
            "Yahoo API error: {} - {}",
            error.code, error.description
        )));
    }

    // No result or no timestamps means no trading days in the window.
    let Some(result) = data.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| AppError::ExternalApi("No quote data in response".to_string()))?;

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        // Skip invalid data points
        if close <= 0.0 {
            continue;
        }
        let Some(date) = DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        if !range.contains(date) {
            continue;
        }

        let open = opens.get(i).copied().flatten().unwrap_or(close);
        let high = highs.get(i).copied().flatten().unwrap_or(close);
        let low = lows.get(i).copied().flatten().unwrap_or(close);
        let volume = volumes.get(i).copied().flatten().unwrap_or(0);

        bars.push(Bar::new(date, open, high, low, close, volume));
    }

    Ok(bars)
}

/// Yahoo Finance API client.
pub struct YahooFinanceClient {
    client: Client,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self { client })
    }

    /// Fetch daily bars between two dates, inclusive.
    ///
    /// The request window is widened by a day on both sides because the
    /// upstream end bound is exclusive and timestamps sit at the exchange open;
    /// rows are filtered back to `range` afterwards.
    pub async fn get_daily_range(&self, symbol: &str, range: DateRange) -> Result<Vec<Bar>> {
        let yahoo_symbol = normalize_yahoo_symbol(symbol);
        let period1 = epoch_seconds(range.start - ChronoDuration::days(1));
        let period2 = epoch_seconds(range.end + ChronoDuration::days(1));
        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d&includePrePost=false&events=div%2Csplit",
            CHART_URL, yahoo_symbol, period1, period2
        );

        debug!("Fetching Yahoo Finance data: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Yahoo API status {} for {}",
                response.status(),
                yahoo_symbol
            )));
        }

        let data: YahooChartResponse = response.json().await?;
        parse_chart(data, &range)
    }
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<Bar>> {
        self.get_daily_range(symbol, range).await
    }
}
