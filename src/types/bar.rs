use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits kept for prices.
pub const PRICE_DECIMALS: i32 = 6;

/// Round a price to [`PRICE_DECIMALS`] fractional digits.
pub fn round_price(value: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (value * scale).round() / scale
}

/// One trading day for one symbol.
///
/// Field names serialize to the cache table header
/// (`Date,Open,High,Low,Close,Volume`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
}

impl Bar {
    /// Create a bar with prices rounded to 6 decimals.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open: round_price(open),
            high: round_price(high),
            low: round_price(low),
            close: round_price(close),
            volume,
        }
    }

    /// `low <= open, close <= high` and `low <= high`.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.high
            && self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; the bounds are swapped if given in reverse.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Days after this range up to `wanted.end`, if any.
    ///
    /// The deficit always starts right after this range so that coverage stays contiguous.
    pub fn newer_deficit(&self, wanted: &DateRange) -> Option<DateRange> {
        if self.end < wanted.end {
            Some(DateRange::new(self.end + Duration::days(1), wanted.end))
        } else {
            None
        }
    }

    /// Days from `wanted.start` up to the start of this range, if any.
    pub fn older_deficit(&self, wanted: &DateRange) -> Option<DateRange> {
        if self.start > wanted.start {
            Some(DateRange::new(wanted.start, self.start - Duration::days(1)))
        } else {
            None
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Ordered, date-unique sequence of bars for one symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub symbol: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series, sorting by date. For duplicate dates the later bar wins.
    pub fn from_bars(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        let mut series = Self {
            symbol: symbol.into(),
            bars: Vec::with_capacity(bars.len()),
        };
        series.merge(bars);
        series
    }

    /// Union with `incoming`; incoming rows replace cached rows with the same date.
    pub fn merge(&mut self, incoming: Vec<Bar>) {
        // Stable sort keeps insertion order within a date, so the last entry is the newest.
        let mut all = std::mem::take(&mut self.bars);
        all.extend(incoming);
        all.sort_by_key(|b| b.date);

        let mut merged: Vec<Bar> = Vec::with_capacity(all.len());
        for bar in all {
            match merged.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => merged.push(bar),
            }
        }
        self.bars = merged;
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Range spanned by the first and last bar.
    pub fn date_range(&self) -> Option<DateRange> {
        Some(DateRange::new(self.first_date()?, self.last_date()?))
    }

    /// Bars falling inside `range`.
    pub fn slice(&self, range: &DateRange) -> Series {
        let bars = self
            .bars
            .iter()
            .filter(|b| range.contains(b.date))
            .copied()
            .collect();
        Series {
            symbol: self.symbol.clone(),
            bars,
        }
    }

    /// Index of the bar on `date`.
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}
