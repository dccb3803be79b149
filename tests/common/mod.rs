#![allow(dead_code)]

use async_trait::async_trait;
use augur::sources::PriceSource;
use augur::{AppError, Bar, DateRange};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic bar for a trading day: the value only depends on the date,
/// so any sequence of range fetches produces the same rows.
pub fn synthetic_bar(day: NaiveDate) -> Bar {
    let t = (day - date(2000, 1, 1)).num_days() as f64;
    let close = 100.0 + 12.0 * (t / 9.0).sin() + 4.0 * (t / 3.7).cos() + t * 0.001;
    let volume = 1_000_000 + ((t * 7.0) as u64 % 500_000);
    Bar::new(day, close - 0.5, close + 1.5, close - 1.5, close, volume)
}

/// In-memory source producing weekday bars and recording every request.
pub struct CalendarSource {
    calls: Mutex<Vec<(String, DateRange)>>,
    missing: HashSet<String>,
    broken: HashSet<NaiveDate>,
    empty: AtomicBool,
    delay_ms: u64,
}

impl CalendarSource {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            missing: HashSet::new(),
            broken: HashSet::new(),
            empty: AtomicBool::new(false),
            delay_ms: 0,
        }
    }

    /// Symbols the source has never heard of.
    pub fn with_missing(mut self, symbols: &[&str]) -> Self {
        self.missing = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Days served with an open above the high.
    pub fn with_broken_days(mut self, days: &[NaiveDate]) -> Self {
        self.broken = days.iter().copied().collect();
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Make every later request return no rows.
    pub fn go_dark(&self) {
        self.empty.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, DateRange)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ranges_for(&self, symbol: &str) -> Vec<DateRange> {
        self.calls()
            .into_iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, r)| r)
            .collect()
    }
}

#[async_trait]
impl PriceSource for CalendarSource {
    fn name(&self) -> &str {
        "calendar"
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<Bar>, AppError> {
        self.calls.lock().unwrap().push((symbol.to_string(), range));
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.empty.load(Ordering::SeqCst) || self.missing.contains(symbol) {
            return Ok(Vec::new());
        }

        let mut bars = Vec::new();
        let mut day = range.start;
        while day <= range.end {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let bar = synthetic_bar(day);
                if self.broken.contains(&day) {
                    bars.push(Bar::new(day, bar.high + 0.01, bar.high, bar.low, bar.close, bar.volume));
                } else {
                    bars.push(bar);
                }
            }
            day += Duration::days(1);
        }
        Ok(bars)
    }
}
