//! Gap-aware per-symbol daily price cache.
//!
//! Each symbol owns `{SYMBOL}.csv` (the bars) and `{SYMBOL}.meta.json` (the
//! calendar range the cache is known to cover). A request fetches only the
//! missing sub-ranges from the [`PriceSource`], merges by date and replaces both
//! files through a temporary file and a rename, so readers never observe a
//! partially written table.

use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::services::params::normalize_symbol;
use crate::services::validation::{validate_bars, ValidationReport};
use crate::sources::PriceSource;
use crate::types::{Bar, DateRange, Series};
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A persisted series plus the date range it is known to cover.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub series: Series,
    pub coverage: DateRange,
}

/// Per-symbol daily bar cache backed by flat CSV tables.
pub struct SeriesStore {
    cache_dir: PathBuf,
    source: Arc<dyn PriceSource>,
    max_gap_days: i64,
    /// Single-writer lock per symbol.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SeriesStore {
    /// Create a store, creating the cache directory if needed.
    pub fn new(config: &StoreConfig, source: Arc<dyn PriceSource>) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)?;
        Ok(Self {
            cache_dir: config.cache_dir.clone(),
            source,
            max_gap_days: config.max_gap_days,
            locks: DashMap::new(),
        })
    }

    /// Sanitized file stem for a symbol.
    fn file_stem(symbol: &str) -> String {
        normalize_symbol(symbol).replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
    }

    /// Path of the bar table for a symbol.
    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", Self::file_stem(symbol)))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.meta.json", Self::file_stem(symbol)))
    }

    fn lock_for(&self, symbol: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return a series covering `range`, fetching only what the cache lacks.
    ///
    /// A sub-range the source has no rows for fails the call and leaves the
    /// cache untouched. An unreadable or inconsistent cache is rebuilt from a
    /// full fetch of `range`.
    pub async fn get(&self, symbol: &str, range: DateRange) -> Result<Series> {
        let symbol = normalize_symbol(symbol);
        let lock = self.lock_for(&symbol);
        let _guard = lock.lock().await;

        let cached = match self.load(&symbol) {
            Ok(record) => record,
            Err(e) => {
                warn!("Cache for {} is unusable ({}), rebuilding {}", symbol, e, range);
                None
            }
        };

        let Some(CacheRecord {
            mut series,
            mut coverage,
        }) = cached
        else {
            let bars = self.fetch_range(&symbol, range).await?;
            let series = Series::from_bars(symbol.as_str(), bars);
            self.flag(&series);
            self.persist(&series, &range)?;
            info!("Cached {} bars for {} ({})", series.len(), symbol, range);
            return Ok(series.slice(&range));
        };

        let mut incoming = Vec::new();
        if let Some(gap) = coverage.newer_deficit(&range) {
            debug!("{} needs newer data {}", symbol, gap);
            incoming.extend(self.fetch_range(&symbol, gap).await?);
            coverage = coverage.union(&gap);
        }
        if let Some(gap) = coverage.older_deficit(&range) {
            debug!("{} needs older data {}", symbol, gap);
            incoming.extend(self.fetch_range(&symbol, gap).await?);
            coverage = coverage.union(&gap);
        }

        if incoming.is_empty() {
            debug!("Cache hit for {} ({})", symbol, range);
            return Ok(series.slice(&range));
        }

        series.merge(incoming);
        self.flag(&series);
        self.persist(&series, &coverage)?;
        info!(
            "Updated {} cache to {} bars covering {}",
            symbol,
            series.len(),
            coverage
        );

        Ok(series.slice(&range))
    }

    /// Known coverage of a symbol's cache, if a readable cache exists.
    pub fn cached_range(&self, symbol: &str) -> Result<Option<DateRange>> {
        Ok(self.load(symbol)?.map(|record| record.coverage))
    }

    /// Validate a series against the store's gap bound.
    pub fn validate(&self, series: &Series) -> ValidationReport {
        validate_bars(series.bars(), self.max_gap_days)
    }

    /// Read the cache record for a symbol. `Ok(None)` when nothing is cached.
    pub fn load(&self, symbol: &str) -> Result<Option<CacheRecord>> {
        let symbol = normalize_symbol(symbol);
        let path = self.csv_path(&symbol);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path)?;
        if !reader.headers()?.iter().any(|h| h == "Date") {
            return Err(AppError::DataIntegrity(format!(
                "{} has no Date column",
                path.display()
            )));
        }
        let bars = reader
            .deserialize::<Bar>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Validate in stored order so out-of-order rows are caught before sorting.
        let report = validate_bars(&bars, self.max_gap_days);
        if let Some(issue) = report.first_integrity_error() {
            return Err(AppError::DataIntegrity(format!("{}: {}", symbol, issue)));
        }

        let series = Series::from_bars(symbol.as_str(), bars);
        let coverage = match (self.load_coverage(&symbol), series.date_range()) {
            (Some(meta), Some(bars)) => meta.union(&bars),
            (Some(meta), None) => meta,
            (None, Some(bars)) => bars,
            (None, None) => return Ok(None),
        };

        Ok(Some(CacheRecord { series, coverage }))
    }

    fn load_coverage(&self, symbol: &str) -> Option<DateRange> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        match serde_json::from_str(&content) {
            Ok(range) => Some(range),
            Err(e) => {
                warn!("Failed to parse coverage for {}: {}", symbol, e);
                None
            }
        }
    }

    /// Fetch one sub-range; empty results are an error.
    ///
    /// Rows breaking the OHLC invariant reject the whole sub-range, the same
    /// rule [`load`](Self::load) applies to the table, so nothing is persisted
    /// that a later read would throw away.
    async fn fetch_range(&self, symbol: &str, range: DateRange) -> Result<Vec<Bar>> {
        let bars: Vec<Bar> = self
            .source
            .fetch(symbol, range)
            .await?
            .into_iter()
            .filter(|b| range.contains(b.date))
            .map(|b| Bar::new(b.date, b.open, b.high, b.low, b.close, b.volume))
            .collect();

        if bars.is_empty() {
            warn!("[{}] No data for {} in {}", self.source.name(), symbol, range);
            return Err(AppError::DataUnavailable {
                symbol: symbol.to_string(),
                range,
            });
        }

        if let Some(bad) = bars.iter().find(|b| !b.is_consistent()) {
            warn!(
                "[{}] Rejecting {} for {}: OHLC invariant broken on {}",
                self.source.name(),
                range,
                symbol,
                bad.date
            );
            return Err(AppError::DataIntegrity(format!(
                "{}: OHLC invariant broken on {} in fetched range {}",
                symbol, bad.date, range
            )));
        }

        info!(
            "[{}] Fetched {} daily bars for {} ({})",
            self.source.name(),
            bars.len(),
            symbol,
            range
        );
        Ok(bars)
    }

    /// Log what validation still finds (wide gaps) without altering the data.
    fn flag(&self, series: &Series) {
        for issue in self.validate(series).issues {
            warn!("{}: {}", series.symbol, issue);
        }
    }

    fn persist(&self, series: &Series, coverage: &DateRange) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for bar in series.bars() {
            writer.serialize(bar)?;
        }
        let table = writer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))?;

        write_atomic(&self.csv_path(&series.symbol), &table)?;
        write_atomic(
            &self.meta_path(&series.symbol),
            &serde_json::to_vec_pretty(coverage)?,
        )?;
        debug!("Persisted {} to {:?}", series.symbol, self.csv_path(&series.symbol));
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate, Weekday};
    use std::sync::Mutex as StdMutex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Weekday bars for any range; records every request.
    #[derive(Default)]
    struct CalendarSource {
        calls: StdMutex<Vec<DateRange>>,
        empty: bool,
    }

    impl CalendarSource {
        fn calls(&self) -> Vec<DateRange> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceSource for CalendarSource {
        fn name(&self) -> &str {
            "calendar"
        }

        async fn fetch(&self, _symbol: &str, range: DateRange) -> Result<Vec<Bar>> {
            self.calls.lock().unwrap().push(range);
            if self.empty {
                return Ok(Vec::new());
            }
            Ok(range
                .start
                .iter_days()
                .take_while(|d| *d <= range.end)
                .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
                .map(|d| {
                    let px = 100.0 + d.ordinal() as f64;
                    Bar::new(d, px, px + 1.0, px - 1.0, px + 0.5, 1_000)
                })
                .collect())
        }
    }

    fn create_test_store(dir: &Path, source: Arc<CalendarSource>) -> SeriesStore {
        let config = StoreConfig {
            cache_dir: dir.to_path_buf(),
            max_gap_days: 5,
        };
        SeriesStore::new(&config, source).unwrap()
    }

    #[tokio::test]
    async fn test_first_fetch_writes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CalendarSource::default());
        let store = create_test_store(dir.path(), source.clone());
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 12));

        let series = store.get("aapl", range).await.unwrap();

        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.len(), 10);
        assert!(store.csv_path("AAPL").exists());
        assert_eq!(store.cached_range("AAPL").unwrap(), Some(range));
        assert_eq!(source.calls(), vec![range]);
    }

    #[tokio::test]
    async fn test_covered_request_does_not_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CalendarSource::default());
        let store = create_test_store(dir.path(), source.clone());

        store
            .get("MSFT", DateRange::new(date(2024, 1, 1), date(2024, 1, 31)))
            .await
            .unwrap();
        let inner = store
            .get("MSFT", DateRange::new(date(2024, 1, 8), date(2024, 1, 12)))
            .await
            .unwrap();

        assert_eq!(inner.len(), 5);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_weekend_start_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CalendarSource::default());
        let store = create_test_store(dir.path(), source.clone());
        // 2024-01-06 is a Saturday
        let range = DateRange::new(date(2024, 1, 6), date(2024, 1, 19));

        store.get("SPY", range).await.unwrap();
        store.get("SPY", range).await.unwrap();

        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CalendarSource {
            empty: true,
            ..Default::default()
        });
        let store = create_test_store(dir.path(), source);

        let err = store
            .get("ZZZZ", DateRange::new(date(2024, 1, 1), date(2024, 1, 5)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DataUnavailable { .. }));
        assert!(!store.csv_path("ZZZZ").exists());
    }

    #[tokio::test]
    async fn test_missing_date_column_triggers_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CalendarSource::default());
        let store = create_test_store(dir.path(), source.clone());
        fs::write(store.csv_path("QQQ"), "Day,Close\n2024-01-02,1.0\n").unwrap();

        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 5));
        let series = store.get("QQQ", range).await.unwrap();

        assert_eq!(series.len(), 5);
        assert_eq!(source.calls(), vec![range]);
        assert!(store.load("QQQ").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_out_of_order_cache_is_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(dir.path(), Arc::new(CalendarSource::default()));
        fs::write(
            store.csv_path("IWM"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-03,1.0,2.0,0.5,1.5,10\n\
             2024-01-02,1.0,2.0,0.5,1.5,10\n",
        )
        .unwrap();

        let err = store.load("IWM").unwrap_err();
        assert!(matches!(err, AppError::DataIntegrity(_)));
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("X.csv");

        write_atomic(&target, b"Date\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "Date\n");
        assert!(!dir.path().join("X.csv.tmp").exists());
    }

    #[test]
    fn test_file_stem_sanitization() {
        assert_eq!(SeriesStore::file_stem("a/b:c"), "A_B_C");
        assert_eq!(SeriesStore::file_stem("^gspc"), "^GSPC");
    }
}
