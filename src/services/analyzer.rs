//! Per-symbol analysis at a single date.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::params::normalize_symbol;
use crate::services::series_store::SeriesStore;
use crate::services::signals::{DivergenceDetector, IndicatorEngine, ScoreAggregator, ScoreInputs};
use crate::types::{DateRange, Divergence, Series, SymbolAnalysis};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::debug;

/// Loads history from the store and turns it into a typed [`SymbolAnalysis`].
pub struct Analyzer {
    store: Arc<SeriesStore>,
    engine: IndicatorEngine,
    divergence: DivergenceDetector,
    scorer: ScoreAggregator,
    history_days: i64,
}

impl Analyzer {
    pub fn new(config: &Config, store: Arc<SeriesStore>) -> Self {
        Self {
            store,
            engine: IndicatorEngine::new(&config.indicators, config.psar),
            divergence: DivergenceDetector::new(&config.divergence),
            scorer: ScoreAggregator::new(config.weights),
            history_days: config.history_days.max(1),
        }
    }

    /// Analyze `symbol` on `date`, which must be a trading day for it.
    pub async fn analyze(&self, symbol: &str, date: NaiveDate) -> Result<SymbolAnalysis> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::InvalidInput("empty symbol".to_string()));
        }

        let range = DateRange::new(date - Duration::days(self.history_days), date);
        let series = self.store.get(&symbol, range).await?;
        self.analyze_series(&series, date)
    }

    /// Analyze an already loaded series. Only bars up to `date` are used.
    pub fn analyze_series(&self, series: &Series, date: NaiveDate) -> Result<SymbolAnalysis> {
        let unavailable = || AppError::DataUnavailable {
            symbol: series.symbol.clone(),
            range: DateRange::new(date, date),
        };

        let first = series.first_date().ok_or_else(unavailable)?;
        let history = series.slice(&DateRange::new(first.min(date), date));
        let frame = self.engine.build_frame(&history);
        let index = frame.index_of(date).ok_or_else(unavailable)?;
        let bar = frame.bars[index];

        let moving_averages = self
            .engine
            .moving_average_reading(&frame, index)
            .ok_or_else(|| AppError::Computation(format!("no moving averages at {}", date)))?;
        let demark = self
            .engine
            .demark_reading(&frame, index)
            .ok_or_else(|| AppError::Computation(format!("no demark counters at {}", date)))?;

        let mut rsi = self.engine.rsi_reading(&frame, index);
        rsi.divergence = self.divergence_or_none(&series.symbol, self.divergence.rsi(&frame, index));
        let mut kdj = self.engine.kdj_reading(&frame, index);
        kdj.divergence = self.divergence_or_none(&series.symbol, self.divergence.kdj(&frame, index));

        let bollinger = self.engine.bollinger_reading(&frame, index);
        let psar = self.engine.psar_reading(&frame, index);

        let score = self.scorer.score(&ScoreInputs {
            moving_averages: &moving_averages,
            rsi: &rsi,
            kdj: &kdj,
            bollinger: bollinger.as_ref(),
            psar: psar.as_ref(),
        });

        debug!(
            "{} on {}: composite {} ({})",
            series.symbol, date, score.composite, score.label
        );

        Ok(SymbolAnalysis {
            symbol: series.symbol.clone(),
            date,
            close: bar.close,
            bars_used: frame.len(),
            moving_averages,
            rsi,
            kdj,
            bollinger,
            psar,
            demark,
            score,
        })
    }

    /// Divergence is optional: short history leaves it undefined.
    fn divergence_or_none(&self, symbol: &str, result: Result<Option<Divergence>>) -> Option<Divergence> {
        match result {
            Ok(found) => found,
            Err(e) => {
                debug!("No divergence for {}: {}", symbol, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PriceSource;
    use crate::types::Bar;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NoSource;

    #[async_trait]
    impl PriceSource for NoSource {
        fn name(&self) -> &str {
            "none"
        }

        async fn fetch(&self, _symbol: &str, _range: DateRange) -> Result<Vec<Bar>> {
            Ok(Vec::new())
        }
    }

    fn analyzer(dir: &TempDir) -> Analyzer {
        let mut config = Config::from_env();
        config.store.cache_dir = dir.path().to_path_buf();
        let store = SeriesStore::new(&config.store, Arc::new(NoSource)).unwrap();
        Analyzer::new(&config, Arc::new(store))
    }

    fn series(count: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = (0..count)
            .map(|i| {
                let c = 100.0 + 10.0 * (i as f64 / 6.0).sin() + i as f64 * 0.05;
                Bar::new(start + Duration::days(i as i64), c, c + 1.0, c - 1.0, c, 1_000 + i as u64)
            })
            .collect();
        Series::from_bars("WAVE", bars)
    }

    #[test]
    fn test_full_history_analysis() {
        let dir = TempDir::new().unwrap();
        let series = series(300);
        let date = series.last_date().unwrap();
        let analysis = analyzer(&dir).analyze_series(&series, date).unwrap();

        assert_eq!(analysis.symbol, "WAVE");
        assert_eq!(analysis.bars_used, 300);
        assert!(analysis.rsi.short.is_some());
        assert!(analysis.kdj.j.is_some());
        assert!(analysis.bollinger.is_some());
        assert!(analysis.psar.is_some());
        assert!(analysis.moving_averages.arrangement.is_some());
        for s in [
            analysis.score.momentum,
            analysis.score.volume,
            analysis.score.trend,
            analysis.score.oscillators,
            analysis.score.volatility,
            analysis.score.composite,
        ] {
            assert!((0.0..=100.0).contains(&s));
        }
    }

    #[test]
    fn test_bars_after_date_are_ignored() {
        let dir = TempDir::new().unwrap();
        let series = series(300);
        let date = series.bars()[250].date;
        let analysis = analyzer(&dir).analyze_series(&series, date).unwrap();
        assert_eq!(analysis.bars_used, 251);
        assert_eq!(analysis.close, series.bars()[250].close);
    }

    #[test]
    fn test_short_history_is_fail_closed() {
        let dir = TempDir::new().unwrap();
        let series = series(15);
        let date = series.last_date().unwrap();
        let analysis = analyzer(&dir).analyze_series(&series, date).unwrap();
        assert!(analysis.bollinger.is_none());
        assert!(analysis.rsi.long.is_none());
        assert!(analysis.rsi.divergence.is_none());
        assert!(analysis.moving_averages.values.iter().all(Option::is_none));
    }

    #[test]
    fn test_missing_date_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let series = series(30);
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let err = analyzer(&dir).analyze_series(&series, date).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_analyze_without_data_fails() {
        let dir = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = analyzer(&dir).analyze("aapl", date).await.unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_symbol() {
        let dir = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = analyzer(&dir).analyze("  ", date).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
