pub mod analyzer;
pub mod batch;
pub mod params;
pub mod series_store;
pub mod signals;
pub mod validation;

pub use analyzer::Analyzer;
pub use batch::{BatchAnalyzer, BatchReport, SymbolOutcome};
pub use series_store::{CacheRecord, SeriesStore};
pub use signals::{DivergenceDetector, IndicatorEngine, ScoreAggregator};
pub use validation::{validate_bars, ValidationIssue, ValidationReport};
