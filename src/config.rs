use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Per-symbol cache configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one `{SYMBOL}.csv` per symbol.
    pub cache_dir: PathBuf,
    /// Inter-bar calendar gap above which a series is flagged.
    pub max_gap_days: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache/history"),
            max_gap_days: 5,
        }
    }
}

/// Oscillator and band parameters.
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    /// RSI periods (short, mid, long).
    pub rsi_periods: [usize; 3],
    /// RSV rolling window.
    pub kdj_window: usize,
    /// K smoothing factor.
    pub kdj_m1: f64,
    /// D smoothing factor.
    pub kdj_m2: f64,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    /// Moving average periods, shortest first.
    pub ma_periods: [usize; 4],
    pub volume_ma_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_periods: [6, 12, 24],
            kdj_window: 9,
            kdj_m1: 3.0,
            kdj_m2: 3.0,
            bollinger_period: 20,
            bollinger_k: 2.0,
            ma_periods: [20, 50, 120, 200],
            volume_ma_period: 20,
        }
    }
}

/// Parabolic SAR acceleration parameters.
#[derive(Debug, Clone, Copy)]
pub struct PsarConfig {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
}

impl Default for PsarConfig {
    fn default() -> Self {
        Self {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.2,
        }
    }
}

/// Divergence look-back.
#[derive(Debug, Clone, Copy)]
pub struct DivergenceConfig {
    /// Bars examined before the analysis date (inclusive).
    pub lookback: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self { lookback: 30 }
    }
}

/// Component weights for the composite score. They sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub momentum: f64,
    pub volume: f64,
    pub trend: f64,
    pub oscillators: f64,
    pub volatility: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            momentum: 0.20,
            volume: 0.15,
            trend: 0.25,
            oscillators: 0.25,
            volatility: 0.15,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache settings.
    pub store: StoreConfig,
    /// Indicator parameters.
    pub indicators: IndicatorConfig,
    /// PSAR parameters.
    pub psar: PsarConfig,
    /// Divergence parameters.
    pub divergence: DivergenceConfig,
    /// Composite score weights.
    pub weights: ScoreWeights,
    /// Comma/newline separated symbol list file.
    pub stock_list_path: PathBuf,
    /// Date to analyse; the binary falls back to today.
    pub analysis_date: Option<NaiveDate>,
    /// Symbol whose sessions define the trading calendar.
    pub reference_symbol: String,
    /// Calendar days of lead-in history loaded before the analysis date.
    pub history_days: i64,
    /// Width of the per-symbol worker pool.
    pub max_workers: usize,
    /// Upstream request timeout.
    pub source_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let store_defaults = StoreConfig::default();
        let psar_defaults = PsarConfig::default();

        Self {
            store: StoreConfig {
                cache_dir: env::var("AUGUR_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(store_defaults.cache_dir),
                max_gap_days: env_or("AUGUR_MAX_GAP_DAYS", store_defaults.max_gap_days),
            },
            indicators: IndicatorConfig::default(),
            psar: PsarConfig {
                af_start: env_or("AUGUR_PSAR_AF_START", psar_defaults.af_start),
                af_step: env_or("AUGUR_PSAR_AF_STEP", psar_defaults.af_step),
                af_max: env_or("AUGUR_PSAR_AF_MAX", psar_defaults.af_max),
            },
            divergence: DivergenceConfig {
                lookback: env_or("AUGUR_DIVERGENCE_LOOKBACK", 30),
            },
            weights: ScoreWeights::default(),
            stock_list_path: env::var("AUGUR_STOCK_LIST")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("settings/stock_list.txt")),
            analysis_date: env::var("AUGUR_ANALYSIS_DATE")
                .ok()
                .and_then(|v| crate::services::params::parse_date(&v).ok()),
            reference_symbol: env::var("AUGUR_REFERENCE_SYMBOL")
                .map(|s| crate::services::params::normalize_symbol(&s))
                .unwrap_or_else(|_| "SPY".to_string()),
            history_days: env_or("AUGUR_HISTORY_DAYS", 400),
            max_workers: env_or("AUGUR_MAX_WORKERS", 5usize).max(1),
            source_timeout_secs: env_or("AUGUR_SOURCE_TIMEOUT_SECS", 30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
