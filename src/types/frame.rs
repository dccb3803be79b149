use crate::types::{Bar, TrendLabel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// KDJ values at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KdjPoint {
    pub rsv: f64,
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

/// Bollinger envelope at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerPoint {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
    pub bandwidth: f64,
    /// `(close - lower) / (upper - lower)`; undefined when the bands collapse.
    pub position: Option<f64>,
}

/// Moving averages of close plus the volume average at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAveragePoint {
    pub values: [Option<f64>; 4],
    pub volume_average: Option<f64>,
}

/// PSAR stop and trend at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsarPoint {
    pub sar: f64,
    pub trend: TrendLabel,
}

/// Demark counters at one bar. Counters are exposed on every bar, not only signal days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemarkPoint {
    pub up_count_9: u32,
    pub up_count_13: u32,
    pub down_count_9: u32,
    pub down_count_13: u32,
}

impl DemarkPoint {
    pub fn up_signal_9(&self) -> bool {
        self.up_count_9 == 9
    }

    pub fn down_signal_9(&self) -> bool {
        self.down_count_9 == 9
    }

    pub fn up_signal_13(&self) -> bool {
        self.up_count_13 == 4
    }

    pub fn down_signal_13(&self) -> bool {
        self.down_count_13 == 4
    }
}

/// Most recent signal dates seen while walking the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemarkSignalDates {
    pub up_9: Option<NaiveDate>,
    pub up_13: Option<NaiveDate>,
    pub down_9: Option<NaiveDate>,
    pub down_13: Option<NaiveDate>,
}

/// Demark counters for every bar plus the latched signal dates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DemarkSeries {
    pub points: Vec<DemarkPoint>,
    pub last_signals: DemarkSignalDates,
}

/// A series extended with derived columns. Every column has one entry per bar.
///
/// This is a view: it is rebuilt from the series on every request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorFrame {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub rsi_short: Vec<Option<f64>>,
    pub rsi_mid: Vec<Option<f64>>,
    pub rsi_long: Vec<Option<f64>>,
    pub kdj: Vec<Option<KdjPoint>>,
    pub bollinger: Vec<Option<BollingerPoint>>,
    pub moving_averages: Vec<MovingAveragePoint>,
    pub psar: Vec<Option<PsarPoint>>,
    pub demark: DemarkSeries,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }
}
