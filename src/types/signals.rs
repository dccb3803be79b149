use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// PSAR trend direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Bull,
    Bear,
}

impl TrendLabel {
    pub fn label(&self) -> &'static str {
        match self {
            TrendLabel::Bull => "Uptrend",
            TrendLabel::Bear => "Downtrend",
        }
    }
}

/// Trend strength bucketed by cumulative percent move over the trend span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    Weak,
    Medium,
    Strong,
}

impl TrendStrength {
    /// `<1%` weak, `<3%` medium, otherwise strong.
    pub fn from_change_pct(change_pct: f64) -> Self {
        let magnitude = change_pct.abs();
        if magnitude < 1.0 {
            TrendStrength::Weak
        } else if magnitude < 3.0 {
            TrendStrength::Medium
        } else {
            TrendStrength::Strong
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendStrength::Weak => "weak",
            TrendStrength::Medium => "medium",
            TrendStrength::Strong => "strong",
        }
    }
}

/// Overbought/oversold classification shared by RSI and KDJ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorStatus {
    SevereOverbought,
    Overbought,
    Neutral,
    Oversold,
    SevereOversold,
}

impl OscillatorStatus {
    /// Multi-period RSI classification; severe bands are checked first.
    pub fn from_rsi(short: f64, mid: f64, long: f64) -> Self {
        if short > 95.0 || mid > 90.0 || long > 85.0 {
            OscillatorStatus::SevereOverbought
        } else if short > 85.0 || mid > 80.0 || long > 75.0 {
            OscillatorStatus::Overbought
        } else if short < 5.0 || mid < 10.0 || long < 15.0 {
            OscillatorStatus::SevereOversold
        } else if short < 15.0 || mid < 20.0 || long < 25.0 {
            OscillatorStatus::Oversold
        } else {
            OscillatorStatus::Neutral
        }
    }

    /// KDJ classification on the J line.
    pub fn from_j(j: f64) -> Self {
        if j > 90.0 {
            OscillatorStatus::SevereOverbought
        } else if j > 80.0 {
            OscillatorStatus::Overbought
        } else if j < 10.0 {
            OscillatorStatus::SevereOversold
        } else if j < 20.0 {
            OscillatorStatus::Oversold
        } else {
            OscillatorStatus::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OscillatorStatus::SevereOverbought => "Severe Overbought",
            OscillatorStatus::Overbought => "Overbought",
            OscillatorStatus::Neutral => "Neutral",
            OscillatorStatus::Oversold => "Oversold",
            OscillatorStatus::SevereOversold => "Severe Oversold",
        }
    }
}

/// Change in Bollinger bandwidth versus the previous bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthTrend {
    Narrowing,
    Widening,
    Stable,
}

impl BandwidthTrend {
    pub fn between(previous: f64, current: f64) -> Self {
        if current < previous {
            BandwidthTrend::Narrowing
        } else if current > previous {
            BandwidthTrend::Widening
        } else {
            BandwidthTrend::Stable
        }
    }
}

/// Close relative to the Bollinger envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandBreak {
    Up,
    Down,
    None,
}

impl BandBreak {
    pub fn classify(close: f64, upper: f64, lower: f64) -> Self {
        if close > upper {
            BandBreak::Up
        } else if close < lower {
            BandBreak::Down
        } else {
            BandBreak::None
        }
    }
}

/// Market status from the position inside the bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandStatus {
    Overbought,
    NearOverbought,
    Normal,
    NearOversold,
    Oversold,
}

impl BandStatus {
    /// `position` is the fraction `(close - lower) / (upper - lower)`.
    pub fn from_position(position: f64) -> Self {
        let pct = position * 100.0;
        if pct > 80.0 {
            BandStatus::Overbought
        } else if pct > 70.0 {
            BandStatus::NearOverbought
        } else if pct < 20.0 {
            BandStatus::Oversold
        } else if pct < 30.0 {
            BandStatus::NearOversold
        } else {
            BandStatus::Normal
        }
    }
}

/// Volume versus its moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    SignificantExpansion,
    Expansion,
    Normal,
    Contraction,
    SignificantContraction,
}

impl VolumeStatus {
    pub fn classify(volume: f64, average: f64) -> Self {
        if volume > average * 2.0 {
            VolumeStatus::SignificantExpansion
        } else if volume > average * 1.5 {
            VolumeStatus::Expansion
        } else if volume < average * 0.5 {
            VolumeStatus::SignificantContraction
        } else if volume < average * 0.8 {
            VolumeStatus::Contraction
        } else {
            VolumeStatus::Normal
        }
    }
}

/// Ordering of the four moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaArrangement {
    Bullish,
    Bearish,
    Entangled,
    Mixed,
}

impl MaArrangement {
    /// `averages` are ordered shortest period first.
    pub fn classify(averages: &[f64; 4]) -> Self {
        let [a, b, c, d] = *averages;
        if a > b && b > c && c > d {
            return MaArrangement::Bullish;
        }
        if a < b && b < c && c < d {
            return MaArrangement::Bearish;
        }
        let entangled = averages.iter().enumerate().any(|(i, x)| {
            averages
                .iter()
                .enumerate()
                .any(|(j, y)| i != j && *y != 0.0 && ((x - y) / y).abs() < 0.01)
        });
        if entangled {
            MaArrangement::Entangled
        } else {
            MaArrangement::Mixed
        }
    }
}

/// Oscillator a divergence was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorKind {
    KdjJ,
    Rsi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    Top,
    Bottom,
    PotentialTop,
    PotentialBottom,
}

impl DivergenceKind {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, DivergenceKind::Top | DivergenceKind::Bottom)
    }
}

/// A price/oscillator divergence against one prior extremum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    pub kind: DivergenceKind,
    pub oscillator: OscillatorKind,
    /// First bar of the analysed sub-range (the last crossover, or window start).
    pub window_start: NaiveDate,
    pub reference_date: NaiveDate,
    pub reference_price: f64,
    pub reference_value: f64,
    pub current_price: f64,
    pub current_value: f64,
}

/// Composite heat classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    Extreme,
    Strong,
    FairlyStrong,
    NeutralStrong,
    Neutral,
    NeutralWeak,
    FairlyWeak,
    Weak,
    ExtremeWeak,
}

impl HeatLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => HeatLevel::Extreme,
            s if s >= 80.0 => HeatLevel::Strong,
            s if s >= 70.0 => HeatLevel::FairlyStrong,
            s if s >= 60.0 => HeatLevel::NeutralStrong,
            s if s >= 45.0 => HeatLevel::Neutral,
            s if s >= 35.0 => HeatLevel::NeutralWeak,
            s if s >= 25.0 => HeatLevel::FairlyWeak,
            s if s >= 15.0 => HeatLevel::Weak,
            _ => HeatLevel::ExtremeWeak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HeatLevel::Extreme => "Extremely strong, possible overheating",
            HeatLevel::Strong => "Strong, watch for a pullback",
            HeatLevel::FairlyStrong => "Fairly strong, worth watching",
            HeatLevel::NeutralStrong => "Neutral to strong",
            HeatLevel::Neutral => "Neutral",
            HeatLevel::NeutralWeak => "Neutral to weak",
            HeatLevel::FairlyWeak => "Fairly weak, worth watching",
            HeatLevel::Weak => "Weak, watch for a rebound",
            HeatLevel::ExtremeWeak => "Extremely weak, possibly oversold",
        }
    }
}

/// Weighted composite score with its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatScore {
    pub momentum: f64,
    pub volume: f64,
    pub trend: f64,
    pub oscillators: f64,
    pub volatility: f64,
    pub composite: f64,
    pub level: HeatLevel,
    pub label: String,
    pub reasons: Vec<String>,
}

// =============================================================================
// Per-indicator readings at the analysis date
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverageReading {
    /// Periods in ascending order, aligned with `values` and `diffs_pct`.
    pub periods: [usize; 4],
    pub values: [Option<f64>; 4],
    /// Percent distance of close above (+) or below (-) each average.
    pub diffs_pct: [Option<f64>; 4],
    pub daily_change_pct: Option<f64>,
    pub volume: u64,
    pub volume_average: Option<f64>,
    pub volume_ratio_pct: Option<f64>,
    pub volume_status: VolumeStatus,
    pub arrangement: Option<MaArrangement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsiReading {
    pub short: Option<f64>,
    pub mid: Option<f64>,
    pub long: Option<f64>,
    pub status: Option<OscillatorStatus>,
    pub divergence: Option<Divergence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdjReading {
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
    pub status: Option<OscillatorStatus>,
    pub divergence: Option<Divergence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerReading {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
    pub bandwidth: f64,
    pub position: Option<f64>,
    pub bandwidth_trend: Option<BandwidthTrend>,
    pub breakthrough: BandBreak,
    pub status: Option<BandStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsarReading {
    pub sar: f64,
    pub trend: TrendLabel,
    pub trend_days: usize,
    pub strength: TrendStrength,
    pub distance_pct: f64,
    /// Trend on the previous bar when it differs from today's.
    pub flipped_from: Option<TrendLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemarkReading {
    pub up_count_9: u32,
    pub up_count_13: u32,
    pub down_count_9: u32,
    pub down_count_13: u32,
    pub up_signal_9: bool,
    pub up_signal_13: bool,
    pub down_signal_9: bool,
    pub down_signal_13: bool,
    pub last_up_signal_9: Option<NaiveDate>,
    pub last_up_signal_13: Option<NaiveDate>,
    pub last_down_signal_9: Option<NaiveDate>,
    pub last_down_signal_13: Option<NaiveDate>,
}

/// Full typed analysis for one (symbol, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub bars_used: usize,
    pub moving_averages: MovingAverageReading,
    pub rsi: RsiReading,
    pub kdj: KdjReading,
    pub bollinger: Option<BollingerReading>,
    pub psar: Option<PsarReading>,
    pub demark: DemarkReading,
    pub score: HeatScore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_strength_buckets() {
        assert_eq!(TrendStrength::from_change_pct(0.5), TrendStrength::Weak);
        assert_eq!(TrendStrength::from_change_pct(-2.0), TrendStrength::Medium);
        assert_eq!(TrendStrength::from_change_pct(3.0), TrendStrength::Strong);
    }

    #[test]
    fn test_rsi_status_severe_checked_first() {
        assert_eq!(
            OscillatorStatus::from_rsi(96.0, 50.0, 50.0),
            OscillatorStatus::SevereOverbought
        );
        assert_eq!(
            OscillatorStatus::from_rsi(50.0, 81.0, 50.0),
            OscillatorStatus::Overbought
        );
        assert_eq!(
            OscillatorStatus::from_rsi(50.0, 50.0, 14.0),
            OscillatorStatus::SevereOversold
        );
        assert_eq!(
            OscillatorStatus::from_rsi(14.0, 50.0, 50.0),
            OscillatorStatus::Oversold
        );
        assert_eq!(
            OscillatorStatus::from_rsi(50.0, 50.0, 50.0),
            OscillatorStatus::Neutral
        );
    }

    #[test]
    fn test_kdj_status() {
        assert_eq!(OscillatorStatus::from_j(95.0), OscillatorStatus::SevereOverbought);
        assert_eq!(OscillatorStatus::from_j(85.0), OscillatorStatus::Overbought);
        assert_eq!(OscillatorStatus::from_j(50.0), OscillatorStatus::Neutral);
        assert_eq!(OscillatorStatus::from_j(15.0), OscillatorStatus::Oversold);
        assert_eq!(OscillatorStatus::from_j(-5.0), OscillatorStatus::SevereOversold);
    }

    #[test]
    fn test_band_status_uses_percent_position() {
        assert_eq!(BandStatus::from_position(0.85), BandStatus::Overbought);
        assert_eq!(BandStatus::from_position(0.75), BandStatus::NearOverbought);
        assert_eq!(BandStatus::from_position(0.5), BandStatus::Normal);
        assert_eq!(BandStatus::from_position(0.25), BandStatus::NearOversold);
        assert_eq!(BandStatus::from_position(-0.1), BandStatus::Oversold);
    }

    #[test]
    fn test_volume_status() {
        assert_eq!(VolumeStatus::classify(250.0, 100.0), VolumeStatus::SignificantExpansion);
        assert_eq!(VolumeStatus::classify(160.0, 100.0), VolumeStatus::Expansion);
        assert_eq!(VolumeStatus::classify(100.0, 100.0), VolumeStatus::Normal);
        assert_eq!(VolumeStatus::classify(70.0, 100.0), VolumeStatus::Contraction);
        assert_eq!(VolumeStatus::classify(40.0, 100.0), VolumeStatus::SignificantContraction);
    }

    #[test]
    fn test_ma_arrangement() {
        assert_eq!(MaArrangement::classify(&[110.0, 105.0, 100.0, 90.0]), MaArrangement::Bullish);
        assert_eq!(MaArrangement::classify(&[90.0, 100.0, 105.0, 110.0]), MaArrangement::Bearish);
        assert_eq!(
            MaArrangement::classify(&[100.0, 100.5, 90.0, 110.0]),
            MaArrangement::Entangled
        );
        assert_eq!(MaArrangement::classify(&[100.0, 90.0, 110.0, 80.0]), MaArrangement::Mixed);
    }

    #[test]
    fn test_heat_level_thresholds() {
        assert_eq!(HeatLevel::from_score(90.0), HeatLevel::Extreme);
        assert_eq!(HeatLevel::from_score(50.0), HeatLevel::Neutral);
        assert_eq!(HeatLevel::from_score(44.9), HeatLevel::NeutralWeak);
        assert_eq!(HeatLevel::from_score(3.0), HeatLevel::ExtremeWeak);
    }

    #[test]
    fn test_trend_label_serialization() {
        let json = serde_json::to_string(&TrendLabel::Bull).unwrap();
        assert_eq!(json, "\"bull\"");
    }
}
