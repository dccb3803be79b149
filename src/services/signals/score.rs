//! Composite heat score.
//!
//! Every component starts neutral at 50, collects fixed adjustments from the
//! readings, and is squashed into [0, 100] with a logistic curve.

use crate::config::ScoreWeights;
use crate::services::signals::round1;
use crate::types::{
    BandBreak, BandStatus, BollingerReading, DivergenceKind, HeatLevel, HeatScore, KdjReading,
    MaArrangement, MovingAverageReading, OscillatorStatus, PsarReading, RsiReading, TrendLabel,
    TrendStrength, VolumeStatus,
};

const NEUTRAL: f64 = 50.0;
/// Weights of the MA20/50/120/200 distance in the momentum score.
const MA_DIFF_WEIGHTS: [f64; 4] = [0.4, 0.3, 0.2, 0.1];

/// Map a raw component score onto [0, 100], rounded to one decimal.
pub fn normalize_score(raw: f64) -> f64 {
    let x = (raw - NEUTRAL) / 25.0;
    round1(100.0 / (1.0 + (-x).exp()))
}

/// Readings at the analysis date that feed the score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub moving_averages: &'a MovingAverageReading,
    pub rsi: &'a RsiReading,
    pub kdj: &'a KdjReading,
    pub bollinger: Option<&'a BollingerReading>,
    pub psar: Option<&'a PsarReading>,
}

pub struct ScoreAggregator {
    weights: ScoreWeights,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

impl ScoreAggregator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, inputs: &ScoreInputs<'_>) -> HeatScore {
        let mut reasons = Vec::new();

        let momentum = normalize_score(momentum(inputs.moving_averages, &mut reasons));
        let volume = normalize_score(volume(inputs.moving_averages, &mut reasons));
        let trend = normalize_score(trend(inputs.psar, inputs.moving_averages, &mut reasons));
        let oscillators = normalize_score(oscillators(inputs.rsi, inputs.kdj, &mut reasons));
        let volatility = normalize_score(volatility(inputs.bollinger, &mut reasons));

        let w = &self.weights;
        let composite = round1(
            momentum * w.momentum
                + volume * w.volume
                + trend * w.trend
                + oscillators * w.oscillators
                + volatility * w.volatility,
        );
        let level = HeatLevel::from_score(composite);

        HeatScore {
            momentum,
            volume,
            trend,
            oscillators,
            volatility,
            composite,
            level,
            label: level.label().to_string(),
            reasons,
        }
    }
}

fn momentum(ma: &MovingAverageReading, reasons: &mut Vec<String>) -> f64 {
    let mut score = NEUTRAL;

    if let Some(change) = ma.daily_change_pct {
        if change > 2.0 {
            score += 20.0;
            reasons.push(format!("Strong daily gain ({:+.2}%)", change));
        } else if change > 0.0 {
            score += 10.0;
        } else if change < -2.0 {
            score -= 20.0;
            reasons.push(format!("Sharp daily drop ({:+.2}%)", change));
        } else if change < 0.0 {
            score -= 10.0;
        }
    }

    let mut weighted = 0.0;
    for ((diff, period), weight) in ma.diffs_pct.iter().zip(ma.periods).zip(MA_DIFF_WEIGHTS) {
        let Some(diff) = *diff else { continue };
        weighted += diff * weight;
        if diff.abs() > 5.0 {
            let side = if diff > 0.0 { "above" } else { "below" };
            reasons.push(format!("Price {:.1}% {} MA{}", diff.abs(), side, period));
        }
    }

    score + weighted * 10.0
}

fn volume(ma: &MovingAverageReading, reasons: &mut Vec<String>) -> f64 {
    let adjustment = match ma.volume_status {
        VolumeStatus::SignificantExpansion => 25.0,
        VolumeStatus::Expansion => 15.0,
        VolumeStatus::Normal => 0.0,
        VolumeStatus::Contraction => -15.0,
        VolumeStatus::SignificantContraction => -25.0,
    };
    if adjustment != 0.0 {
        if let Some(ratio) = ma.volume_ratio_pct {
            let label = if adjustment > 0.0 { "expanding" } else { "contracting" };
            reasons.push(format!("Volume {} ({:+.1}% vs average)", label, ratio));
        }
    }
    NEUTRAL + adjustment
}

fn trend(psar: Option<&PsarReading>, ma: &MovingAverageReading, reasons: &mut Vec<String>) -> f64 {
    let mut score = NEUTRAL;

    if let Some(psar) = psar {
        let mut adjustment = 10.0;
        adjustment += match psar.strength {
            TrendStrength::Strong => 10.0,
            TrendStrength::Medium => 5.0,
            TrendStrength::Weak => 0.0,
        };
        if psar.trend_days > 10 {
            adjustment += 5.0;
        }
        match psar.trend {
            TrendLabel::Bull => score += adjustment,
            TrendLabel::Bear => score -= adjustment,
        }
        if let Some(previous) = psar.flipped_from {
            reasons.push(format!(
                "PSAR flipped from {} to {}",
                previous.label(),
                psar.trend.label()
            ));
        } else {
            reasons.push(format!(
                "PSAR {} for {} days ({})",
                psar.trend.label(),
                psar.trend_days,
                psar.strength.label()
            ));
        }
    }

    match ma.arrangement {
        Some(MaArrangement::Bullish) => {
            score += 20.0;
            reasons.push("Moving averages in bullish order".to_string());
        }
        Some(MaArrangement::Bearish) => {
            score -= 20.0;
            reasons.push("Moving averages in bearish order".to_string());
        }
        Some(MaArrangement::Entangled) => score -= 5.0,
        Some(MaArrangement::Mixed) | None => {}
    }

    score
}

fn oscillators(rsi: &RsiReading, kdj: &KdjReading, reasons: &mut Vec<String>) -> f64 {
    let mut score = NEUTRAL;

    if let Some(short) = rsi.short {
        if short > 80.0 {
            score += 15.0;
            reasons.push(format!("RSI6 overbought ({:.1})", short));
        } else if short < 20.0 {
            score -= 15.0;
            reasons.push(format!("RSI6 oversold ({:.1})", short));
        }
    }
    if let (Some(mid), Some(long)) = (rsi.mid, rsi.long) {
        if mid > 70.0 && long > 60.0 {
            score += 10.0;
        } else if mid < 30.0 && long < 40.0 {
            score -= 10.0;
        }
    }

    if let Some(j) = kdj.j {
        if j > 100.0 {
            score += 15.0;
            reasons.push(format!("J above 100 ({:.1})", j));
        } else if j < 0.0 {
            score -= 15.0;
            reasons.push(format!("J below 0 ({:.1})", j));
        }
    }
    match kdj.status {
        Some(OscillatorStatus::SevereOverbought) => score += 10.0,
        Some(OscillatorStatus::SevereOversold) => score -= 10.0,
        _ => {}
    }
    match kdj.divergence.as_ref().map(|d| d.kind) {
        Some(DivergenceKind::Top) => {
            score -= 20.0;
            reasons.push("KDJ top divergence".to_string());
        }
        Some(DivergenceKind::Bottom) => {
            score += 20.0;
            reasons.push("KDJ bottom divergence".to_string());
        }
        _ => {}
    }

    score
}

fn volatility(bollinger: Option<&BollingerReading>, reasons: &mut Vec<String>) -> f64 {
    let mut score = NEUTRAL;
    let Some(bb) = bollinger else {
        return score;
    };

    match bb.status {
        Some(BandStatus::Overbought) => score += 15.0,
        Some(BandStatus::Oversold) => score -= 15.0,
        _ => {}
    }
    match bb.breakthrough {
        BandBreak::Up => {
            score += 20.0;
            reasons.push("Close broke above the upper band".to_string());
        }
        BandBreak::Down => {
            score -= 20.0;
            reasons.push("Close broke below the lower band".to_string());
        }
        BandBreak::None => {}
    }
    if bb.bandwidth > 20.0 {
        score -= 15.0;
        reasons.push(format!("Wide bands ({:.1}%)", bb.bandwidth));
    } else if bb.bandwidth < 10.0 {
        score += 10.0;
    }

    score
}
