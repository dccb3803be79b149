//! Parabolic SAR trend state machine.

use crate::config::PsarConfig;
use crate::services::signals::Indicator;
use crate::types::{Bar, PsarPoint, PsarReading, TrendLabel, TrendStrength};

/// State carried between bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsarState {
    pub bull: bool,
    /// Acceleration factor.
    pub af: f64,
    /// Highest high of the current uptrend.
    pub high_point: f64,
    /// Lowest low of the current downtrend.
    pub low_point: f64,
    pub sar: f64,
}

impl PsarState {
    /// Seed from the first two bars: bullish, stop at the second close.
    pub fn seed(first: &Bar, second: &Bar, config: &PsarConfig) -> Self {
        Self {
            bull: true,
            af: config.af_start,
            high_point: first.high,
            low_point: first.low,
            sar: second.close,
        }
    }

    /// Advance by one bar. `prev2` and `prev1` are the two bars before `bar`.
    pub fn step(self, prev2: &Bar, prev1: &Bar, bar: &Bar, config: &PsarConfig) -> Self {
        let mut next = self;

        if self.bull {
            let projected = self.sar + self.af * (self.high_point - self.sar);
            if bar.low < projected {
                next.bull = false;
                next.sar = self.high_point;
                next.low_point = bar.low;
                next.af = config.af_start;
            } else {
                if bar.high > self.high_point {
                    next.high_point = bar.high;
                    next.af = (self.af + config.af_step).min(config.af_max);
                }
                next.sar = projected.min(prev1.low).min(prev2.low);
            }
        } else {
            let projected = self.sar + self.af * (self.low_point - self.sar);
            if bar.high > projected {
                next.bull = true;
                next.sar = self.low_point;
                next.high_point = bar.high;
                next.af = config.af_start;
            } else {
                if bar.low < self.low_point {
                    next.low_point = bar.low;
                    next.af = (self.af + config.af_step).min(config.af_max);
                }
                next.sar = projected.max(prev1.high).max(prev2.high);
            }
        }

        next
    }

    pub fn trend(&self) -> TrendLabel {
        if self.bull {
            TrendLabel::Bull
        } else {
            TrendLabel::Bear
        }
    }
}

/// Parabolic SAR.
///
/// Strictly sequential: every bar depends on the state left by the previous
/// one. The first two bars are undefined.
#[derive(Default)]
pub struct ParabolicSar {
    config: PsarConfig,
}

impl ParabolicSar {
    pub fn new(config: PsarConfig) -> Self {
        Self { config }
    }
}

impl Indicator for ParabolicSar {
    type Output = Option<PsarPoint>;

    fn id(&self) -> &str {
        "psar"
    }

    fn name(&self) -> &str {
        "Parabolic SAR"
    }

    fn min_periods(&self) -> usize {
        3
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<PsarPoint>> {
        let mut out = vec![None; bars.len()];
        if bars.len() < self.min_periods() {
            return out;
        }

        let mut state = PsarState::seed(&bars[0], &bars[1], &self.config);
        for i in 2..bars.len() {
            state = state.step(&bars[i - 2], &bars[i - 1], &bars[i], &self.config);
            out[i] = Some(PsarPoint {
                sar: state.sar,
                trend: state.trend(),
            });
        }
        out
    }
}

/// Summarize the trend at `index`.
///
/// Returns `None` when the point at `index` is undefined.
pub fn reading_at(points: &[Option<PsarPoint>], bars: &[Bar], index: usize) -> Option<PsarReading> {
    let current = (*points.get(index)?)?;
    let close = bars.get(index)?.close;

    let trend_days = points[..=index]
        .iter()
        .rev()
        .take_while(|p| p.map(|p| p.trend) == Some(current.trend))
        .count();

    let anchor = bars[index + 1 - trend_days].close;
    let change_pct = if anchor != 0.0 {
        (close - anchor) / anchor * 100.0
    } else {
        0.0
    };

    let distance_pct = if close != 0.0 {
        (close - current.sar).abs() / close * 100.0
    } else {
        0.0
    };

    let flipped_from = index
        .checked_sub(1)
        .and_then(|i| points[i])
        .map(|p| p.trend)
        .filter(|t| *t != current.trend);

    Some(PsarReading {
        sar: current.sar,
        trend: current.trend,
        trend_days,
        strength: TrendStrength::from_change_pct(change_pct),
        distance_pct,
        flipped_from,
    })
}
