//! Price/oscillator divergence detection.
//!
//! Analysis is restricted to the bars after the most recent crossover of two
//! reference lines (K/D for KDJ, RSI6/RSI12 for RSI) inside the look-back
//! window. Price extrema in that sub-range are compared with the current bar.

use crate::config::DivergenceConfig;
use crate::error::{AppError, Result};
use crate::types::{Bar, Divergence, DivergenceKind, IndicatorFrame, OscillatorKind};

/// Price within this fraction of an extremum counts as "at" the extremum.
const NEAR_EXTREMUM: f64 = 0.01;
/// Oscillator beyond this multiple of the bottom value hints at a bottom divergence.
const POTENTIAL_BOTTOM_FACTOR: f64 = 1.1;
/// Oscillator under this multiple of the top value hints at a top divergence.
const POTENTIAL_TOP_FACTOR: f64 = 0.9;

/// Columns a divergence check reads, aligned bar for bar.
pub struct DivergenceInput<'a> {
    pub kind: OscillatorKind,
    pub bars: &'a [Bar],
    pub oscillator: &'a [Option<f64>],
    pub fast: &'a [Option<f64>],
    pub slow: &'a [Option<f64>],
}

pub struct DivergenceDetector {
    lookback: usize,
}

impl Default for DivergenceDetector {
    fn default() -> Self {
        Self::new(&DivergenceConfig::default())
    }
}

/// Last index `i` in `1..=len-2` where `fast - slow` strictly changes sign
/// between `i-1` and `i`.
pub fn last_cross(fast: &[Option<f64>], slow: &[Option<f64>]) -> Option<usize> {
    let len = fast.len().min(slow.len());
    if len < 3 {
        return None;
    }
    let diff = |i: usize| Some(fast[i]? - slow[i]?);

    (1..=len - 2).rev().find(|&i| match (diff(i - 1), diff(i)) {
        (Some(prev), Some(cur)) => (prev < 0.0 && cur > 0.0) || (prev > 0.0 && cur < 0.0),
        _ => false,
    })
}

/// Indices of strict local maxima and minima of `prices`, oldest first.
pub fn local_extrema(prices: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut maxima = Vec::new();
    let mut minima = Vec::new();
    for i in 1..prices.len().saturating_sub(1) {
        let (prev, cur, next) = (prices[i - 1], prices[i], prices[i + 1]);
        if cur > prev && cur > next {
            maxima.push(i);
        } else if cur < prev && cur < next {
            minima.push(i);
        }
    }
    (maxima, minima)
}

impl DivergenceDetector {
    pub fn new(config: &DivergenceConfig) -> Self {
        Self {
            lookback: config.lookback.max(3),
        }
    }

    /// KDJ divergence at `index`: J against price, after the last K/D cross.
    pub fn kdj(&self, frame: &IndicatorFrame, index: usize) -> Result<Option<Divergence>> {
        let j: Vec<Option<f64>> = frame.kdj.iter().map(|p| p.map(|p| p.j)).collect();
        let k: Vec<Option<f64>> = frame.kdj.iter().map(|p| p.map(|p| p.k)).collect();
        let d: Vec<Option<f64>> = frame.kdj.iter().map(|p| p.map(|p| p.d)).collect();
        self.detect(
            DivergenceInput {
                kind: OscillatorKind::KdjJ,
                bars: &frame.bars,
                oscillator: &j,
                fast: &k,
                slow: &d,
            },
            index,
        )
    }

    /// RSI divergence at `index`: RSI6 against price, after the last RSI6/RSI12 cross.
    pub fn rsi(&self, frame: &IndicatorFrame, index: usize) -> Result<Option<Divergence>> {
        self.detect(
            DivergenceInput {
                kind: OscillatorKind::Rsi,
                bars: &frame.bars,
                oscillator: &frame.rsi_short,
                fast: &frame.rsi_short,
                slow: &frame.rsi_mid,
            },
            index,
        )
    }

    /// Check the `lookback` bars ending at `index` (inclusive).
    pub fn detect(&self, input: DivergenceInput<'_>, index: usize) -> Result<Option<Divergence>> {
        let available = (index + 1).min(input.bars.len());
        if available < self.lookback || index >= input.bars.len() {
            return Err(AppError::InsufficientHistory {
                needed: self.lookback,
                available,
            });
        }

        let from = index + 1 - self.lookback;
        let bars = &input.bars[from..=index];
        let oscillator = &input.oscillator[from..=index];

        let current_price = bars[bars.len() - 1].close;
        let Some(current_value) = oscillator[oscillator.len() - 1] else {
            return Err(AppError::InsufficientHistory {
                needed: self.lookback,
                available: oscillator.iter().filter(|v| v.is_some()).count(),
            });
        };

        let start = last_cross(&input.fast[from..=index], &input.slow[from..=index]).unwrap_or(0);
        let bars = &bars[start..];
        let oscillator = &oscillator[start..];
        let prices: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (maxima, minima) = local_extrema(&prices);

        let make = |kind: DivergenceKind, at: usize, value: f64| Divergence {
            kind,
            oscillator: input.kind,
            window_start: bars[0].date,
            reference_date: bars[at].date,
            reference_price: prices[at],
            reference_value: value,
            current_price,
            current_value,
        };

        let top = maxima.iter().rev().find_map(|&m| {
            let value = oscillator[m]?;
            (current_price > prices[m] && current_value < value).then_some((m, value))
        });
        let bottom = minima.iter().rev().find_map(|&m| {
            let value = oscillator[m]?;
            (current_price < prices[m] && current_value > value).then_some((m, value))
        });

        let confirmed = match (top, bottom) {
            (Some(t), Some(b)) if b.0 > t.0 => Some(make(DivergenceKind::Bottom, b.0, b.1)),
            (Some(t), _) => Some(make(DivergenceKind::Top, t.0, t.1)),
            (None, Some(b)) => Some(make(DivergenceKind::Bottom, b.0, b.1)),
            (None, None) => None,
        };
        if confirmed.is_some() {
            return Ok(confirmed);
        }

        let near = |at: usize| (current_price - prices[at]).abs() / prices[at] < NEAR_EXTREMUM;

        if let Some(&m) = minima.last() {
            if let Some(value) = oscillator[m] {
                if near(m) && current_value > value * POTENTIAL_BOTTOM_FACTOR {
                    return Ok(Some(make(DivergenceKind::PotentialBottom, m, value)));
                }
            }
        }
        if let Some(&m) = maxima.last() {
            if let Some(value) = oscillator[m] {
                if near(m) && current_value < value * POTENTIAL_TOP_FACTOR {
                    return Ok(Some(make(DivergenceKind::PotentialTop, m, value)));
                }
            }
        }

        Ok(None)
    }
}
