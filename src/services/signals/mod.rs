//! Technical signal computation.
//!
//! Indicators turn an ordered bar slice into one value per bar. The engine
//! assembles them into an [`IndicatorFrame`](crate::types::IndicatorFrame);
//! divergence and scoring read that frame at a single date.

pub mod divergence;
pub mod engine;
pub mod indicators;
pub mod score;

pub use divergence::DivergenceDetector;
pub use engine::IndicatorEngine;
pub use score::{ScoreAggregator, ScoreInputs};

use crate::types::Bar;

/// Trait for implementing technical indicators.
///
/// `compute` always returns exactly one entry per input bar; entries for bars
/// with insufficient history are undefined (`None`), never a guessed value.
pub trait Indicator: Send + Sync {
    /// Per-bar output.
    type Output;

    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Number of bars needed before the first defined value.
    fn min_periods(&self) -> usize;

    /// Compute the indicator over the whole slice, in order.
    fn compute(&self, bars: &[Bar]) -> Vec<Self::Output>;
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::Bar;
    use chrono::{Duration, NaiveDate};

    pub fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Bars from closes, one calendar day apart, with a one point range.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    start_date() + Duration::days(i as i64),
                    c,
                    c + 1.0,
                    c - 1.0,
                    c,
                    1_000,
                )
            })
            .collect()
    }

    pub fn create_uptrend_bars(count: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64 * 1.5).collect();
        bars_from_closes(&closes)
    }

    pub fn create_downtrend_bars(count: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..count).map(|i| 200.0 - i as f64 * 1.5).collect();
        bars_from_closes(&closes)
    }

    /// A wave that oscillates around 100.
    pub fn create_wave_bars(count: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..count)
            .map(|i| 100.0 + 8.0 * (i as f64 / 4.0).sin())
            .collect();
        bars_from_closes(&closes)
    }
}
