//! Relative Strength Index with Wilder smoothing.

use crate::services::signals::Indicator;
use crate::types::Bar;

/// Running Wilder averages of gains and losses.
///
/// `avg = avg_prev * (n - 1) / n + value / n`, i.e. an exponential average with
/// `alpha = 1 / n`, seeded from the first close difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilderState {
    pub avg_gain: f64,
    pub avg_loss: f64,
}

impl WilderState {
    /// Seed from the first close difference.
    pub fn seed(delta: f64) -> Self {
        Self {
            avg_gain: delta.max(0.0),
            avg_loss: (-delta).max(0.0),
        }
    }

    /// Fold one more close difference into the averages.
    pub fn step(self, delta: f64, period: usize) -> Self {
        let alpha = 1.0 / period as f64;
        Self {
            avg_gain: self.avg_gain * (1.0 - alpha) + delta.max(0.0) * alpha,
            avg_loss: self.avg_loss * (1.0 - alpha) + (-delta).max(0.0) * alpha,
        }
    }

    /// No losses gives 100 and no gains gives 0; the no-gain rule wins, so a
    /// flat stretch reads 0.
    pub fn rsi(&self) -> f64 {
        if self.avg_gain == 0.0 {
            0.0
        } else if self.avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        }
    }
}

/// Relative Strength Index.
///
/// The first `period` bars are undefined.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Indicator for Rsi {
    type Output = Option<f64>;

    fn id(&self) -> &str {
        "rsi"
    }

    fn name(&self) -> &str {
        "RSI"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let mut out = vec![None; bars.len()];
        let mut state: Option<WilderState> = None;

        for (i, pair) in bars.windows(2).enumerate() {
            let delta = pair[1].close - pair[0].close;
            let next = match state {
                None => WilderState::seed(delta),
                Some(prev) => prev.step(delta, self.period),
            };
            state = Some(next);

            let index = i + 1;
            if index >= self.period {
                out[index] = Some(next.rsi());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::test_support::*;

    // =========================================================================
    // Wilder state
    // =========================================================================

    #[test]
    fn test_seed_splits_gain_and_loss() {
        assert_eq!(
            WilderState::seed(2.0),
            WilderState {
                avg_gain: 2.0,
                avg_loss: 0.0
            }
        );
        assert_eq!(
            WilderState::seed(-3.0),
            WilderState {
                avg_gain: 0.0,
                avg_loss: 3.0
            }
        );
    }

    #[test]
    fn test_step_is_wilder_recursion() {
        let state = WilderState::seed(6.0).step(0.0, 6);
        assert!((state.avg_gain - 5.0).abs() < 1e-12);
        let state = WilderState::seed(-6.0).step(-12.0, 6);
        assert!((state.avg_loss - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_edge_values() {
        let only_gains = WilderState {
            avg_gain: 1.0,
            avg_loss: 0.0,
        };
        assert_eq!(only_gains.rsi(), 100.0);
        let only_losses = WilderState {
            avg_gain: 0.0,
            avg_loss: 1.0,
        };
        assert_eq!(only_losses.rsi(), 0.0);
        let balanced = WilderState {
            avg_gain: 1.0,
            avg_loss: 1.0,
        };
        assert!((balanced.rsi() - 50.0).abs() < 1e-12);
        let idle = WilderState {
            avg_gain: 0.0,
            avg_loss: 0.0,
        };
        assert_eq!(idle.rsi(), 0.0);
    }

    // =========================================================================
    // Series output
    // =========================================================================

    #[test]
    fn test_rsi_undefined_before_period() {
        let bars = create_wave_bars(30);
        let values = Rsi::new(6).compute(&bars);
        assert_eq!(values.len(), 30);
        assert!(values[..6].iter().all(Option::is_none));
        assert!(values[6..].iter().all(Option::is_some));
    }

    #[test]
    fn test_rsi_uptrend_is_100() {
        let values = Rsi::new(6).compute(&create_uptrend_bars(20));
        assert_eq!(values[19], Some(100.0));
    }

    #[test]
    fn test_rsi_downtrend_is_0() {
        let values = Rsi::new(12).compute(&create_downtrend_bars(20));
        assert_eq!(values[19], Some(0.0));
    }

    #[test]
    fn test_rsi_flat_series_is_0() {
        let values = Rsi::new(6).compute(&bars_from_closes(&[10.0; 10]));
        assert!(values[..6].iter().all(Option::is_none));
        assert!(values[6..].iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn test_rsi_bounded() {
        let values = Rsi::new(24).compute(&create_wave_bars(80));
        for v in values.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_rsi_short_input() {
        assert!(Rsi::new(6).compute(&create_uptrend_bars(5)).iter().all(Option::is_none));
        assert!(Rsi::new(6).compute(&[]).is_empty());
    }
}
