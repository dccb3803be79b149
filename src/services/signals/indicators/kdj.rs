//! KDJ stochastic oscillator.

use crate::config::IndicatorConfig;
use crate::services::signals::Indicator;
use crate::types::{Bar, KdjPoint};

/// Smoothed K and D carried from bar to bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdjState {
    pub k: f64,
    pub d: f64,
}

impl Default for KdjState {
    fn default() -> Self {
        Self { k: 50.0, d: 50.0 }
    }
}

impl KdjState {
    /// `K = (m1-1)/m1 * K_prev + RSV/m1`, then D the same way over K.
    pub fn step(self, rsv: f64, m1: f64, m2: f64) -> Self {
        let k = (m1 - 1.0) / m1 * self.k + rsv / m1;
        let d = (m2 - 1.0) / m2 * self.d + k / m2;
        Self { k, d }
    }

    pub fn j(&self) -> f64 {
        3.0 * self.k - 2.0 * self.d
    }
}

/// Raw stochastic value of the last bar in `window`; undefined on a flat range.
pub fn rsv(window: &[Bar]) -> Option<f64> {
    let last = window.last()?;
    let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let high = window
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = high - low;
    if range == 0.0 {
        return None;
    }
    Some((last.close - low) / range * 100.0)
}

/// KDJ over a rolling high/low window.
///
/// K and D are true recursions seeded at 50 on the first bar and advanced from
/// the second bar on, with RSV taken over the bars available so far while the
/// window is still filling. Values therefore depend on where the input slice
/// starts. Output stays undefined until the window is full. Bars with an
/// undefined RSV are undefined and leave the carried state untouched.
pub struct Kdj {
    window: usize,
    m1: f64,
    m2: f64,
}

impl Kdj {
    pub fn new(window: usize, m1: f64, m2: f64) -> Self {
        Self {
            window: window.max(1),
            m1,
            m2,
        }
    }

    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self::new(config.kdj_window, config.kdj_m1, config.kdj_m2)
    }
}

impl Default for Kdj {
    fn default() -> Self {
        Self::new(9, 3.0, 3.0)
    }
}

impl Indicator for Kdj {
    type Output = Option<KdjPoint>;

    fn id(&self) -> &str {
        "kdj"
    }

    fn name(&self) -> &str {
        "KDJ"
    }

    fn min_periods(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<KdjPoint>> {
        let mut out = vec![None; bars.len()];
        let mut state = KdjState::default();

        for i in 0..bars.len() {
            let start = (i + 1).saturating_sub(self.window);
            let Some(rsv) = rsv(&bars[start..=i]) else {
                continue;
            };
            // bar 0 only seeds
            if i > 0 {
                state = state.step(rsv, self.m1, self.m2);
            }
            if i + 1 >= self.window {
                out[i] = Some(KdjPoint {
                    rsv,
                    k: state.k,
                    d: state.d,
                    j: state.j(),
                });
            }
        }

        out
    }
}
