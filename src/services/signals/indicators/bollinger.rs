//! Bollinger Bands indicator.

use crate::config::IndicatorConfig;
use crate::services::signals::Indicator;
use crate::types::{Bar, BollingerPoint};

/// `(upper - lower) / middle * 100`; undefined when the middle band is zero.
pub fn bandwidth(upper: f64, lower: f64, middle: f64) -> Option<f64> {
    if middle == 0.0 {
        return None;
    }
    Some((upper - lower) / middle * 100.0)
}

/// Bollinger Bands.
///
/// SMA of close plus/minus `k` population standard deviations.
pub struct BollingerBands {
    period: usize,
    k: f64,
}

impl BollingerBands {
    pub fn new(period: usize, k: f64) -> Self {
        Self {
            period: period.max(1),
            k,
        }
    }

    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self::new(config.bollinger_period, config.bollinger_k)
    }

    fn point(&self, window: &[Bar]) -> Option<BollingerPoint> {
        let n = window.len() as f64;
        let middle = window.iter().map(|b| b.close).sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|b| (b.close - middle).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();

        let upper = middle + self.k * std_dev;
        let lower = middle - self.k * std_dev;
        let close = window.last()?.close;
        let width = upper - lower;

        Some(BollingerPoint {
            middle,
            upper,
            lower,
            bandwidth: bandwidth(upper, lower, middle)?,
            position: (width > 0.0).then(|| (close - lower) / width),
        })
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

impl Indicator for BollingerBands {
    type Output = Option<BollingerPoint>;

    fn id(&self) -> &str {
        "bollinger"
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<BollingerPoint>> {
        let mut out = vec![None; bars.len()];
        for end in self.period..=bars.len() {
            out[end - 1] = self.point(&bars[end - self.period..end]);
        }
        out
    }
}
