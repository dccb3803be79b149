//! Simple moving averages of close and volume.

use crate::config::IndicatorConfig;
use crate::services::signals::Indicator;
use crate::types::{Bar, MovingAveragePoint};

/// Trailing simple moving average; undefined until `period` values exist.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// MA20/50/120/200 of close plus the 20-bar volume average.
pub struct MovingAverages {
    periods: [usize; 4],
    volume_period: usize,
}

impl MovingAverages {
    pub fn new(periods: [usize; 4], volume_period: usize) -> Self {
        Self {
            periods,
            volume_period,
        }
    }

    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self::new(config.ma_periods, config.volume_ma_period)
    }

    pub fn periods(&self) -> [usize; 4] {
        self.periods
    }
}

impl Default for MovingAverages {
    fn default() -> Self {
        Self::new([20, 50, 120, 200], 20)
    }
}

impl Indicator for MovingAverages {
    type Output = MovingAveragePoint;

    fn id(&self) -> &str {
        "ma"
    }

    fn name(&self) -> &str {
        "Moving Averages"
    }

    fn min_periods(&self) -> usize {
        self.periods.iter().copied().max().unwrap_or(0)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<MovingAveragePoint> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let columns: Vec<Vec<Option<f64>>> =
            self.periods.iter().map(|&p| sma(&closes, p)).collect();
        let volume_average = sma(&volumes, self.volume_period);

        (0..bars.len())
            .map(|i| MovingAveragePoint {
                values: [columns[0][i], columns[1][i], columns[2][i], columns[3][i]],
                volume_average: volume_average[i],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::test_support::*;

    #[test]
    fn test_sma_window() {
        let values = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_short_input() {
        assert_eq!(sma(&[1.0, 2.0], 3), vec![None, None]);
        assert_eq!(sma(&[1.0], 0), vec![None]);
    }

    #[test]
    fn test_moving_averages_shape() {
        let bars = create_uptrend_bars(60);
        let points = MovingAverages::default().compute(&bars);
        assert_eq!(points.len(), 60);

        let last = points[59];
        assert!(last.values[0].is_some());
        assert!(last.values[1].is_some());
        assert!(last.values[2].is_none());
        assert_eq!(last.volume_average, Some(1_000.0));
        // Shorter averages sit closer to price in an uptrend
        assert!(last.values[0].unwrap() > last.values[1].unwrap());
    }
}
