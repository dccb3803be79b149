//! Builds indicator frames and per-date readings from a series.

use crate::config::{IndicatorConfig, PsarConfig};
use crate::services::signals::indicators::{
    demark, psar, BollingerBands, DemarkCounter, Kdj, MovingAverages, ParabolicSar, Rsi,
};
use crate::services::signals::Indicator;
use crate::types::{
    BandBreak, BandStatus, BandwidthTrend, BollingerReading, DemarkReading, IndicatorFrame,
    KdjReading, MaArrangement, MovingAverageReading, OscillatorStatus, PsarReading, RsiReading,
    Series, VolumeStatus,
};
use tracing::debug;

/// Computes every indicator column over a series, strictly in bar order.
pub struct IndicatorEngine {
    rsi: [Rsi; 3],
    kdj: Kdj,
    bollinger: BollingerBands,
    moving_averages: MovingAverages,
    psar: ParabolicSar,
    demark: DemarkCounter,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(&IndicatorConfig::default(), PsarConfig::default())
    }
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig, psar: PsarConfig) -> Self {
        let [short, mid, long] = config.rsi_periods;
        Self {
            rsi: [Rsi::new(short), Rsi::new(mid), Rsi::new(long)],
            kdj: Kdj::from_config(config),
            bollinger: BollingerBands::from_config(config),
            moving_averages: MovingAverages::from_config(config),
            psar: ParabolicSar::new(psar),
            demark: DemarkCounter::new(),
        }
    }

    /// Recompute all derived columns. The frame is a view and is never persisted.
    pub fn build_frame(&self, series: &Series) -> IndicatorFrame {
        let bars = series.bars();
        debug!(
            "Building indicator frame for {} over {} bars",
            series.symbol,
            bars.len()
        );

        IndicatorFrame {
            symbol: series.symbol.clone(),
            bars: bars.to_vec(),
            rsi_short: self.rsi[0].compute(bars),
            rsi_mid: self.rsi[1].compute(bars),
            rsi_long: self.rsi[2].compute(bars),
            kdj: self.kdj.compute(bars),
            bollinger: self.bollinger.compute(bars),
            moving_averages: self.moving_averages.compute(bars),
            psar: self.psar.compute(bars),
            demark: self.demark.run(bars),
        }
    }

    pub fn moving_average_reading(
        &self,
        frame: &IndicatorFrame,
        index: usize,
    ) -> Option<MovingAverageReading> {
        let bar = frame.bars.get(index)?;
        let point = frame.moving_averages.get(index)?;

        let diffs_pct = point.values.map(|ma| {
            ma.filter(|ma| *ma != 0.0)
                .map(|ma| (bar.close - ma) / ma * 100.0)
        });

        let daily_change_pct = index
            .checked_sub(1)
            .map(|i| frame.bars[i].close)
            .filter(|prev| *prev != 0.0)
            .map(|prev| (bar.close - prev) / prev * 100.0);

        let volume = bar.volume as f64;
        let average = point.volume_average.filter(|avg| *avg > 0.0);
        let volume_ratio_pct = average.map(|avg| (volume / avg - 1.0) * 100.0);
        let volume_status = average
            .map(|avg| VolumeStatus::classify(volume, avg))
            .unwrap_or(VolumeStatus::Normal);

        let arrangement = match point.values {
            [Some(a), Some(b), Some(c), Some(d)] => Some(MaArrangement::classify(&[a, b, c, d])),
            _ => None,
        };

        Some(MovingAverageReading {
            periods: self.moving_averages.periods(),
            values: point.values,
            diffs_pct,
            daily_change_pct,
            volume: bar.volume,
            volume_average: point.volume_average,
            volume_ratio_pct,
            volume_status,
            arrangement,
        })
    }

    /// RSI values and status; divergence is attached by the caller.
    pub fn rsi_reading(&self, frame: &IndicatorFrame, index: usize) -> RsiReading {
        let short = frame.rsi_short.get(index).copied().flatten();
        let mid = frame.rsi_mid.get(index).copied().flatten();
        let long = frame.rsi_long.get(index).copied().flatten();
        let status = match (short, mid, long) {
            (Some(s), Some(m), Some(l)) => Some(OscillatorStatus::from_rsi(s, m, l)),
            _ => None,
        };
        RsiReading {
            short,
            mid,
            long,
            status,
            divergence: None,
        }
    }

    /// KDJ values and status; divergence is attached by the caller.
    pub fn kdj_reading(&self, frame: &IndicatorFrame, index: usize) -> KdjReading {
        let point = frame.kdj.get(index).copied().flatten();
        KdjReading {
            k: point.map(|p| p.k),
            d: point.map(|p| p.d),
            j: point.map(|p| p.j),
            status: point.map(|p| OscillatorStatus::from_j(p.j)),
            divergence: None,
        }
    }

    pub fn bollinger_reading(&self, frame: &IndicatorFrame, index: usize) -> Option<BollingerReading> {
        let point = frame.bollinger.get(index).copied().flatten()?;
        let close = frame.bars.get(index)?.close;

        let bandwidth_trend = index
            .checked_sub(1)
            .and_then(|i| frame.bollinger[i])
            .map(|prev| BandwidthTrend::between(prev.bandwidth, point.bandwidth));

        Some(BollingerReading {
            middle: point.middle,
            upper: point.upper,
            lower: point.lower,
            bandwidth: point.bandwidth,
            position: point.position,
            bandwidth_trend,
            breakthrough: BandBreak::classify(close, point.upper, point.lower),
            status: point.position.map(BandStatus::from_position),
        })
    }

    pub fn psar_reading(&self, frame: &IndicatorFrame, index: usize) -> Option<PsarReading> {
        psar::reading_at(&frame.psar, &frame.bars, index)
    }

    pub fn demark_reading(&self, frame: &IndicatorFrame, index: usize) -> Option<DemarkReading> {
        demark::reading_at(&frame.demark, &frame.bars, index)
    }
}
