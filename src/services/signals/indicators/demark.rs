//! Demark sequential 9/13 counters.

use crate::services::signals::Indicator;
use crate::types::{Bar, DemarkPoint, DemarkReading, DemarkSeries, DemarkSignalDates};
use chrono::NaiveDate;

/// Length of the setup run that produces a 9 signal.
pub const SETUP_LENGTH: u32 = 9;
/// Extra qualifying closes after a 9 signal that complete a 13 signal.
pub const COUNTDOWN_LENGTH: u32 = 4;

/// Counter state for one direction.
///
/// The up leg compares with `>`; the down leg is the mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Leg {
    count_9: u32,
    count_13: u32,
    ref_price: Option<f64>,
    last_9: Option<NaiveDate>,
    last_13: Option<NaiveDate>,
}

impl Leg {
    /// `beats4` / `beats2` compare today's close with the close 4 and 2 bars back;
    /// `beats_ref` compares it with the latched reference price.
    fn step(
        &mut self,
        date: NaiveDate,
        close_4_back: f64,
        beats4: bool,
        beats2: bool,
        beats_ref: impl Fn(f64) -> bool,
    ) {
        self.count_9 = if beats4 { self.count_9 + 1 } else { 0 };

        if self.count_9 == SETUP_LENGTH {
            self.ref_price = Some(close_4_back);
            self.last_9 = Some(date);
            self.count_13 = 0;
            return;
        }

        let (Some(last_9), Some(ref_price)) = (self.last_9, self.ref_price) else {
            return;
        };
        if date <= last_9 {
            return;
        }

        // A new countdown may only run once the latest 9 postdates the latest 13.
        let can_count = match self.last_13 {
            None => true,
            Some(last_13) => date > last_13 && last_9 > last_13,
        };
        if !can_count {
            self.count_13 = 0;
            return;
        }

        if !beats_ref(ref_price) {
            self.count_13 = 0;
        } else if beats2 && self.count_13 < COUNTDOWN_LENGTH {
            self.count_13 += 1;
            if self.count_13 == COUNTDOWN_LENGTH {
                self.last_13 = Some(date);
            }
        }
    }
}

/// Demark sequential counter.
///
/// Must see every bar in order: the 13 countdown depends on the reference
/// price latched at the most recent 9 signal. Bars before index 4 are skipped
/// and report zero counts.
#[derive(Default)]
pub struct DemarkCounter;

impl DemarkCounter {
    pub fn new() -> Self {
        Self
    }

    /// Counters at every bar plus the last signal dates seen.
    pub fn run(&self, bars: &[Bar]) -> DemarkSeries {
        let mut up = Leg::default();
        let mut down = Leg::default();
        let mut points = vec![DemarkPoint::default(); bars.len()];

        for i in 4..bars.len() {
            let bar = &bars[i];
            let close = bar.close;
            let close_4 = bars[i - 4].close;
            let close_2 = bars[i - 2].close;

            up.step(bar.date, close_4, close > close_4, close > close_2, |r| close > r);
            down.step(bar.date, close_4, close < close_4, close < close_2, |r| close < r);

            points[i] = DemarkPoint {
                up_count_9: up.count_9,
                up_count_13: up.count_13,
                down_count_9: down.count_9,
                down_count_13: down.count_13,
            };
        }

        DemarkSeries {
            points,
            last_signals: DemarkSignalDates {
                up_9: up.last_9,
                up_13: up.last_13,
                down_9: down.last_9,
                down_13: down.last_13,
            },
        }
    }
}

impl Indicator for DemarkCounter {
    type Output = DemarkPoint;

    fn id(&self) -> &str {
        "demark"
    }

    fn name(&self) -> &str {
        "Demark Sequential"
    }

    fn min_periods(&self) -> usize {
        5
    }

    fn compute(&self, bars: &[Bar]) -> Vec<DemarkPoint> {
        self.run(bars).points
    }
}

/// Reading at `index`; signal dates are the latest ones on or before that bar.
pub fn reading_at(series: &DemarkSeries, bars: &[Bar], index: usize) -> Option<DemarkReading> {
    let point = *series.points.get(index)?;
    let cutoff = bars.get(index)?.date;
    let upto = |d: Option<NaiveDate>| d.filter(|d| *d <= cutoff);

    // Signal dates are latched over the whole run; rerun on the prefix when it
    // extends beyond the requested bar.
    let dates = if index + 1 == bars.len() {
        series.last_signals
    } else {
        DemarkCounter.run(&bars[..=index]).last_signals
    };

    Some(DemarkReading {
        up_count_9: point.up_count_9,
        up_count_13: point.up_count_13,
        down_count_9: point.down_count_9,
        down_count_13: point.down_count_13,
        up_signal_9: point.up_signal_9(),
        up_signal_13: point.up_signal_13(),
        down_signal_9: point.down_signal_9(),
        down_signal_13: point.down_signal_13(),
        last_up_signal_9: upto(dates.up_9),
        last_up_signal_13: upto(dates.up_13),
        last_down_signal_9: upto(dates.down_9),
        last_down_signal_13: upto(dates.down_13),
    })
}
