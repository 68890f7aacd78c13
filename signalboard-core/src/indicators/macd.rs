//! Moving Average Convergence Divergence (MACD).
//!
//! line      = EMA(fast) - EMA(slow)
//! signal    = EMA(signal) of line
//! histogram = line - signal
//!
//! The EMAs are seeded on the first bar, but the indicator is only reported
//! once `slow` bars exist; before that the slow EMA is mostly seed.

use super::ema::ema_of_series;
use super::set::{IndicatorName, IndicatorValue, Line, MacdLines};
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(slow > fast, "MACD slow period must exceed fast period");
        Self { fast, slow, signal }
    }

    /// Raw (line, signal, histogram) vectors, NaN where undefined.
    pub fn compute_raw(&self, closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_of_series(&line, self.signal);
        let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
        (line, signal, histogram)
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

impl Indicator for Macd {
    fn name(&self) -> IndicatorName {
        IndicatorName::Macd
    }

    fn min_bars(&self) -> usize {
        self.slow
    }

    fn compute(&self, closes: &[f64]) -> IndicatorValue {
        let (line, signal, histogram) = self.compute_raw(closes);
        IndicatorValue::Macd(MacdLines {
            line: Line::from_raw(line),
            signal: Line::from_raw(signal),
            histogram: Line::from_raw(histogram),
        })
    }
}
