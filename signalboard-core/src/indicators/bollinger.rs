//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + k * stddev(close, period)
//! - Lower: middle - k * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! First defined value at index period-1.

use super::set::{BollingerBands, IndicatorName, IndicatorValue, Line};
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self { period, multiplier }
    }

    /// Raw (upper, middle, lower) vectors, NaN where undefined.
    pub fn compute_raw(&self, closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let n = closes.len();
        let mut upper = vec![f64::NAN; n];
        let mut middle = vec![f64::NAN; n];
        let mut lower = vec![f64::NAN; n];

        if n < self.period {
            return (upper, middle, lower);
        }

        for i in (self.period - 1)..n {
            let window = &closes[(i + 1 - self.period)..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }

            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / self.period as f64;
            let width = self.multiplier * variance.sqrt();

            middle[i] = mean;
            upper[i] = mean + width;
            lower[i] = mean - width;
        }

        (upper, middle, lower)
    }
}

impl Default for Bollinger {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> IndicatorName {
        IndicatorName::BollingerBands
    }

    fn min_bars(&self) -> usize {
        self.period
    }

    fn compute(&self, closes: &[f64]) -> IndicatorValue {
        let (upper, middle, lower) = self.compute_raw(closes);
        IndicatorValue::Bollinger(BollingerBands {
            upper: Line::from_raw(upper),
            middle: Line::from_raw(middle),
            lower: Line::from_raw(lower),
        })
    }
}
