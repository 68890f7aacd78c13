//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1],
//! alpha = 2 / (period + 1), seeded with the first close. There is no
//! warm-up gap: EMA[0] = close[0].

use super::set::{IndicatorName, IndicatorValue, Line};
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: IndicatorName,
}

impl Ema {
    pub fn new(name: IndicatorName, period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period, name }
    }
}

impl Indicator for Ema {
    fn name(&self) -> IndicatorName {
        self.name
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn compute(&self, closes: &[f64]) -> IndicatorValue {
        IndicatorValue::Line(Line::from_raw(ema_of_series(closes, self.period)))
    }
}

/// Compute EMA values from a raw f64 slice.
/// Used directly by MACD for both the price EMAs and the signal line.
///
/// Leading NaNs are skipped and the recursion seeds on the first defined
/// value; a NaN after the seed taints every later position.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[start];
    result[start] = prev;

    for i in (start + 1)..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
